use crate::SerdeErr;

/// Cursor over a borrowed byte slice, the read side of [`crate::ByteWriter`]
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    offset: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        if count > self.remaining() {
            return Err(SerdeErr::UnexpectedEnd {
                needed: count,
                offset: self.offset,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeErr> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.read_bytes(2)?);
        Ok(u16::from_be_bytes(raw))
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_be_bytes(raw))
    }

    /// Reads a u32 length prefix and checks it against the bytes left
    pub fn read_length(&mut self) -> Result<usize, SerdeErr> {
        let length = self.read_u32()? as usize;
        if length > self.remaining() {
            return Err(SerdeErr::LengthOverflow {
                length,
                remaining: self.remaining(),
            });
        }
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_past_end_is_an_error() {
        let bytes = [0u8, 1, 2];
        let mut reader = ByteReader::new(&bytes);

        let result = reader.read_u32();
        assert!(result.is_err(), "reading 4 bytes from 3 should fail");
        if let Err(SerdeErr::UnexpectedEnd { needed, remaining, .. }) = result {
            assert_eq!(needed, 4);
            assert_eq!(remaining, 3);
        } else {
            panic!("expected UnexpectedEnd");
        }
    }

    #[test]
    fn length_prefix_larger_than_buffer_is_rejected() {
        let bytes = [0u8, 0, 0, 9, 1, 2];
        let mut reader = ByteReader::new(&bytes);

        assert!(matches!(
            reader.read_length(),
            Err(SerdeErr::LengthOverflow { length: 9, remaining: 2 })
        ));
    }
}
