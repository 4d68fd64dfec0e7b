/// A growable, big-endian write buffer. Frames and bundles are assembled in
/// it before being handed to a socket, so it has no upper size bound.
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Overwrites four bytes at `offset` with a big-endian u32. Used to
    /// back-patch length prefixes once a payload has been written.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` is past the end of the written bytes.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Takes the written bytes, leaving an empty buffer behind that keeps
    /// its allocation
    pub fn take_bytes(&mut self) -> Vec<u8> {
        let capacity = self.buffer.capacity();
        std::mem::replace(&mut self.buffer, Vec::with_capacity(capacity))
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_writer_basic() {
        let mut writer = ByteWriter::new();

        writer.write_byte(0b10101010);

        let bytes = writer.to_bytes();
        assert_eq!(bytes.len(), 1);
        assert_eq!(bytes[0], 0b10101010);
    }

    #[test]
    fn test_byte_writer_large() {
        let mut writer = ByteWriter::new();

        // Well past the initial capacity
        for _ in 0..70_000 {
            writer.write_byte(0xFF);
        }

        let bytes = writer.to_bytes();
        assert_eq!(bytes.len(), 70_000);
        assert!(bytes.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_byte_writer_big_endian() {
        let mut writer = ByteWriter::new();
        writer.write_u32(0x0102_0304);
        writer.write_u16(0xA0B0);

        assert_eq!(writer.as_slice(), &[0x01, 0x02, 0x03, 0x04, 0xA0, 0xB0]);
    }

    #[test]
    fn test_byte_writer_patch_and_take() {
        let mut writer = ByteWriter::new();
        writer.write_u32(0);
        writer.write_bytes(b"abc");
        writer.patch_u32(0, 3);

        let bytes = writer.take_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 3, b'a', b'b', b'c']);
        assert!(writer.is_empty());
    }
}
