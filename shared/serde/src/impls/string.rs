use crate::{ByteReader, ByteWriter, Serde, SerdeErr};

impl Serde for String {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.len() as u32);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let length = reader.read_length()?;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use crate::{ByteReader, ByteWriter, Serde};

    #[test]
    fn empty_and_unicode_strings() {
        let mut writer = ByteWriter::new();
        String::new().ser(&mut writer);
        "fédération".to_string().ser(&mut writer);

        let bytes = writer.to_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(String::de(&mut reader).as_deref(), Ok(""));
        assert_eq!(String::de(&mut reader).as_deref(), Ok("fédération"));
    }
}
