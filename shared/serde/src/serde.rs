use crate::{ByteReader, ByteWriter, SerdeErr};

/// A type that can be written to and read back from the wire
pub trait Serde: Sized + Clone + PartialEq {
    /// Writes the value into the buffer
    fn ser(&self, writer: &mut ByteWriter);

    /// Parses a value from the reader
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr>;

    /// Returns the number of bytes `ser` would write
    fn byte_length(&self) -> usize {
        let mut writer = ByteWriter::new();
        self.ser(&mut writer);
        writer.len()
    }
}

/// Types whose encoded length never changes
pub trait ConstByteLength {
    fn const_byte_length() -> usize;
}
