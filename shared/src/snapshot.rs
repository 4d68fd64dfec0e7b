use rti_serde::{ByteReader, ByteWriter, SerdeErr};

/// State that is captured when a federation saves and reloaded, in one
/// piece, when it restores
pub trait SaveRestoreTarget {
    fn save_to(&self, writer: &mut ByteWriter);

    fn restore_from(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr>;

    fn snapshot(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.save_to(&mut writer);
        writer.to_bytes()
    }
}
