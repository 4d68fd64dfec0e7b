use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

/// What the LRC does with a federate's objects and ownership as it resigns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResignAction {
    NoAction,
    /// Give up every owned attribute unconditionally
    UnconditionallyDivestAttributes,
    /// Delete every object instance the federate registered
    DeleteObjects,
    /// Drop pending acquisitions, then divest everything still owned
    CancelThenDivest,
}

impl Serde for ResignAction {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(match self {
            ResignAction::NoAction => 0,
            ResignAction::UnconditionallyDivestAttributes => 1,
            ResignAction::DeleteObjects => 2,
            ResignAction::CancelThenDivest => 3,
        });
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(ResignAction::NoAction),
            1 => Ok(ResignAction::UnconditionallyDivestAttributes),
            2 => Ok(ResignAction::DeleteObjects),
            3 => Ok(ResignAction::CancelThenDivest),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "ResignAction",
                tag: u32::from(tag),
            }),
        }
    }
}
