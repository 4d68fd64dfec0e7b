use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    messages::{MessageBody, MessageType},
    types::{FederateHandle, FederationHandle, LogicalTime},
};

/// The envelope every control and data message travels in.
///
/// Messages are values: whichever queue holds one owns it, and crossing a
/// thread means moving it through a queue.
#[derive(Clone, Debug, PartialEq)]
pub struct RtiMessage {
    pub source: FederateHandle,
    pub target: Option<FederateHandle>,
    pub federation: FederationHandle,
    /// Present on time-stamp-ordered sends
    pub timestamp: Option<LogicalTime>,
    pub body: MessageBody,
}

impl RtiMessage {
    pub fn new(
        source: FederateHandle,
        federation: FederationHandle,
        body: MessageBody,
    ) -> Self {
        Self {
            source,
            target: None,
            federation,
            timestamp: None,
            body,
        }
    }

    /// A message originated by the RTI
    pub fn from_rti(federation: FederationHandle, body: MessageBody) -> Self {
        Self::new(FederateHandle::RTI, federation, body)
    }

    pub fn with_target(mut self, target: FederateHandle) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<LogicalTime>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    pub fn is_from_rti(&self) -> bool {
        self.source.is_rti()
    }

    /// True if `federate` should see this message: untargeted, or aimed at it
    pub fn is_for(&self, federate: FederateHandle) -> bool {
        self.target.map_or(true, |target| target == federate)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        Self::de(&mut ByteReader::new(bytes))
    }
}

impl Serde for RtiMessage {
    fn ser(&self, writer: &mut ByteWriter) {
        self.source.ser(writer);
        self.target.ser(writer);
        self.federation.ser(writer);
        self.timestamp.ser(writer);
        self.body.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            source: FederateHandle::de(reader)?,
            target: Option::<FederateHandle>::de(reader)?,
            federation: FederationHandle::de(reader)?,
            timestamp: Option::<LogicalTime>::de(reader)?,
            body: MessageBody::de(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectHandle;

    #[test]
    fn envelope_fields_survive() {
        let message = RtiMessage::new(
            FederateHandle::new(3),
            FederationHandle::new(1),
            MessageBody::DeleteObject {
                object: ObjectHandle::new(9),
                tag: Vec::new(),
            },
        )
        .with_target(FederateHandle::new(2))
        .with_timestamp(Some(4.25));

        let decoded = RtiMessage::from_bytes(&message.to_bytes()).unwrap();
        assert_eq!(decoded, message);
        assert!(decoded.is_for(FederateHandle::new(2)));
        assert!(!decoded.is_for(FederateHandle::new(3)));
    }
}
