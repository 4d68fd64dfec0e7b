use std::collections::BTreeSet;

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    error::RtiError,
    object_model::ObjectModel,
    types::{AttributeHandle, FederateHandle, FederationHandle, LogicalTime, ObjectHandle},
};

/// What a successful request hands back
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Empty,
    Joined {
        federate: FederateHandle,
        federation: FederationHandle,
        model: ObjectModel,
    },
    Federation(FederationHandle),
    Object(ObjectHandle),
    Attributes(BTreeSet<AttributeHandle>),
    Time {
        time: LogicalTime,
        lookahead: LogicalTime,
    },
}

/// Reply to a synchronous control request
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Success(ResponseBody),
    Failure(RtiError),
}

impl Response {
    pub fn success() -> Self {
        Response::Success(ResponseBody::Empty)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn into_result(self) -> Result<ResponseBody, RtiError> {
        match self {
            Response::Success(body) => Ok(body),
            Response::Failure(error) => Err(error),
        }
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

impl Serde for ResponseBody {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            ResponseBody::Empty => writer.write_byte(0),
            ResponseBody::Joined {
                federate,
                federation,
                model,
            } => {
                writer.write_byte(1);
                federate.ser(writer);
                federation.ser(writer);
                model.ser(writer);
            }
            ResponseBody::Federation(handle) => {
                writer.write_byte(2);
                handle.ser(writer);
            }
            ResponseBody::Object(handle) => {
                writer.write_byte(3);
                handle.ser(writer);
            }
            ResponseBody::Attributes(attributes) => {
                writer.write_byte(4);
                attributes.ser(writer);
            }
            ResponseBody::Time { time, lookahead } => {
                writer.write_byte(5);
                time.ser(writer);
                lookahead.ser(writer);
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(ResponseBody::Empty),
            1 => Ok(ResponseBody::Joined {
                federate: FederateHandle::de(reader)?,
                federation: FederationHandle::de(reader)?,
                model: ObjectModel::de(reader)?,
            }),
            2 => Ok(ResponseBody::Federation(FederationHandle::de(reader)?)),
            3 => Ok(ResponseBody::Object(ObjectHandle::de(reader)?)),
            4 => Ok(ResponseBody::Attributes(BTreeSet::de(reader)?)),
            5 => Ok(ResponseBody::Time {
                time: f64::de(reader)?,
                lookahead: f64::de(reader)?,
            }),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "ResponseBody",
                tag: u32::from(tag),
            }),
        }
    }
}

impl Serde for Response {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            Response::Success(body) => {
                true.ser(writer);
                body.ser(writer);
            }
            Response::Failure(error) => {
                false.ser(writer);
                error.ser(writer);
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(Response::Success(ResponseBody::de(reader)?))
        } else {
            Ok(Response::Failure(RtiError::de(reader)?))
        }
    }
}
