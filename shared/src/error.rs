use std::fmt;

use thiserror::Error;

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    transport::TransportError,
    types::{AttributeHandle, InteractionClassHandle, ObjectClassHandle, ObjectHandle},
};

/// The time services that have an enable/disable life cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeService {
    Regulation,
    Constrained,
    AsyncDelivery,
}

impl fmt::Display for TimeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeService::Regulation => f.write_str("time regulation"),
            TimeService::Constrained => f.write_str("time constrained"),
            TimeService::AsyncDelivery => f.write_str("asynchronous delivery"),
        }
    }
}

impl Serde for TimeService {
    fn ser(&self, writer: &mut ByteWriter) {
        let tag: u8 = match self {
            TimeService::Regulation => 0,
            TimeService::Constrained => 1,
            TimeService::AsyncDelivery => 2,
        };
        writer.write_byte(tag);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(TimeService::Regulation),
            1 => Ok(TimeService::Constrained),
            2 => Ok(TimeService::AsyncDelivery),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "TimeService",
                tag: u32::from(tag),
            }),
        }
    }
}

/// Every failure a federation service can report back to its caller.
///
/// Raised synchronously by the LRC when local validation fails, or carried
/// back from the RTI inside a failure response and re-raised unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RtiError {
    // Time management
    #[error("{service} is already enabled")]
    AlreadyEnabled { service: TimeService },

    #[error("{service} was not enabled")]
    WasNotEnabled { service: TimeService },

    #[error("A request to enable {service} is still pending")]
    EnablePending { service: TimeService },

    #[error("A time advance is already in progress; only one may be outstanding")]
    AdvanceAlreadyInProgress,

    #[error("Requested time {requested} is not after the current time {current}")]
    FederationTimeAlreadyPassed { requested: f64, current: f64 },

    #[error("Invalid lookahead {lookahead}: lookahead may not be negative")]
    InvalidLookahead { lookahead: f64 },

    #[error("Invalid federation time {time}: {reason}")]
    InvalidFederationTime { time: f64, reason: String },

    // Federation management
    #[error("Federate name \"{name}\" is already in use in this federation")]
    FederateNameAlreadyInUse { name: String },

    #[error("Federate is not joined to a federation execution")]
    FederateNotExecutionMember,

    #[error("Federate is already joined to federation \"{federation}\"")]
    FederateAlreadyExecutionMember { federation: String },

    #[error("Federation execution \"{name}\" already exists")]
    FederationExecutionAlreadyExists { name: String },

    #[error("Federation execution \"{name}\" does not exist")]
    FederationExecutionDoesNotExist { name: String },

    #[error("Federation execution \"{name}\" still has {count} joined federates")]
    FederatesCurrentlyJoined { name: String, count: u32 },

    #[error("A save is in progress")]
    SaveInProgress,

    #[error("A restore is in progress")]
    RestoreInProgress,

    #[error("No save has been initiated")]
    SaveNotInitiated,

    #[error("No restore has been requested")]
    RestoreNotRequested,

    #[error("Synchronization point \"{label}\" has not been announced")]
    SyncPointLabelNotAnnounced { label: String },

    #[error("Synchronization point \"{label}\" is already registered")]
    SyncPointLabelNotUnique { label: String },

    #[error("No federation save is stored under \"{label}\"")]
    SaveLabelNotFound { label: String },

    // Object model and declaration management
    #[error("Object class \"{name}\" is not defined in the object model")]
    ObjectClassNotDefined { name: String },

    #[error("Interaction class \"{name}\" is not defined in the object model")]
    InteractionClassNotDefined { name: String },

    #[error("{attribute} is not defined for the object class")]
    AttributeNotDefined { attribute: AttributeHandle },

    #[error("{class} is not published by this federate")]
    ObjectClassNotPublished { class: ObjectClassHandle },

    #[error("{attribute} is not published by this federate")]
    AttributeNotPublished { attribute: AttributeHandle },

    #[error("{class} is not published by this federate")]
    InteractionClassNotPublished { class: InteractionClassHandle },

    #[error("Cannot unpublish {class}: an ownership acquisition is still pending for one of its instances")]
    OwnershipAcquisitionPending { class: ObjectClassHandle },

    // Object and ownership management
    #[error("{object} is not known to this federate")]
    ObjectNotKnown { object: ObjectHandle },

    #[error("{attribute} of {object} is not owned by this federate")]
    AttributeNotOwned {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },

    #[error("{attribute} of {object} is already owned by this federate")]
    FederateOwnsAttributes {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },

    #[error("{attribute} of {object} is already being divested")]
    AttributeAlreadyBeingDivested {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },

    #[error("{attribute} of {object} has no divestiture outstanding from this federate")]
    AttributeDivestitureWasNotRequested {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },

    #[error("{attribute} of {object} has no acquisition outstanding from this federate")]
    AttributeAcquisitionWasNotRequested {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },

    #[error("This federate does not hold the privilege to delete {object}")]
    DeletePrivilegeNotHeld { object: ObjectHandle },

    // Infrastructure
    #[error("Not connected to the RTI")]
    NotConnected,

    #[error("RTI internal error: {reason}")]
    RtiInternal { reason: String },
}

impl RtiError {
    pub fn internal(reason: impl Into<String>) -> Self {
        RtiError::RtiInternal {
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for RtiError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Disconnected => RtiError::NotConnected,
            other => RtiError::internal(other.to_string()),
        }
    }
}

impl From<SerdeErr> for RtiError {
    fn from(error: SerdeErr) -> Self {
        RtiError::internal(format!("Failed to decode message: {error}"))
    }
}

impl Serde for RtiError {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            RtiError::AlreadyEnabled { service } => {
                writer.write_u16(0);
                service.ser(writer);
            }
            RtiError::WasNotEnabled { service } => {
                writer.write_u16(1);
                service.ser(writer);
            }
            RtiError::EnablePending { service } => {
                writer.write_u16(2);
                service.ser(writer);
            }
            RtiError::AdvanceAlreadyInProgress => writer.write_u16(3),
            RtiError::FederationTimeAlreadyPassed { requested, current } => {
                writer.write_u16(4);
                requested.ser(writer);
                current.ser(writer);
            }
            RtiError::InvalidLookahead { lookahead } => {
                writer.write_u16(5);
                lookahead.ser(writer);
            }
            RtiError::InvalidFederationTime { time, reason } => {
                writer.write_u16(6);
                time.ser(writer);
                reason.ser(writer);
            }
            RtiError::FederateNameAlreadyInUse { name } => {
                writer.write_u16(7);
                name.ser(writer);
            }
            RtiError::FederateNotExecutionMember => writer.write_u16(8),
            RtiError::FederateAlreadyExecutionMember { federation } => {
                writer.write_u16(9);
                federation.ser(writer);
            }
            RtiError::FederationExecutionAlreadyExists { name } => {
                writer.write_u16(10);
                name.ser(writer);
            }
            RtiError::FederationExecutionDoesNotExist { name } => {
                writer.write_u16(11);
                name.ser(writer);
            }
            RtiError::FederatesCurrentlyJoined { name, count } => {
                writer.write_u16(12);
                name.ser(writer);
                count.ser(writer);
            }
            RtiError::SaveInProgress => writer.write_u16(13),
            RtiError::RestoreInProgress => writer.write_u16(14),
            RtiError::SaveNotInitiated => writer.write_u16(15),
            RtiError::RestoreNotRequested => writer.write_u16(16),
            RtiError::SyncPointLabelNotAnnounced { label } => {
                writer.write_u16(17);
                label.ser(writer);
            }
            RtiError::ObjectClassNotDefined { name } => {
                writer.write_u16(18);
                name.ser(writer);
            }
            RtiError::InteractionClassNotDefined { name } => {
                writer.write_u16(19);
                name.ser(writer);
            }
            RtiError::AttributeNotDefined { attribute } => {
                writer.write_u16(20);
                attribute.ser(writer);
            }
            RtiError::ObjectClassNotPublished { class } => {
                writer.write_u16(21);
                class.ser(writer);
            }
            RtiError::AttributeNotPublished { attribute } => {
                writer.write_u16(22);
                attribute.ser(writer);
            }
            RtiError::InteractionClassNotPublished { class } => {
                writer.write_u16(23);
                class.ser(writer);
            }
            RtiError::OwnershipAcquisitionPending { class } => {
                writer.write_u16(24);
                class.ser(writer);
            }
            RtiError::ObjectNotKnown { object } => {
                writer.write_u16(25);
                object.ser(writer);
            }
            RtiError::AttributeNotOwned { object, attribute } => {
                writer.write_u16(26);
                object.ser(writer);
                attribute.ser(writer);
            }
            RtiError::FederateOwnsAttributes { object, attribute } => {
                writer.write_u16(27);
                object.ser(writer);
                attribute.ser(writer);
            }
            RtiError::AttributeAlreadyBeingDivested { object, attribute } => {
                writer.write_u16(28);
                object.ser(writer);
                attribute.ser(writer);
            }
            RtiError::AttributeDivestitureWasNotRequested { object, attribute } => {
                writer.write_u16(29);
                object.ser(writer);
                attribute.ser(writer);
            }
            RtiError::AttributeAcquisitionWasNotRequested { object, attribute } => {
                writer.write_u16(30);
                object.ser(writer);
                attribute.ser(writer);
            }
            RtiError::DeletePrivilegeNotHeld { object } => {
                writer.write_u16(31);
                object.ser(writer);
            }
            RtiError::NotConnected => writer.write_u16(32),
            RtiError::RtiInternal { reason } => {
                writer.write_u16(33);
                reason.ser(writer);
            }
            RtiError::SyncPointLabelNotUnique { label } => {
                writer.write_u16(34);
                label.ser(writer);
            }
            RtiError::SaveLabelNotFound { label } => {
                writer.write_u16(35);
                label.ser(writer);
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let error = match reader.read_u16()? {
            0 => RtiError::AlreadyEnabled {
                service: TimeService::de(reader)?,
            },
            1 => RtiError::WasNotEnabled {
                service: TimeService::de(reader)?,
            },
            2 => RtiError::EnablePending {
                service: TimeService::de(reader)?,
            },
            3 => RtiError::AdvanceAlreadyInProgress,
            4 => RtiError::FederationTimeAlreadyPassed {
                requested: f64::de(reader)?,
                current: f64::de(reader)?,
            },
            5 => RtiError::InvalidLookahead {
                lookahead: f64::de(reader)?,
            },
            6 => RtiError::InvalidFederationTime {
                time: f64::de(reader)?,
                reason: String::de(reader)?,
            },
            7 => RtiError::FederateNameAlreadyInUse {
                name: String::de(reader)?,
            },
            8 => RtiError::FederateNotExecutionMember,
            9 => RtiError::FederateAlreadyExecutionMember {
                federation: String::de(reader)?,
            },
            10 => RtiError::FederationExecutionAlreadyExists {
                name: String::de(reader)?,
            },
            11 => RtiError::FederationExecutionDoesNotExist {
                name: String::de(reader)?,
            },
            12 => RtiError::FederatesCurrentlyJoined {
                name: String::de(reader)?,
                count: u32::de(reader)?,
            },
            13 => RtiError::SaveInProgress,
            14 => RtiError::RestoreInProgress,
            15 => RtiError::SaveNotInitiated,
            16 => RtiError::RestoreNotRequested,
            17 => RtiError::SyncPointLabelNotAnnounced {
                label: String::de(reader)?,
            },
            18 => RtiError::ObjectClassNotDefined {
                name: String::de(reader)?,
            },
            19 => RtiError::InteractionClassNotDefined {
                name: String::de(reader)?,
            },
            20 => RtiError::AttributeNotDefined {
                attribute: AttributeHandle::de(reader)?,
            },
            21 => RtiError::ObjectClassNotPublished {
                class: ObjectClassHandle::de(reader)?,
            },
            22 => RtiError::AttributeNotPublished {
                attribute: AttributeHandle::de(reader)?,
            },
            23 => RtiError::InteractionClassNotPublished {
                class: InteractionClassHandle::de(reader)?,
            },
            24 => RtiError::OwnershipAcquisitionPending {
                class: ObjectClassHandle::de(reader)?,
            },
            25 => RtiError::ObjectNotKnown {
                object: ObjectHandle::de(reader)?,
            },
            26 => RtiError::AttributeNotOwned {
                object: ObjectHandle::de(reader)?,
                attribute: AttributeHandle::de(reader)?,
            },
            27 => RtiError::FederateOwnsAttributes {
                object: ObjectHandle::de(reader)?,
                attribute: AttributeHandle::de(reader)?,
            },
            28 => RtiError::AttributeAlreadyBeingDivested {
                object: ObjectHandle::de(reader)?,
                attribute: AttributeHandle::de(reader)?,
            },
            29 => RtiError::AttributeDivestitureWasNotRequested {
                object: ObjectHandle::de(reader)?,
                attribute: AttributeHandle::de(reader)?,
            },
            30 => RtiError::AttributeAcquisitionWasNotRequested {
                object: ObjectHandle::de(reader)?,
                attribute: AttributeHandle::de(reader)?,
            },
            31 => RtiError::DeletePrivilegeNotHeld {
                object: ObjectHandle::de(reader)?,
            },
            32 => RtiError::NotConnected,
            33 => RtiError::RtiInternal {
                reason: String::de(reader)?,
            },
            34 => RtiError::SyncPointLabelNotUnique {
                label: String::de(reader)?,
            },
            35 => RtiError::SaveLabelNotFound {
                label: String::de(reader)?,
            },
            tag => {
                return Err(SerdeErr::UnknownTag {
                    type_name: "RtiError",
                    tag: u32::from(tag),
                })
            }
        };
        Ok(error)
    }
}
