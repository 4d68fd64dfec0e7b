use std::collections::{BTreeMap, BTreeSet};

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    messages::ResignAction,
    object_model::ObjectModel,
    time::AdvanceKind,
    types::{
        AttributeHandle, FederateHandle, InteractionClassHandle, LogicalTime, ObjectClassHandle,
        ObjectHandle, ParameterHandle,
    },
};

// Declares the message payloads once and derives the type tag, the tag
// lookup and the wire encoding from that single list.
macro_rules! define_messages {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident = $id:literal $( { $( $field:ident : $ty:ty ),* $(,)? } )?
        ),* $(,)?
    ) => {
        /// The payload of an [`RtiMessage`](crate::messages::RtiMessage)
        #[derive(Clone, Debug, PartialEq)]
        pub enum MessageBody {
            $(
                $(#[$meta])*
                $variant $( { $( $field: $ty ),* } )?,
            )*
        }

        /// Tag identifying a [`MessageBody`] variant. Handler tables are keyed
        /// on it.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum MessageType {
            $( $variant, )*
        }

        impl MessageType {
            pub fn id(&self) -> u16 {
                match self {
                    $( MessageType::$variant => $id, )*
                }
            }

            pub fn from_id(id: u16) -> Option<Self> {
                match id {
                    $( $id => Some(MessageType::$variant), )*
                    _ => None,
                }
            }
        }

        impl MessageBody {
            pub fn message_type(&self) -> MessageType {
                match self {
                    $( MessageBody::$variant { .. } => MessageType::$variant, )*
                }
            }
        }

        impl Serde for MessageBody {
            #[allow(unused_variables)]
            fn ser(&self, writer: &mut ByteWriter) {
                match self {
                    $(
                        MessageBody::$variant $( { $( $field ),* } )? => {
                            writer.write_u16($id);
                            $( $( $field.ser(writer); )* )?
                        }
                    )*
                }
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                match reader.read_u16()? {
                    $(
                        $id => Ok(MessageBody::$variant $( { $( $field: <$ty>::de(reader)? ),* } )?),
                    )*
                    tag => Err(SerdeErr::UnknownTag {
                        type_name: "MessageBody",
                        tag: u32::from(tag),
                    }),
                }
            }
        }
    };
}

define_messages! {
    // Federation management
    CreateFederation = 1 { name: String, model: ObjectModel, version: String },
    DestroyFederation = 2 { name: String },
    JoinFederation = 3 { federation: String, federate_name: String, federate_type: String },
    ResignFederation = 4 { action: ResignAction },
    /// Sent by the RTI to every federate when another one joins
    FederateJoined = 5 { federate: FederateHandle, name: String },
    FederateResigned = 6 { federate: FederateHandle, name: String },

    // Declaration management
    PublishObjectClass = 10 { class: ObjectClassHandle, attributes: BTreeSet<AttributeHandle> },
    UnpublishObjectClass = 11 { class: ObjectClassHandle },
    SubscribeObjectClass = 12 { class: ObjectClassHandle, attributes: BTreeSet<AttributeHandle> },
    UnsubscribeObjectClass = 13 { class: ObjectClassHandle },
    PublishInteractionClass = 14 { class: InteractionClassHandle },
    UnpublishInteractionClass = 15 { class: InteractionClassHandle },
    SubscribeInteractionClass = 16 { class: InteractionClassHandle },
    UnsubscribeInteractionClass = 17 { class: InteractionClassHandle },

    // Object management
    /// Sent by the registrar as a request, then rebroadcast by the RTI with
    /// the assigned object handle filled in
    RegisterObject = 20 {
        class: ObjectClassHandle,
        object: ObjectHandle,
        name: String,
        attributes: BTreeSet<AttributeHandle>,
    },
    UpdateAttributes = 21 {
        object: ObjectHandle,
        values: BTreeMap<AttributeHandle, Vec<u8>>,
        tag: Vec<u8>,
    },
    DeleteObject = 22 { object: ObjectHandle, tag: Vec<u8> },
    SendInteraction = 23 {
        class: InteractionClassHandle,
        parameters: BTreeMap<ParameterHandle, Vec<u8>>,
        tag: Vec<u8>,
    },

    // Ownership management
    AttributeDivest = 30 {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
        unconditional: bool,
        tag: Vec<u8>,
    },
    AttributeAcquire = 31 {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
        if_available: bool,
        tag: Vec<u8>,
    },
    AttributeRelease = 32 { object: ObjectHandle, attributes: BTreeSet<AttributeHandle> },
    OwnershipAcquired = 33 {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
        if_available: bool,
    },
    CancelAcquire = 34 { object: ObjectHandle, attributes: BTreeSet<AttributeHandle> },
    CancelDivest = 35 { object: ObjectHandle, attributes: BTreeSet<AttributeHandle> },
    /// Targeted at the federate whose cancellation is being confirmed
    ConfirmAcquisitionCancellation = 36 {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
    },
    /// A best-effort bid came back empty-handed
    AttributesUnavailable = 37 { object: ObjectHandle, attributes: BTreeSet<AttributeHandle> },

    // Time management
    EnableTimeRegulation = 40 { time: LogicalTime, lookahead: LogicalTime },
    DisableTimeRegulation = 41,
    EnableTimeConstrained = 42,
    DisableTimeConstrained = 43,
    EnableAsyncDelivery = 44,
    DisableAsyncDelivery = 45,
    ModifyLookahead = 46 { lookahead: LogicalTime },
    TimeAdvanceRequest = 47 { time: LogicalTime, kind: AdvanceKind },
    TimeAdvanceGrant = 48 { time: LogicalTime },

    // Synchronization points
    RegisterSyncPoint = 50 { label: String, tag: Vec<u8>, federates: BTreeSet<FederateHandle> },
    AnnounceSyncPoint = 51 { label: String, tag: Vec<u8> },
    SyncPointAchieved = 52 { label: String },
    FederationSynchronized = 53 { label: String },

    // Save and restore
    RequestSave = 60 { label: String },
    InitiateSave = 61 { label: String },
    SaveComplete = 62 { success: bool },
    FederationSaved = 63 { label: String, success: bool },
    RequestRestore = 64 { label: String },
    InitiateRestore = 65 { label: String },
    RestoreComplete = 66 { success: bool },
    FederationRestored = 67 { label: String, success: bool },
}

impl MessageType {
    /// Messages that travel peer to peer as data frames, broadcast by the
    /// RTI to every other connection
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            MessageType::UpdateAttributes
                | MessageType::DeleteObject
                | MessageType::SendInteraction
                | MessageType::AttributeDivest
                | MessageType::AttributeAcquire
                | MessageType::AttributeRelease
                | MessageType::OwnershipAcquired
                | MessageType::CancelAcquire
                | MessageType::CancelDivest
                | MessageType::ConfirmAcquisitionCancellation
                | MessageType::AttributesUnavailable
        )
    }
}
