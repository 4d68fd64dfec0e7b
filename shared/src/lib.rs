//! # RTI Shared
//! Types, wire formats and bookkeeping shared between the rti-server and
//! rti-client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use rti_serde::{ByteReader, ByteWriter, ConstByteLength, Serde, SerdeErr};

mod context;
mod error;
mod interests;
mod messages;
mod messaging;
mod object_model;
mod ownership;
mod repository;
mod snapshot;
mod time;
mod types;

pub mod transport;

pub use context::RuntimeContext;
pub use error::{RtiError, TimeService};
pub use interests::InterestManager;
pub use messages::{MessageBody, MessageType, ResignAction, Response, ResponseBody, RtiMessage};
pub use messaging::{MessageContext, MessageHandler, MessageSink, Outcome, SinkPlugin};
pub use object_model::{InteractionClass, ObjectClass, ObjectModel, ObjectModelBuilder};
pub use ownership::{AcquireRequest, AcquireStatus, DivestRequest, OwnershipManager};
pub use repository::{ObjectInstance, Repository};
pub use snapshot::SaveRestoreTarget;
pub use time::{
    validate_start_time, AdvanceKind, AdvanceState, TimeConfig, TimeStatus, TriState,
};
pub use transport::{Channel, ChannelListener, ConnectionConfig, TransportError};
pub use types::{
    AttributeHandle, ConnectionId, FederateHandle, FederationHandle, HostType,
    InteractionClassHandle, LogicalTime, ObjectClassHandle, ObjectHandle, ParameterHandle,
};
