//! # RTI Client
//! The local runtime component (LRC) a federate links against. Wraps the
//! connection to the RTI, keeps the federate's local view of the
//! federation, and turns everything the RTI sends into [`Callback`]s
//! delivered on [`RtiAmbassador::tick`].

#![deny(trivial_casts, trivial_numeric_casts, unstable_features, unused_import_braces)]

mod ambassador;
mod callback;
mod config;
mod handlers;
mod listener;
mod message_queue;
mod state;

pub use ambassador::RtiAmbassador;
pub use callback::{Callback, Callbacks};
pub use config::LrcConfig;
pub use handlers::{build_incoming_sink, build_outgoing_sink};
pub use message_queue::MessageQueue;
pub use state::LrcState;

pub use rti_shared::{
    AttributeHandle, FederateHandle, FederationHandle, InteractionClassHandle, LogicalTime,
    ObjectClassHandle, ObjectHandle, ObjectModel, ParameterHandle, ResignAction, RtiError,
};
