//! # RTI Server
//! The run-time infrastructure: accepts LRC connections over TCP, hosts
//! federation executions, relays data between federates, and coordinates
//! ownership transfer, time advancement, synchronization points and
//! save/restore. Also home to the WAN router.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod config;
mod connection;
mod error;
mod federation;
mod handlers;
mod rti;

pub mod router;

pub use config::{RtiConfig, DEFAULT_RTI_PORT};
pub use connection::{ConnectionListener, FederateConnection, RtiConnection};
pub use error::RtiServerError;
pub use federation::{
    Completion, Federate, FederateMetrics, Federation, FederationManager, Grant,
    SaveRestoreManager, SyncPoint, SyncPointManager, TimeManager,
};
pub use handlers::build_federation_sink;
pub use rti::Rti;
