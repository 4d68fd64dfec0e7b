use std::{default::Default, net::SocketAddr};

use rti_shared::{ConnectionConfig, TimeConfig};

/// Port the RTI listens on unless told otherwise
pub const DEFAULT_RTI_PORT: u16 = 23113;

/// Contains Config properties which will be used by the RTI
#[derive(Clone, Debug)]
pub struct RtiConfig {
    /// Address the listener binds to. Port 0 picks a free port.
    pub address: SocketAddr,
    /// Greeting sent to every connecting LRC during the handshake
    pub welcome: String,
    /// Bound on each federation's outgoing queue. A full queue blocks the
    /// handler that is trying to enqueue.
    pub outgoing_queue_capacity: usize,
    /// Used to configure the connections with LRCs
    pub connection: ConnectionConfig,
    /// Lookahead promotion applied when federates enable regulation
    pub time: TimeConfig,
}

impl Default for RtiConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_RTI_PORT)),
            welcome: format!("rti-server {}", env!("CARGO_PKG_VERSION")),
            outgoing_queue_capacity: 10_000,
            connection: ConnectionConfig::default(),
            time: TimeConfig::default(),
        }
    }
}
