use std::{default::Default, net::SocketAddr};

use rti_shared::{ConnectionConfig, TimeConfig};

/// Contains Config properties which will be used by a federate's LRC
#[derive(Clone, Debug)]
pub struct LrcConfig {
    /// Where the RTI listens
    pub rti_address: SocketAddr,
    /// Used to configure the channel to the RTI
    pub connection: ConnectionConfig,
    /// Lookahead promotion applied before requests leave the LRC
    pub time: TimeConfig,
    /// Version string recorded with federations this LRC creates
    pub hla_version: String,
}

impl Default for LrcConfig {
    fn default() -> Self {
        Self {
            rti_address: SocketAddr::from(([127, 0, 0, 1], 23113)),
            connection: ConnectionConfig::default(),
            time: TimeConfig::default(),
            hla_version: "1516e".to_string(),
        }
    }
}
