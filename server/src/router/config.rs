use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rti_shared::ConnectionConfig;

pub const DEFAULT_ROUTER_PORT: u16 = 23114;

/// Contains Config properties which will be used by the WAN router
#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub address: IpAddr,
    pub port: u16,
    /// Append per-host counters to `metrics_file` as each host leaves
    pub metrics: bool,
    pub metrics_file: String,
    /// Greeting sent to every host during the handshake
    pub welcome: String,
    /// Handshake timeout, frame size limit and thread join bound
    pub connection: ConnectionConfig,
}

impl RouterConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_ROUTER_PORT,
            metrics: false,
            metrics_file: "router-metrics.csv".to_string(),
            welcome: format!("wan-router {}", env!("CARGO_PKG_VERSION")),
            connection: ConnectionConfig::default(),
        }
    }
}
