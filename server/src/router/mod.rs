mod config;
mod host;

pub use config::{RouterConfig, DEFAULT_ROUTER_PORT};
pub use host::{Host, HostCounters};

use std::{
    collections::HashMap,
    fs::OpenOptions,
    io::{self, Write},
    net::{SocketAddr, TcpListener},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::{info, warn};
use parking_lot::Mutex;

use rti_shared::transport::Frame;

use crate::error::RtiServerError;

const ACCEPT_POLL: Duration = Duration::from_millis(20);

type Hosts = Arc<Mutex<HashMap<u32, Arc<Host>>>>;

/// Relays frames between hosts on different networks. Whatever one host
/// sends, bundles included, is forwarded unchanged to every other host.
pub struct Router {
    local_addr: SocketAddr,
    hosts: Hosts,
    running: Arc<AtomicBool>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
    config: Arc<RouterConfig>,
}

impl Router {
    pub fn start(config: RouterConfig) -> Result<Self, RtiServerError> {
        let address = config.socket_addr();
        let listener = TcpListener::bind(address).map_err(|source| RtiServerError::Bind {
            address: address.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let config = Arc::new(config);
        let hosts: Hosts = Arc::new(Mutex::new(HashMap::new()));
        let running = Arc::new(AtomicBool::new(true));
        let acceptor = {
            let config = config.clone();
            let hosts = hosts.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("router-acceptor".to_string())
                .spawn(move || accept_loop(listener, config, hosts, running))
                .map_err(|source| RtiServerError::Spawn {
                    name: "router-acceptor".to_string(),
                    source,
                })?
        };

        info!("WAN router listening on {}", local_addr);
        Ok(Self {
            local_addr,
            hosts,
            running,
            acceptor: Mutex::new(Some(acceptor)),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn host_count(&self) -> usize {
        self.hosts.lock().len()
    }

    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(acceptor) = self.acceptor.lock().take() {
            if acceptor.join().is_err() {
                warn!("Router acceptor thread panicked");
            }
        }
        let hosts: Vec<Arc<Host>> = self.hosts.lock().drain().map(|(_, host)| host).collect();
        for host in hosts {
            host.close();
            report(&self.config, &host);
        }
        info!("WAN router on {} stopped", self.local_addr);
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, config: Arc<RouterConfig>, hosts: Hosts, running: Arc<AtomicBool>) {
    let next_id = AtomicU32::new(1);
    while running.load(Ordering::Acquire) {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
                continue;
            }
            Err(error) => {
                warn!("Router accept failed: {}", error);
                thread::sleep(ACCEPT_POLL);
                continue;
            }
        };
        if let Err(error) = stream.set_nonblocking(false) {
            warn!("Could not configure host {}: {}", peer, error);
            continue;
        }

        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let host = match Host::handshake(stream, id, &config.welcome, &config.connection) {
            Ok(host) => Arc::new(host),
            Err(error) => {
                warn!("Rejected host {}: {}", peer, error);
                continue;
            }
        };
        hosts.lock().insert(id, host.clone());

        let relay_hosts = hosts.clone();
        let gone_hosts = hosts.clone();
        let gone_config = config.clone();
        let started = host.start(
            config.connection.max_frame_size,
            move |from, frame| relay(&relay_hosts, from, frame),
            move |id| {
                let Some(host) = gone_hosts.lock().remove(&id) else {
                    return;
                };
                host.close();
                report(&gone_config, &host);
            },
        );
        match started {
            Ok(()) => info!("Host {} connected from {}", id, peer),
            Err(error) => {
                warn!("Could not start host {}: {}", peer, error);
                if let Some(host) = hosts.lock().remove(&id) {
                    host.close();
                }
            }
        }
    }
}

fn relay(hosts: &Hosts, from: u32, frame: Arc<Frame>) {
    let targets: Vec<Arc<Host>> = hosts
        .lock()
        .values()
        .filter(|host| host.id() != from)
        .cloned()
        .collect();
    for host in targets {
        host.forward(frame.clone());
    }
}

/// Logs a departing host's counters, and appends them to the metrics file
/// when metrics are on
fn report(config: &RouterConfig, host: &Host) {
    let counters = host.counters();
    info!(
        "Host {} ({}) left: {} packets / {} bytes in, {} packets / {} bytes out",
        host.id(),
        host.peer_addr(),
        counters.packets_in,
        counters.bytes_in,
        counters.packets_out,
        counters.bytes_out
    );
    if !config.metrics {
        return;
    }
    if let Err(error) = append_metrics(&config.metrics_file, host, &counters) {
        warn!("Could not write {}: {}", config.metrics_file, error);
    }
}

fn append_metrics(path: &str, host: &Host, counters: &HostCounters) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    writeln!(
        file,
        "{},{},{},{},{},{},{}",
        timestamp,
        host.id(),
        host.peer_addr(),
        counters.packets_in,
        counters.bytes_in,
        counters.packets_out,
        counters.bytes_out
    )
}
