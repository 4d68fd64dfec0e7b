use std::{
    collections::HashMap,
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::Mutex;

use rti_shared::{transport::Channel, ConnectionId, RuntimeContext};

use crate::{
    config::RtiConfig,
    connection::{ConnectionListener, RtiConnection},
    error::RtiServerError,
    federation::FederationManager,
};

// How often the accept loop looks at the shutdown flag
const ACCEPT_POLL: Duration = Duration::from_millis(20);

type Connections = Arc<Mutex<HashMap<ConnectionId, Arc<RtiConnection>>>>;

/// A running RTI: the listener, the connections it accepted, and the
/// federations they joined
pub struct Rti {
    local_addr: SocketAddr,
    context: Arc<RuntimeContext>,
    manager: Arc<FederationManager>,
    connections: Connections,
    running: Arc<AtomicBool>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
}

impl Rti {
    /// Binds the listener and starts accepting LRC connections
    pub fn start(config: RtiConfig) -> Result<Self, RtiServerError> {
        let listener = TcpListener::bind(config.address).map_err(|source| RtiServerError::Bind {
            address: config.address.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let context = Arc::new(RuntimeContext::new());
        let manager = Arc::new(FederationManager::new(
            context.clone(),
            config.time.clone(),
            config.outgoing_queue_capacity,
            config.connection.join_timeout,
        ));
        let connections: Connections = Arc::new(Mutex::new(HashMap::new()));
        let running = Arc::new(AtomicBool::new(true));

        let acceptor = {
            let context = context.clone();
            let manager = manager.clone();
            let connections = connections.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("rti-acceptor".to_string())
                .spawn(move || accept_loop(listener, config, context, manager, connections, running))
                .map_err(|source| RtiServerError::Spawn {
                    name: "rti-acceptor".to_string(),
                    source,
                })?
        };

        info!("RTI listening on {}", local_addr);
        Ok(Self {
            local_addr,
            context,
            manager,
            connections,
            running,
            acceptor: Mutex::new(Some(acceptor)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn manager(&self) -> &Arc<FederationManager> {
        &self.manager
    }

    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.context
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn log_connection_metrics(&self) {
        for (id, connection) in self.connections.lock().iter() {
            let metrics = connection.channel().metrics();
            info!(
                "Connection {} ({}): {} frames in {} bundles, {} bytes",
                id,
                connection.channel().peer_addr(),
                metrics.frames_sent,
                metrics.bundles_sent,
                metrics.bytes_sent
            );
        }
    }

    /// Stops accepting, closes every connection and stops every federation.
    /// Calling it again does nothing.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("RTI on {} shutting down", self.local_addr);

        if let Some(acceptor) = self.acceptor.lock().take() {
            if acceptor.join().is_err() {
                warn!("RTI acceptor thread panicked");
            }
        }

        let connections: Vec<Arc<RtiConnection>> =
            self.connections.lock().drain().map(|(_, connection)| connection).collect();
        for connection in connections {
            connection.channel().close();
        }
        self.manager.shutdown();
        debug!("RTI on {} stopped", self.local_addr);
    }
}

impl Drop for Rti {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    listener: TcpListener,
    config: RtiConfig,
    context: Arc<RuntimeContext>,
    manager: Arc<FederationManager>,
    connections: Connections,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(error) = stream.set_nonblocking(false) {
                    warn!("Could not configure connection from {}: {}", peer, error);
                    continue;
                }
                let id = context.next_connection_id();
                match open_connection(stream, id, &config, &manager) {
                    Ok(connection) => {
                        connections.lock().insert(id, connection);
                        prune_closed(&connections);
                    }
                    Err(error) => warn!("Rejected connection from {}: {}", peer, error),
                }
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(error) => {
                warn!("Accept failed: {}", error);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn open_connection(
    stream: TcpStream,
    id: ConnectionId,
    config: &RtiConfig,
    manager: &Arc<FederationManager>,
) -> Result<Arc<RtiConnection>, RtiServerError> {
    let channel = Channel::accept(
        stream,
        &format!("rti-{}", id),
        &config.welcome,
        config.connection.clone(),
    )?;
    let connection = Arc::new(RtiConnection::new(id, channel, manager));
    connection
        .channel()
        .start(Arc::new(ConnectionListener::new(&connection)))?;
    Ok(connection)
}

/// Forgets connections whose peer has already gone
fn prune_closed(connections: &Connections) {
    connections
        .lock()
        .retain(|_, connection| connection.channel().is_open());
}
