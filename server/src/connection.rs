use std::sync::{Arc, Weak};

use log::{debug, warn};

use rti_shared::{
    transport::{Channel, ChannelListener, TransportError},
    ConnectionId, Response, RtiError, RtiMessage,
};

use crate::federation::FederationManager;

/// The RTI's view of one LRC link. Federations hold these to push messages
/// out without caring what carries them.
pub trait FederateConnection: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn send_control(&self, payload: &[u8]) -> Result<(), TransportError>;

    fn send_data(&self, payload: &[u8]) -> Result<(), TransportError>;
}

/// A TCP channel accepted by the RTI
pub struct RtiConnection {
    id: ConnectionId,
    channel: Channel,
    manager: Weak<FederationManager>,
}

impl RtiConnection {
    pub fn new(id: ConnectionId, channel: Channel, manager: &Arc<FederationManager>) -> Self {
        Self {
            id,
            channel,
            manager: Arc::downgrade(manager),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    fn decode(&self, payload: &[u8]) -> Option<RtiMessage> {
        match RtiMessage::from_bytes(payload) {
            Ok(message) => Some(message),
            Err(error) => {
                warn!("Connection {}: dropping undecodable message: {}", self.id, error);
                None
            }
        }
    }

    fn as_federate_connection(self: &Arc<Self>) -> Arc<dyn FederateConnection> {
        self.clone()
    }
}

impl FederateConnection for RtiConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send_control(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.channel.send_control_async(payload)
    }

    fn send_data(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.channel.send_data(payload)
    }
}

/// Listener installed on the channel. Holds the connection weakly so the
/// channel and the connection do not keep each other alive.
pub struct ConnectionListener {
    connection: Weak<RtiConnection>,
}

impl ConnectionListener {
    pub fn new(connection: &Arc<RtiConnection>) -> Self {
        Self {
            connection: Arc::downgrade(connection),
        }
    }
}

impl ChannelListener for ConnectionListener {
    fn on_data(&self, _: &Channel, payload: Vec<u8>) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        let Some(manager) = connection.manager.upgrade() else {
            return;
        };
        let Some(message) = connection.decode(&payload) else {
            return;
        };
        manager.dispatch_data(message, connection.id);
    }

    fn on_control_request(&self, channel: &Channel, request_id: Option<u32>, payload: Vec<u8>) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        let Some(manager) = connection.manager.upgrade() else {
            return;
        };

        let response = match connection.decode(&payload) {
            Some(message) => {
                manager.dispatch_request(message, &connection.as_federate_connection())
            }
            None => Response::Failure(RtiError::internal("undecodable request")),
        };

        let Some(request_id) = request_id else {
            if let Response::Failure(error) = response {
                debug!("Connection {}: async request failed: {}", connection.id, error);
            }
            return;
        };
        if let Err(error) = channel.send_control_response(request_id, &response.to_bytes()) {
            warn!(
                "Connection {}: could not answer request {}: {}",
                connection.id, request_id, error
            );
        }
    }

    fn on_disconnect(&self, _: &Channel) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        if let Some(manager) = connection.manager.upgrade() {
            manager.connection_lost(connection.id);
        }
    }
}
