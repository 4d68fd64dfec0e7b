use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::Sender;
use log::{info, warn};

use rti_shared::{Channel, ChannelListener, RtiMessage};

/// Moves everything the RTI sends off the channel's receiver thread and
/// into the federate's incoming queue. Nothing is processed here.
pub struct LrcListener {
    incoming: Sender<RtiMessage>,
    disconnected: Arc<AtomicBool>,
}

impl LrcListener {
    pub fn new(incoming: Sender<RtiMessage>, disconnected: Arc<AtomicBool>) -> Self {
        Self {
            incoming,
            disconnected,
        }
    }

    fn push(&self, channel: &Channel, payload: &[u8]) {
        let message = match RtiMessage::from_bytes(payload) {
            Ok(message) => message,
            Err(error) => {
                warn!("{}: dropping undecodable message: {}", channel.name(), error);
                return;
            }
        };
        if self.incoming.send(message).is_err() {
            warn!("{}: federate is gone, dropping message", channel.name());
        }
    }
}

impl ChannelListener for LrcListener {
    fn on_data(&self, channel: &Channel, payload: Vec<u8>) {
        self.push(channel, &payload);
    }

    fn on_control_request(&self, channel: &Channel, request_id: Option<u32>, payload: Vec<u8>) {
        if let Some(request_id) = request_id {
            warn!(
                "{}: RTI expects an answer to request {}, LRCs never reply",
                channel.name(),
                request_id
            );
        }
        self.push(channel, &payload);
    }

    fn on_disconnect(&self, channel: &Channel) {
        info!("{}: RTI closed the connection", channel.name());
        self.disconnected.store(true, Ordering::SeqCst);
    }
}
