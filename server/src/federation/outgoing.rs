use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Sender};
use log::{trace, warn};

use rti_shared::MessageType;

use crate::{connection::FederateConnection, error::RtiServerError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Control,
    Data,
}

/// One encoded message and the connections it must reach
pub struct Outgoing {
    pub delivery: Delivery,
    pub message_type: MessageType,
    pub payload: Arc<Vec<u8>>,
    pub recipients: Vec<Arc<dyn FederateConnection>>,
}

/// Bounded queue drained by a dedicated thread per federation
pub struct OutgoingQueue {
    name: String,
    sender: Option<Sender<Outgoing>>,
    drain: Option<JoinHandle<()>>,
}

impl OutgoingQueue {
    pub fn start(name: &str, capacity: usize) -> Result<Self, RtiServerError> {
        let (sender, receiver) = bounded::<Outgoing>(capacity);
        let thread_name = format!("{name}-outgoing");
        let drain_name = name.to_string();
        let drain = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                for outgoing in receiver.iter() {
                    deliver(&drain_name, &outgoing);
                }
                trace!("Federation {drain_name}: outgoing queue drained, exiting");
            })
            .map_err(|source| RtiServerError::Spawn {
                name: thread_name,
                source,
            })?;

        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            drain: Some(drain),
        })
    }

    /// Blocks while the queue is full
    pub fn push(&self, outgoing: Outgoing) {
        if outgoing.recipients.is_empty() {
            return;
        }
        let Some(sender) = &self.sender else {
            warn!(
                "Federation {}: queue closed, dropping {:?}",
                self.name, outgoing.message_type
            );
            return;
        };
        if sender.send(outgoing).is_err() {
            warn!("Federation {}: drain thread is gone", self.name);
        }
    }

    pub fn len(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lets the drain thread finish what is queued, then stops it
    pub fn shutdown(&mut self, join_timeout: Duration) {
        self.sender.take();
        let Some(drain) = self.drain.take() else {
            return;
        };
        let deadline = Instant::now() + join_timeout;
        while !drain.is_finished() {
            if Instant::now() >= deadline {
                warn!("Federation {}: outgoing thread did not stop in time", self.name);
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let _ = drain.join();
    }
}

impl Drop for OutgoingQueue {
    fn drop(&mut self) {
        // Dropping the sender is enough to end the drain loop
        self.sender.take();
    }
}

fn deliver(federation: &str, outgoing: &Outgoing) {
    for connection in &outgoing.recipients {
        let result = match outgoing.delivery {
            Delivery::Control => connection.send_control(&outgoing.payload),
            Delivery::Data => connection.send_data(&outgoing.payload),
        };
        if let Err(error) = result {
            warn!(
                "Federation {}: failed to deliver {:?} to connection {}: {}",
                federation,
                outgoing.message_type,
                connection.id(),
                error
            );
        }
    }
}
