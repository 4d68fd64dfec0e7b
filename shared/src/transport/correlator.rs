use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::transport::TransportError;

#[derive(Default)]
struct Pending {
    slots: HashMap<u32, Option<Vec<u8>>>,
    closed: bool,
}

/// Matches synchronous control responses to the callers blocked on them
pub struct ResponseCorrelator {
    next_id: AtomicU32,
    pending: Mutex<Pending>,
    arrived: Condvar,
}

impl Default for ResponseCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCorrelator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            pending: Mutex::new(Pending::default()),
            arrived: Condvar::new(),
        }
    }

    /// Reserves a fresh request id. Zero is never handed out.
    pub fn register(&self) -> Result<u32, TransportError> {
        let mut id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            id = self.next_id.fetch_add(1, Ordering::Relaxed);
        }
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(TransportError::Disconnected);
        }
        pending.slots.insert(id, None);
        Ok(id)
    }

    /// Blocks until the response for `request_id` arrives, the channel
    /// closes or `timeout` elapses
    pub fn wait(&self, request_id: u32, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut pending = self.pending.lock();
        loop {
            if let Some(bytes) = pending.slots.get_mut(&request_id).and_then(Option::take) {
                pending.slots.remove(&request_id);
                return Ok(bytes);
            }
            if pending.closed {
                pending.slots.remove(&request_id);
                return Err(TransportError::Disconnected);
            }
            if Instant::now() >= deadline {
                pending.slots.remove(&request_id);
                return Err(TransportError::ResponseTimeout {
                    request_id,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            self.arrived.wait_until(&mut pending, deadline);
        }
    }

    /// Hands a response to its waiter. Returns false if nobody is waiting,
    /// usually because the request already timed out.
    pub fn deliver(&self, request_id: u32, bytes: Vec<u8>) -> bool {
        let mut pending = self.pending.lock();
        let Some(slot) = pending.slots.get_mut(&request_id) else {
            warn!("Dropping response to unknown request {}", request_id);
            return false;
        };
        *slot = Some(bytes);
        drop(pending);
        self.arrived.notify_all();
        true
    }

    pub fn cancel(&self, request_id: u32) {
        self.pending.lock().slots.remove(&request_id);
    }

    /// Wakes every waiter with a disconnect error and refuses new requests
    pub fn abandon_all(&self) {
        self.pending.lock().closed = true;
        self.arrived.notify_all();
    }

    pub fn outstanding(&self) -> usize {
        self.pending.lock().slots.len()
    }
}
