use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::{ConnectionId, FederationHandle};

/// Process-local counters for identifiers that must be unique across every
/// federation an RTI hosts
#[derive(Debug)]
pub struct RuntimeContext {
    next_federation: AtomicU32,
    next_connection: AtomicU32,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self {
            next_federation: AtomicU32::new(1),
            next_connection: AtomicU32::new(1),
        }
    }

    pub fn next_federation_handle(&self) -> FederationHandle {
        FederationHandle::new(self.next_federation.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }
}
