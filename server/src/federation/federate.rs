use std::collections::BTreeSet;

use rti_shared::{ConnectionId, FederateHandle, ObjectHandle};

/// Usage counters kept for each joined federate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FederateMetrics {
    pub updates_sent: u64,
    pub reflections_received: u64,
    pub interactions_sent: u64,
    pub interactions_received: u64,
    pub objects_registered: u64,
    pub objects_owned: BTreeSet<ObjectHandle>,
    pub objects_updated: BTreeSet<ObjectHandle>,
    pub objects_reflected: BTreeSet<ObjectHandle>,
}

/// One joined federate, as the RTI sees it
#[derive(Clone, Debug)]
pub struct Federate {
    handle: FederateHandle,
    name: String,
    federate_type: String,
    connection: ConnectionId,
    pub metrics: FederateMetrics,
}

impl Federate {
    pub fn new(handle: FederateHandle, name: &str, federate_type: &str, connection: ConnectionId) -> Self {
        Self {
            handle,
            name: name.to_string(),
            federate_type: federate_type.to_string(),
            connection,
            metrics: FederateMetrics::default(),
        }
    }

    pub fn handle(&self) -> FederateHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn federate_type(&self) -> &str {
        &self.federate_type
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }
}
