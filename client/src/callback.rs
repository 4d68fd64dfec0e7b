use std::collections::{BTreeMap, BTreeSet};

use rti_shared::{
    AttributeHandle, FederateHandle, InteractionClassHandle, LogicalTime, ObjectClassHandle,
    ObjectHandle, ParameterHandle,
};

/// Something the RTI wants the federate to know about, handed out by
/// [`RtiAmbassador::tick`](crate::RtiAmbassador::tick)
#[derive(Clone, Debug, PartialEq)]
pub enum Callback {
    // Federation
    FederateJoined {
        federate: FederateHandle,
        name: String,
    },
    FederateResigned {
        federate: FederateHandle,
        name: String,
    },

    // Objects
    DiscoverObject {
        object: ObjectHandle,
        class: ObjectClassHandle,
        name: String,
    },
    ReflectAttributes {
        object: ObjectHandle,
        values: BTreeMap<AttributeHandle, Vec<u8>>,
        tag: Vec<u8>,
        timestamp: Option<LogicalTime>,
    },
    RemoveObject {
        object: ObjectHandle,
        tag: Vec<u8>,
        timestamp: Option<LogicalTime>,
    },
    ReceiveInteraction {
        class: InteractionClassHandle,
        parameters: BTreeMap<ParameterHandle, Vec<u8>>,
        tag: Vec<u8>,
        timestamp: Option<LogicalTime>,
    },

    // Ownership
    /// Another federate is giving these up and this federate may take them
    OwnershipOffered {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
        tag: Vec<u8>,
    },
    /// Another federate wants attributes this federate owns
    ReleaseRequested {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
        tag: Vec<u8>,
    },
    /// A negotiated divestiture finished and the attributes are gone
    DivestitureConfirmed {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
    },
    OwnershipAcquired {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
    },
    OwnershipUnavailable {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
    },
    AcquisitionCancellationConfirmed {
        object: ObjectHandle,
        attributes: BTreeSet<AttributeHandle>,
    },

    // Time
    TimeRegulationEnabled {
        time: LogicalTime,
    },
    TimeConstrainedEnabled {
        time: LogicalTime,
    },
    TimeAdvanceGrant {
        time: LogicalTime,
    },

    // Synchronization
    SyncPointRegistered {
        label: String,
    },
    AnnounceSyncPoint {
        label: String,
        tag: Vec<u8>,
    },
    FederationSynchronized {
        label: String,
    },

    // Save and restore
    InitiateSave {
        label: String,
    },
    FederationSaved {
        label: String,
        success: bool,
    },
    InitiateRestore {
        label: String,
    },
    FederationRestored {
        label: String,
        success: bool,
    },
}

/// Callbacks waiting to be handed to the federate, oldest first
#[derive(Default)]
pub struct Callbacks {
    pending: Vec<Callback>,
}

impl Callbacks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn push(&mut self, callback: Callback) {
        self.pending.push(callback);
    }

    pub fn drain(&mut self) -> Vec<Callback> {
        std::mem::take(&mut self.pending)
    }
}
