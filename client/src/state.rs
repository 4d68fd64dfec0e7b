use std::collections::HashMap;

use log::{debug, warn};

use rti_shared::{
    AdvanceState, ByteReader, ByteWriter, FederateHandle, FederationHandle, InterestManager,
    MessageBody, ObjectHandle, ObjectInstance, ObjectModel, OwnershipManager, Repository,
    RtiError, RtiMessage, SaveRestoreTarget, Serde, SerdeErr, TimeStatus,
};

use crate::{
    callback::{Callback, Callbacks},
    message_queue::MessageQueue,
};

/// Everything an LRC knows about its federate and the federation it is in.
/// Mutated only from the federate's own thread, through the handler sinks.
pub struct LrcState {
    pub federate: FederateHandle,
    pub federation: FederationHandle,
    pub federation_name: String,
    pub model: ObjectModel,
    pub time: TimeStatus,
    pub ownership: OwnershipManager,
    pub repository: Repository,
    pub interests: InterestManager,
    pub save_in_progress: bool,
    pub restore_in_progress: bool,
    pub queue: MessageQueue,
    pub callbacks: Callbacks,
    snapshots: HashMap<String, Vec<u8>>,
    outbox: Vec<RtiMessage>,
}

impl LrcState {
    pub fn new() -> Self {
        Self {
            federate: FederateHandle::RTI,
            federation: FederationHandle::NONE,
            federation_name: String::new(),
            model: ObjectModel::builder().build(),
            time: TimeStatus::new(),
            ownership: OwnershipManager::new(),
            repository: Repository::new(),
            interests: InterestManager::new(),
            save_in_progress: false,
            restore_in_progress: false,
            queue: MessageQueue::new(),
            callbacks: Callbacks::new(),
            snapshots: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    // Membership

    pub fn is_joined(&self) -> bool {
        !self.federate.is_rti()
    }

    pub fn check_joined(&self) -> Result<(), RtiError> {
        if self.is_joined() {
            Ok(())
        } else {
            Err(RtiError::FederateNotExecutionMember)
        }
    }

    pub fn check_not_joined(&self) -> Result<(), RtiError> {
        if self.is_joined() {
            return Err(RtiError::FederateAlreadyExecutionMember {
                federation: self.federation_name.clone(),
            });
        }
        Ok(())
    }

    /// Fails while a save or restore is underway
    pub fn check_idle(&self) -> Result<(), RtiError> {
        if self.save_in_progress {
            return Err(RtiError::SaveInProgress);
        }
        if self.restore_in_progress {
            return Err(RtiError::RestoreInProgress);
        }
        Ok(())
    }

    pub fn join(
        &mut self,
        federate: FederateHandle,
        federation: FederationHandle,
        federation_name: &str,
        model: ObjectModel,
    ) {
        self.reset();
        self.federate = federate;
        self.federation = federation;
        self.federation_name = federation_name.to_string();
        self.model = model;
    }

    /// Forgets the federation, as after a resign
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // Lookups

    pub fn object(&self, object: ObjectHandle) -> Result<&ObjectInstance, RtiError> {
        self.repository
            .get(&object)
            .ok_or(RtiError::ObjectNotKnown { object })
    }

    pub fn object_mut(&mut self, object: ObjectHandle) -> Result<&mut ObjectInstance, RtiError> {
        self.repository
            .get_mut(&object)
            .ok_or(RtiError::ObjectNotKnown { object })
    }

    // Outgoing

    /// Wraps a body in an envelope from this federate
    pub fn message(&self, body: MessageBody) -> RtiMessage {
        RtiMessage::new(self.federate, self.federation, body)
    }

    /// Queues a data message that a handler decided to send. Flushed by the
    /// ambassador once processing finishes.
    pub fn send_later(&mut self, message: RtiMessage) {
        self.outbox.push(message);
    }

    pub fn take_outbox(&mut self) -> Vec<RtiMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn callback(&mut self, callback: Callback) {
        self.callbacks.push(callback);
    }

    // Snapshots

    pub fn store_snapshot(&mut self, label: &str) {
        debug!("Saving local state as \"{label}\"");
        let snapshot = self.snapshot();
        self.snapshots.insert(label.to_string(), snapshot);
    }

    /// Reloads a stored snapshot. Returns false when nothing was saved under
    /// `label` or the bytes no longer decode.
    pub fn load_snapshot(&mut self, label: &str) -> bool {
        let Some(bytes) = self.snapshots.get(label).cloned() else {
            warn!("No local snapshot named \"{label}\"");
            return false;
        };
        match self.restore_from(&mut ByteReader::new(&bytes)) {
            Ok(()) => true,
            Err(error) => {
                warn!("Local snapshot \"{label}\" is unreadable: {error}");
                false
            }
        }
    }
}

impl Default for LrcState {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveRestoreTarget for LrcState {
    fn save_to(&self, writer: &mut ByteWriter) {
        self.ownership.save_to(writer);
        self.time.ser(writer);
    }

    fn restore_from(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let mut ownership = OwnershipManager::new();
        ownership.restore_from(reader)?;
        let mut time = TimeStatus::de(reader)?;
        // a restore never leaves an advance hanging
        time.advancing = AdvanceState::None;

        self.ownership = ownership;
        self.time = time;
        Ok(())
    }
}
