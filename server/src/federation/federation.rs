use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use log::{debug, info, warn};

use rti_shared::{
    ByteReader, ByteWriter, ConnectionId, FederateHandle, FederationHandle, InterestManager,
    MessageBody, MessageContext, MessageSink, ObjectHandle, ObjectModel, OwnershipManager,
    Repository, Response, RtiError, RtiMessage, SaveRestoreTarget, SerdeErr, TimeConfig,
};

use crate::{
    connection::FederateConnection,
    error::RtiServerError,
    federation::{
        outgoing::{Delivery, Outgoing, OutgoingQueue},
        time_manager::Grant,
        Federate, SaveRestoreManager, SyncPointManager, TimeManager,
    },
};

/// One running federation execution.
///
/// All processing for a federation happens under its lock, so the
/// bookkeeping below is only ever touched by one handler at a time.
pub struct Federation {
    handle: FederationHandle,
    name: String,
    version: String,
    model: ObjectModel,
    federates: BTreeMap<FederateHandle, Federate>,
    connections: HashMap<ConnectionId, Arc<dyn FederateConnection>>,
    next_federate: u32,
    next_object: u32,
    pub ownership: OwnershipManager,
    pub repository: Repository,
    pub interests: InterestManager,
    pub time: TimeManager,
    pub sync_points: SyncPointManager,
    pub save_restore: SaveRestoreManager,
    sink: Arc<MessageSink<Federation>>,
    outgoing: OutgoingQueue,
}

impl Federation {
    pub fn new(
        handle: FederationHandle,
        name: &str,
        version: &str,
        model: ObjectModel,
        sink: Arc<MessageSink<Federation>>,
        time: TimeConfig,
        queue_capacity: usize,
    ) -> Result<Self, RtiServerError> {
        Ok(Self {
            handle,
            name: name.to_string(),
            version: version.to_string(),
            model,
            federates: BTreeMap::new(),
            connections: HashMap::new(),
            next_federate: 1,
            next_object: 1,
            ownership: OwnershipManager::new(),
            repository: Repository::new(),
            interests: InterestManager::new(),
            time: TimeManager::new(time),
            sync_points: SyncPointManager::new(),
            save_restore: SaveRestoreManager::new(),
            sink,
            outgoing: OutgoingQueue::start(name, queue_capacity)?,
        })
    }

    pub fn handle(&self) -> FederationHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn model(&self) -> &ObjectModel {
        &self.model
    }

    // Federates

    pub fn federate(&self, handle: FederateHandle) -> Option<&Federate> {
        self.federates.get(&handle)
    }

    pub fn federate_mut(&mut self, handle: FederateHandle) -> Option<&mut Federate> {
        self.federates.get_mut(&handle)
    }

    pub fn federate_count(&self) -> usize {
        self.federates.len()
    }

    pub fn federate_handles(&self) -> BTreeSet<FederateHandle> {
        self.federates.keys().copied().collect()
    }

    pub fn federates(&self) -> impl Iterator<Item = &Federate> {
        self.federates.values()
    }

    pub fn federate_by_name(&self, name: &str) -> Option<&Federate> {
        self.federates
            .values()
            .find(|federate| federate.name().eq_ignore_ascii_case(name))
    }

    pub fn check_member(&self, handle: FederateHandle) -> Result<&Federate, RtiError> {
        self.federates
            .get(&handle)
            .ok_or(RtiError::FederateNotExecutionMember)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn has_connection(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    pub fn federates_on(&self, connection: ConnectionId) -> Vec<FederateHandle> {
        self.federates
            .values()
            .filter(|federate| federate.connection() == connection)
            .map(Federate::handle)
            .collect()
    }

    /// Adds a federate under a fresh handle. Names are unique within the
    /// federation, ignoring case.
    pub fn join_federate(
        &mut self,
        name: &str,
        federate_type: &str,
        connection: Arc<dyn FederateConnection>,
    ) -> Result<FederateHandle, RtiError> {
        if self.federate_by_name(name).is_some() {
            return Err(RtiError::FederateNameAlreadyInUse {
                name: name.to_string(),
            });
        }
        self.save_restore.check_idle()?;

        let handle = FederateHandle::new(self.next_federate);
        self.next_federate += 1;

        let connection_id = connection.id();
        self.connections.entry(connection_id).or_insert(connection);
        self.federates
            .insert(handle, Federate::new(handle, name, federate_type, connection_id));
        self.time.add_federate(handle);

        info!(
            "Federation {}: federate \"{}\" joined as {} on connection {}",
            self.name, name, handle, connection_id
        );
        self.queue_control_message(RtiMessage::from_rti(
            self.handle,
            MessageBody::FederateJoined {
                federate: handle,
                name: name.to_string(),
            },
        ));
        Ok(handle)
    }

    /// Removes a federate and everything the federation tracked for it. The
    /// connection is dropped once no remaining federate uses it.
    pub fn resign_federate(&mut self, handle: FederateHandle) -> Result<(), RtiError> {
        let Some(federate) = self.federates.remove(&handle) else {
            return Err(RtiError::FederateNotExecutionMember);
        };

        self.ownership.remove_federate(handle);
        let released = self.repository.release_all_owned_by(handle);
        if !released.is_empty() {
            debug!(
                "Federation {}: {} left owning attributes of {} objects",
                self.name,
                handle,
                released.len()
            );
        }
        self.interests.remove_federate(handle);

        let grants = self.time.remove_federate(handle);
        self.send_grants(grants);

        for (label, participants) in self.sync_points.remove_federate(handle) {
            self.announce_synchronized(&label, &participants);
        }
        for (is_save, completion) in self.save_restore.remove_federate(handle) {
            let body = if is_save {
                MessageBody::FederationSaved {
                    label: completion.label,
                    success: completion.success,
                }
            } else {
                MessageBody::FederationRestored {
                    label: completion.label,
                    success: completion.success,
                }
            };
            self.queue_control_message(RtiMessage::from_rti(self.handle, body));
        }

        let connection = federate.connection();
        let still_used = self
            .federates
            .values()
            .any(|other| other.connection() == connection);
        if !still_used {
            self.connections.remove(&connection);
        }

        info!(
            "Federation {}: federate \"{}\" ({}) resigned",
            self.name,
            federate.name(),
            handle
        );
        self.queue_control_message(RtiMessage::from_rti(
            self.handle,
            MessageBody::FederateResigned {
                federate: handle,
                name: federate.name().to_string(),
            },
        ));
        Ok(())
    }

    pub fn allocate_object_handle(&mut self) -> ObjectHandle {
        let handle = ObjectHandle::new(self.next_object);
        self.next_object += 1;
        handle
    }

    // Message routing

    /// Processes a request through the federation's handlers and returns
    /// the response for the caller
    pub fn process_request(&mut self, message: RtiMessage) -> Response {
        let sink = self.sink.clone();
        let mut context = MessageContext::new(message);
        sink.process_request(self, &mut context)
    }

    /// Sends a control message to every connection
    pub fn queue_control_message(&self, message: RtiMessage) {
        let recipients = self.connections.values().cloned().collect();
        self.queue(Delivery::Control, &message, recipients);
    }

    /// Sends a control message to the connection of `message.target` only
    pub fn queue_unicast(&self, message: RtiMessage) {
        let Some(target) = message.target else {
            warn!(
                "Federation {}: unicast {:?} has no target",
                self.name,
                message.message_type()
            );
            return;
        };
        let Some(connection) = self
            .federates
            .get(&target)
            .and_then(|federate| self.connections.get(&federate.connection()))
        else {
            debug!("Federation {}: no connection for {}", self.name, target);
            return;
        };
        self.queue(Delivery::Control, &message, vec![connection.clone()]);
    }

    /// Runs a data message through the federation's own handlers once, then
    /// forwards it to every connection except the one it came from
    pub fn queue_data_message(&mut self, message: RtiMessage, origin: Option<ConnectionId>) {
        let sink = self.sink.clone();
        let mut context = MessageContext::new(message);
        if !sink.process_quietly(self, &mut context) {
            return;
        }
        let message = context.into_request();
        self.broadcast_data(&message, origin);
    }

    /// Forwards a data message without running it through the handlers
    pub fn broadcast_data(&self, message: &RtiMessage, origin: Option<ConnectionId>) {
        let recipients = self
            .connections
            .iter()
            .filter(|(id, _)| Some(**id) != origin)
            .map(|(_, connection)| connection.clone())
            .collect();
        self.queue(Delivery::Data, message, recipients);
    }

    fn queue(&self, delivery: Delivery, message: &RtiMessage, recipients: Vec<Arc<dyn FederateConnection>>) {
        self.outgoing.push(Outgoing {
            delivery,
            message_type: message.message_type(),
            payload: Arc::new(message.to_bytes()),
            recipients,
        });
    }

    // Shared notifications

    pub fn send_grants(&self, grants: Vec<Grant>) {
        for (federate, time) in grants {
            self.queue_unicast(
                RtiMessage::from_rti(self.handle, MessageBody::TimeAdvanceGrant { time })
                    .with_target(federate),
            );
        }
    }

    pub fn announce_synchronized(&self, label: &str, participants: &BTreeSet<FederateHandle>) {
        for federate in participants {
            self.queue_unicast(
                RtiMessage::from_rti(
                    self.handle,
                    MessageBody::FederationSynchronized {
                        label: label.to_string(),
                    },
                )
                .with_target(*federate),
            );
        }
    }

    /// Stops the outgoing thread once queued messages are out
    pub fn shutdown(&mut self, join_timeout: Duration) {
        self.outgoing.shutdown(join_timeout);
    }
}

impl SaveRestoreTarget for Federation {
    fn save_to(&self, writer: &mut ByteWriter) {
        self.ownership.save_to(writer);
        self.time.save_to(writer);
    }

    fn restore_from(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let mut ownership = self.ownership.clone();
        ownership.restore_from(reader)?;
        let mut time = self.time.clone();
        time.restore_from(reader)?;
        self.ownership = ownership;
        self.time = time;
        Ok(())
    }
}
