use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use rti_shared::{
    ConnectionId, FederationHandle, MessageBody, MessageSink, ObjectModel, ResignAction,
    Response, ResponseBody, RtiError, RtiMessage, RuntimeContext, TimeConfig,
};

use crate::{
    connection::FederateConnection,
    federation::Federation,
    handlers::build_federation_sink,
};

/// Every federation hosted by one RTI
pub struct FederationManager {
    context: Arc<RuntimeContext>,
    federations: RwLock<HashMap<FederationHandle, Arc<Mutex<Federation>>>>,
    sink: Arc<MessageSink<Federation>>,
    time: TimeConfig,
    queue_capacity: usize,
    join_timeout: Duration,
}

impl FederationManager {
    pub fn new(
        context: Arc<RuntimeContext>,
        time: TimeConfig,
        queue_capacity: usize,
        join_timeout: Duration,
    ) -> Self {
        Self {
            context,
            federations: RwLock::new(HashMap::new()),
            sink: Arc::new(build_federation_sink()),
            time,
            queue_capacity,
            join_timeout,
        }
    }

    pub fn federation(&self, handle: FederationHandle) -> Option<Arc<Mutex<Federation>>> {
        self.federations.read().get(&handle).cloned()
    }

    pub fn federation_by_name(&self, name: &str) -> Option<Arc<Mutex<Federation>>> {
        self.federations
            .read()
            .values()
            .find(|federation| federation.lock().name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn federation_count(&self) -> usize {
        self.federations.read().len()
    }

    pub fn federation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .federations
            .read()
            .values()
            .map(|federation| federation.lock().name().to_string())
            .collect();
        names.sort();
        names
    }

    // Lifecycle

    pub fn create_federation(
        &self,
        name: &str,
        version: &str,
        model: ObjectModel,
    ) -> Result<FederationHandle, RtiError> {
        // Held across the check and the insert so two creates cannot race
        let mut federations = self.federations.write();
        let exists = federations
            .values()
            .any(|federation| federation.lock().name().eq_ignore_ascii_case(name));
        if exists {
            return Err(RtiError::FederationExecutionAlreadyExists {
                name: name.to_string(),
            });
        }

        let handle = self.context.next_federation_handle();
        let federation = Federation::new(
            handle,
            name,
            version,
            model,
            self.sink.clone(),
            self.time.clone(),
            self.queue_capacity,
        )
        .map_err(|error| RtiError::internal(error.to_string()))?;
        federations.insert(handle, Arc::new(Mutex::new(federation)));
        info!("Created federation \"{}\" as {}", name, handle);
        Ok(handle)
    }

    pub fn destroy_federation(&self, name: &str) -> Result<(), RtiError> {
        let mut federations = self.federations.write();
        let Some((handle, federation)) = federations
            .iter()
            .find(|(_, federation)| federation.lock().name().eq_ignore_ascii_case(name))
            .map(|(handle, federation)| (*handle, federation.clone()))
        else {
            return Err(RtiError::FederationExecutionDoesNotExist {
                name: name.to_string(),
            });
        };

        let mut federation = federation.lock();
        let count = federation.federate_count();
        if count > 0 {
            return Err(RtiError::FederatesCurrentlyJoined {
                name: name.to_string(),
                count: count as u32,
            });
        }
        federations.remove(&handle);
        federation.shutdown(self.join_timeout);
        info!("Destroyed federation \"{}\"", name);
        Ok(())
    }

    // Dispatch

    /// Handles a control request from an LRC and produces its response
    pub fn dispatch_request(
        &self,
        message: RtiMessage,
        connection: &Arc<dyn FederateConnection>,
    ) -> Response {
        let result = match message.body {
            MessageBody::CreateFederation {
                ref name,
                ref model,
                ref version,
            } => self
                .create_federation(name, version, model.clone())
                .map(ResponseBody::Federation),
            MessageBody::DestroyFederation { ref name } => {
                self.destroy_federation(name).map(|_| ResponseBody::Empty)
            }
            MessageBody::JoinFederation {
                ref federation,
                ref federate_name,
                ref federate_type,
            } => self.join(federation, federate_name, federate_type, connection),
            _ => return self.dispatch_to_federation(message),
        };
        match result {
            Ok(body) => Response::Success(body),
            Err(error) => Response::Failure(error),
        }
    }

    fn join(
        &self,
        name: &str,
        federate_name: &str,
        federate_type: &str,
        connection: &Arc<dyn FederateConnection>,
    ) -> Result<ResponseBody, RtiError> {
        let federation = self.federation_by_name(name).ok_or_else(|| {
            RtiError::FederationExecutionDoesNotExist {
                name: name.to_string(),
            }
        })?;
        let mut federation = federation.lock();
        let federate = federation.join_federate(federate_name, federate_type, connection.clone())?;
        Ok(ResponseBody::Joined {
            federate,
            federation: federation.handle(),
            model: federation.model().clone(),
        })
    }

    fn dispatch_to_federation(&self, message: RtiMessage) -> Response {
        let Some(federation) = self.federation(message.federation) else {
            return Response::Failure(RtiError::FederateNotExecutionMember);
        };
        let mut federation = federation.lock();
        federation.process_request(message)
    }

    /// Handles a data message: bookkeeping, then fan out to everyone else
    pub fn dispatch_data(&self, message: RtiMessage, origin: ConnectionId) {
        let Some(federation) = self.federation(message.federation) else {
            debug!(
                "Dropping {:?} for unknown {}",
                message.message_type(),
                message.federation
            );
            return;
        };
        let mut federation = federation.lock();
        if federation.federate(message.source).is_none() {
            warn!(
                "Federation {}: dropping {:?} from non-member {}",
                federation.name(),
                message.message_type(),
                message.source
            );
            return;
        }
        federation.queue_data_message(message, Some(origin));
    }

    /// A connection dropped: resign every federate that was using it
    pub fn connection_lost(&self, connection: ConnectionId) {
        let federations: Vec<Arc<Mutex<Federation>>> =
            self.federations.read().values().cloned().collect();
        for federation in federations {
            let mut federation = federation.lock();
            for federate in federation.federates_on(connection) {
                warn!(
                    "Federation {}: {} lost its connection, resigning it",
                    federation.name(),
                    federate
                );
                let handle = federation.handle();
                let resign = RtiMessage::new(
                    federate,
                    handle,
                    MessageBody::ResignFederation {
                        action: ResignAction::CancelThenDivest,
                    },
                );
                if let Response::Failure(error) = federation.process_request(resign) {
                    warn!("Could not resign {}: {}", federate, error);
                }
            }
        }
    }

    /// Stops every federation's outgoing thread
    pub fn shutdown(&self) {
        let federations: Vec<Arc<Mutex<Federation>>> =
            self.federations.write().drain().map(|(_, federation)| federation).collect();
        for federation in federations {
            federation.lock().shutdown(self.join_timeout);
        }
    }
}
