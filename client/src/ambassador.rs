use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crossbeam_channel::Receiver;
use log::{debug, info, warn};

use rti_shared::{
    validate_start_time, AdvanceKind, AdvanceState, AttributeHandle, Channel, FederateHandle,
    FederationHandle, InteractionClassHandle, LogicalTime, MessageBody, MessageContext,
    MessageSink, MessageType, ObjectClassHandle, ObjectHandle, ObjectInstance, ObjectModel,
    ParameterHandle, ResignAction, Response, ResponseBody, RtiError, RtiMessage, TimeService,
    TimeStatus, TriState,
};

use crate::{
    callback::Callback,
    handlers::{build_incoming_sink, build_outgoing_sink, check_acquirable},
    listener::LrcListener,
    state::LrcState,
    LrcConfig,
};

/// A federate's handle on the RTI.
///
/// Every service call runs on the caller's thread. Management requests
/// block until the RTI answers; data is sent and forgotten. Messages from
/// the RTI wait in a queue until [`tick`](Self::tick) delivers them, so
/// callbacks only ever surface on the thread that ticks.
pub struct RtiAmbassador {
    config: LrcConfig,
    channel: Channel,
    incoming: Receiver<RtiMessage>,
    disconnected: Arc<AtomicBool>,
    state: LrcState,
    incoming_sink: MessageSink<LrcState>,
    outgoing_sink: MessageSink<LrcState>,
}

impl RtiAmbassador {
    /// Connects to the RTI at `config.rti_address`
    pub fn connect(config: LrcConfig) -> Result<Self, RtiError> {
        let channel = Channel::connect(config.rti_address, "lrc", config.connection.clone())?;
        let (sender, incoming) = crossbeam_channel::unbounded();
        let disconnected = Arc::new(AtomicBool::new(false));
        channel.start(Arc::new(LrcListener::new(sender, disconnected.clone())))?;
        info!("Connected to RTI at {}: {}", config.rti_address, channel.welcome());

        Ok(Self {
            config,
            channel,
            incoming,
            disconnected,
            state: LrcState::new(),
            incoming_sink: build_incoming_sink(),
            outgoing_sink: build_outgoing_sink(),
        })
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst) && self.channel.is_open()
    }

    /// Closes the connection. A joined federate should resign first.
    pub fn disconnect(&mut self) {
        if self.state.is_joined() {
            warn!(
                "{} disconnecting without resigning from \"{}\"",
                self.state.federate, self.state.federation_name
            );
        }
        self.channel.close();
    }

    fn check_connected(&self) -> Result<(), RtiError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(RtiError::NotConnected)
        }
    }

    // Plumbing

    /// Sends a management request and waits for the answer. A failure
    /// response comes back as the error the RTI raised.
    fn request(&self, body: MessageBody) -> Result<ResponseBody, RtiError> {
        self.check_connected()?;
        let message = self.state.message(body);
        let reply = self.channel.send_control_sync(&message.to_bytes())?;
        Response::from_bytes(&reply)?.into_result()
    }

    /// Runs a data message past the outgoing chain and sends what comes
    /// out. Returns the message as sent, or `None` when the chain decided
    /// there was nothing to send.
    fn send_data(&mut self, message: RtiMessage) -> Result<Option<RtiMessage>, RtiError> {
        self.check_connected()?;
        let mut context = MessageContext::new(message);
        let passed = self.outgoing_sink.process(&mut self.state, &mut context)?;
        let sent = if passed {
            let message = context.into_request();
            self.channel.send_data(&message.to_bytes())?;
            Some(message)
        } else {
            None
        };
        self.flush_outbox();
        Ok(sent)
    }

    fn data(&self, body: MessageBody, timestamp: Option<LogicalTime>) -> RtiMessage {
        self.state.message(body).with_timestamp(timestamp)
    }

    /// Sends what the handlers queued while processing
    fn flush_outbox(&mut self) {
        for message in self.state.take_outbox() {
            if let Err(error) = self.channel.send_data(&message.to_bytes()) {
                warn!(
                    "{}: could not send {:?}: {}",
                    self.state.federate,
                    message.message_type(),
                    error
                );
            }
        }
    }

    // Callback delivery

    /// Moves everything received so far into the delivery queues.
    /// Time-stamped data waits for a grant when this federate is
    /// constrained; the rest is delivered in arrival order.
    fn receive(&mut self) {
        let constrained = self.state.time.is_constrained();
        for message in self.incoming.try_iter() {
            let ordered = constrained
                && message.timestamp.is_some()
                && matches!(
                    message.message_type(),
                    MessageType::UpdateAttributes
                        | MessageType::DeleteObject
                        | MessageType::SendInteraction
                );
            if ordered {
                self.state.queue.push_tso(message);
            } else {
                self.state.queue.push_ro(message);
            }
        }
    }

    fn deliver(&mut self, message: RtiMessage) {
        let mut context = MessageContext::new(message);
        self.incoming_sink
            .process_quietly(&mut self.state, &mut context);
    }

    /// Processes everything the RTI has sent and returns the resulting
    /// callbacks in order. A grant releases every TSO message up to the
    /// granted time ahead of the grant itself.
    pub fn tick(&mut self) -> Vec<Callback> {
        self.receive();
        while let Some(message) = self.state.queue.pop_ro() {
            if let MessageBody::TimeAdvanceGrant { time } = message.body {
                if message.is_for(self.state.federate) {
                    for released in self.state.queue.release_tso_up_to(time) {
                        self.deliver(released);
                    }
                }
            }
            self.deliver(message);
        }
        self.flush_outbox();
        self.state.callbacks.drain()
    }

    /// Hands out callbacks raised by service calls without touching the
    /// incoming queue
    pub fn poll_callbacks(&mut self) -> Vec<Callback> {
        self.state.callbacks.drain()
    }

    // Federation management

    pub fn create_federation(
        &mut self,
        name: &str,
        model: ObjectModel,
    ) -> Result<FederationHandle, RtiError> {
        let body = self.request(MessageBody::CreateFederation {
            name: name.to_string(),
            model,
            version: self.config.hla_version.clone(),
        })?;
        match body {
            ResponseBody::Federation(handle) => Ok(handle),
            other => Err(unexpected(&other)),
        }
    }

    pub fn destroy_federation(&mut self, name: &str) -> Result<(), RtiError> {
        self.request(MessageBody::DestroyFederation {
            name: name.to_string(),
        })
        .map(|_| ())
    }

    pub fn join_federation(
        &mut self,
        federate_name: &str,
        federate_type: &str,
        federation_name: &str,
    ) -> Result<FederateHandle, RtiError> {
        self.state.check_not_joined()?;
        let body = self.request(MessageBody::JoinFederation {
            federation: federation_name.to_string(),
            federate_name: federate_name.to_string(),
            federate_type: federate_type.to_string(),
        })?;
        let ResponseBody::Joined {
            federate,
            federation,
            model,
        } = body
        else {
            return Err(unexpected(&body));
        };
        // anything queued belongs to an earlier membership
        self.incoming.try_iter().for_each(drop);
        self.state.join(federate, federation, federation_name, model);
        info!("Joined \"{federation_name}\" as \"{federate_name}\" ({federate})");
        Ok(federate)
    }

    pub fn resign_federation(&mut self, action: ResignAction) -> Result<(), RtiError> {
        self.state.check_joined()?;
        self.request(MessageBody::ResignFederation { action })?;
        info!(
            "{} resigned from \"{}\"",
            self.state.federate, self.state.federation_name
        );
        self.state.reset();
        Ok(())
    }

    pub fn federate_handle(&self) -> Option<FederateHandle> {
        self.state.is_joined().then_some(self.state.federate)
    }

    pub fn object_model(&self) -> &ObjectModel {
        &self.state.model
    }

    // Declaration management

    fn check_object_class(
        &self,
        class: ObjectClassHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        if self.state.model.object_class(&class).is_none() {
            return Err(RtiError::ObjectClassNotDefined {
                name: class.to_string(),
            });
        }
        self.state.model.validate_attributes(&class, attributes)
    }

    fn check_interaction_class(&self, class: InteractionClassHandle) -> Result<(), RtiError> {
        self.state.check_joined()?;
        if !self.state.model.has_interaction_class(&class) {
            return Err(RtiError::InteractionClassNotDefined {
                name: class.to_string(),
            });
        }
        Ok(())
    }

    pub fn publish_object_class(
        &mut self,
        class: ObjectClassHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<(), RtiError> {
        self.check_object_class(class, attributes)?;
        self.request(MessageBody::PublishObjectClass {
            class,
            attributes: attributes.clone(),
        })?;
        let local = self.state.federate;
        self.state
            .interests
            .publish_object_class(local, class, attributes.clone());
        Ok(())
    }

    /// Gives up the class. Attributes still owned on its instances are
    /// divested unconditionally; a pending acquisition blocks the call.
    pub fn unpublish_object_class(&mut self, class: ObjectClassHandle) -> Result<(), RtiError> {
        self.check_object_class(class, &BTreeSet::new())?;
        let local = self.state.federate;
        let pending = self
            .state
            .ownership
            .objects_with_requests_by(local)
            .into_iter()
            .filter_map(|object| self.state.repository.get(&object))
            .any(|instance| instance.class() == class);
        if pending {
            return Err(RtiError::OwnershipAcquisitionPending { class });
        }

        for object in self.state.repository.instances_of_class(class) {
            let owned = self.state.object(object)?.all_owned_by(local);
            if !owned.is_empty() {
                self.unconditional_divest(object, &owned)?;
            }
        }
        self.request(MessageBody::UnpublishObjectClass { class })?;
        self.state.interests.unpublish_object_class(local, class);
        Ok(())
    }

    pub fn subscribe_object_class(
        &mut self,
        class: ObjectClassHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<(), RtiError> {
        self.check_object_class(class, attributes)?;
        self.request(MessageBody::SubscribeObjectClass {
            class,
            attributes: attributes.clone(),
        })?;
        let local = self.state.federate;
        self.state
            .interests
            .subscribe_object_class(local, class, attributes.clone());
        Ok(())
    }

    pub fn unsubscribe_object_class(&mut self, class: ObjectClassHandle) -> Result<(), RtiError> {
        self.check_object_class(class, &BTreeSet::new())?;
        self.request(MessageBody::UnsubscribeObjectClass { class })?;
        let local = self.state.federate;
        self.state.interests.unsubscribe_object_class(local, class);
        Ok(())
    }

    pub fn publish_interaction_class(
        &mut self,
        class: InteractionClassHandle,
    ) -> Result<(), RtiError> {
        self.check_interaction_class(class)?;
        self.request(MessageBody::PublishInteractionClass { class })?;
        let local = self.state.federate;
        self.state.interests.publish_interaction_class(local, class);
        Ok(())
    }

    pub fn unpublish_interaction_class(
        &mut self,
        class: InteractionClassHandle,
    ) -> Result<(), RtiError> {
        self.check_interaction_class(class)?;
        self.request(MessageBody::UnpublishInteractionClass { class })?;
        let local = self.state.federate;
        self.state.interests.unpublish_interaction_class(local, class);
        Ok(())
    }

    pub fn subscribe_interaction_class(
        &mut self,
        class: InteractionClassHandle,
    ) -> Result<(), RtiError> {
        self.check_interaction_class(class)?;
        self.request(MessageBody::SubscribeInteractionClass { class })?;
        let local = self.state.federate;
        self.state.interests.subscribe_interaction_class(local, class);
        Ok(())
    }

    pub fn unsubscribe_interaction_class(
        &mut self,
        class: InteractionClassHandle,
    ) -> Result<(), RtiError> {
        self.check_interaction_class(class)?;
        self.request(MessageBody::UnsubscribeInteractionClass { class })?;
        let local = self.state.federate;
        self.state.interests.unsubscribe_interaction_class(local, class);
        Ok(())
    }

    // Object management

    /// Registers a new instance of `class`. This federate starts out owning
    /// every attribute it publishes for the class.
    pub fn register_object(
        &mut self,
        class: ObjectClassHandle,
        name: Option<&str>,
    ) -> Result<ObjectHandle, RtiError> {
        self.state.check_joined()?;
        let local = self.state.federate;
        let Some(published) = self
            .state
            .interests
            .published_attributes(local, class)
            .cloned()
        else {
            return Err(RtiError::ObjectClassNotPublished { class });
        };
        let body = self.request(MessageBody::RegisterObject {
            class,
            object: ObjectHandle::new(0),
            name: name.unwrap_or_default().to_string(),
            attributes: published.clone(),
        })?;
        let ResponseBody::Object(object) = body else {
            return Err(unexpected(&body));
        };

        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("HLAobject{}", object.value()),
        };
        let mut instance = ObjectInstance::new(
            object,
            class,
            name,
            local,
            &self.state.model.attributes_of(&class),
            &published,
        );
        instance.set_discovered(true);
        self.state.repository.add(instance);
        debug!("{local} registered {object} of {class}");
        Ok(object)
    }

    pub fn update_attributes(
        &mut self,
        object: ObjectHandle,
        values: BTreeMap<AttributeHandle, Vec<u8>>,
        tag: Vec<u8>,
        timestamp: Option<LogicalTime>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let message = self.data(MessageBody::UpdateAttributes { object, values, tag }, timestamp);
        self.send_data(message).map(|_| ())
    }

    /// Only the registrar may delete an instance
    pub fn delete_object(
        &mut self,
        object: ObjectHandle,
        tag: Vec<u8>,
        timestamp: Option<LogicalTime>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let message = self.data(MessageBody::DeleteObject { object, tag }, timestamp);
        self.send_data(message).map(|_| ())
    }

    pub fn send_interaction(
        &mut self,
        class: InteractionClassHandle,
        parameters: BTreeMap<ParameterHandle, Vec<u8>>,
        tag: Vec<u8>,
        timestamp: Option<LogicalTime>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let message = self.data(
            MessageBody::SendInteraction {
                class,
                parameters,
                tag,
            },
            timestamp,
        );
        self.send_data(message).map(|_| ())
    }

    pub fn object_name(&self, object: ObjectHandle) -> Result<&str, RtiError> {
        self.state.object(object).map(|instance| instance.name())
    }

    pub fn object_class(&self, object: ObjectHandle) -> Result<ObjectClassHandle, RtiError> {
        self.state.object(object).map(|instance| instance.class())
    }

    // Ownership management

    pub fn unconditional_divest(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<(), RtiError> {
        self.divest(object, attributes, true, Vec::new())
    }

    /// Offers the attributes to other publishers. This federate keeps them
    /// until somebody takes them.
    pub fn negotiated_divest(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        tag: Vec<u8>,
    ) -> Result<(), RtiError> {
        self.divest(object, attributes, false, tag)
    }

    fn divest(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        unconditional: bool,
        tag: Vec<u8>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let message = self.data(
            MessageBody::AttributeDivest {
                object,
                attributes: attributes.clone(),
                unconditional,
                tag,
            },
            None,
        );
        self.send_data(message).map(|_| ())
    }

    pub fn cancel_divest(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let message = self.data(
            MessageBody::CancelDivest {
                object,
                attributes: attributes.clone(),
            },
            None,
        );
        self.send_data(message).map(|_| ())
    }

    /// Asks for the attributes. Unowned ones are taken on the spot; the
    /// owners of the rest are asked to release them.
    pub fn acquire(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        tag: Vec<u8>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        check_acquirable(&self.state, object, attributes)?;

        let instance = self.state.object(object)?;
        let unowned: BTreeSet<AttributeHandle> = attributes
            .iter()
            .filter(|attribute| instance.is_unowned(attribute))
            .copied()
            .collect();
        let mut remaining: BTreeSet<AttributeHandle> =
            attributes.difference(&unowned).copied().collect();
        if !unowned.is_empty() {
            let obtained = self.take_unowned(object, &unowned)?;
            remaining.extend(unowned.difference(&obtained));
        }
        if remaining.is_empty() {
            return Ok(());
        }

        let message = self.data(
            MessageBody::AttributeAcquire {
                object,
                attributes: remaining,
                if_available: false,
                tag,
            },
            None,
        );
        self.send_data(message).map(|_| ())
    }

    /// Takes whatever is unowned right now and reports the rest
    /// unavailable. Never waits on another federate.
    pub fn acquire_if_available(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<BTreeSet<AttributeHandle>, RtiError> {
        self.state.check_joined()?;
        check_acquirable(&self.state, object, attributes)?;

        let obtained = self.take_unowned(object, attributes)?;
        let unavailable: BTreeSet<AttributeHandle> =
            attributes.difference(&obtained).copied().collect();
        if !unavailable.is_empty() {
            self.state.callback(Callback::OwnershipUnavailable {
                object,
                attributes: unavailable.clone(),
            });
            let message = self.data(
                MessageBody::AttributesUnavailable {
                    object,
                    attributes: unavailable,
                },
                None,
            );
            self.send_data(message)?;
        }
        Ok(obtained)
    }

    /// The RTI settles best-effort bids so that two of them never both win
    fn take_unowned(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<BTreeSet<AttributeHandle>, RtiError> {
        let body = self.request(MessageBody::AttributeAcquire {
            object,
            attributes: attributes.clone(),
            if_available: true,
            tag: Vec::new(),
        })?;
        let ResponseBody::Attributes(obtained) = body else {
            return Err(unexpected(&body));
        };
        let local = self.state.federate;
        self.state.object_mut(object)?.set_owner(&obtained, Some(local));
        if !obtained.is_empty() {
            self.state.callback(Callback::OwnershipAcquired {
                object,
                attributes: obtained.clone(),
            });
        }
        Ok(obtained)
    }

    /// Answers a release request. Returns the attributes that actually
    /// changed hands: those with a bidder still waiting.
    pub fn release_response(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<BTreeSet<AttributeHandle>, RtiError> {
        self.state.check_joined()?;
        let message = self.data(
            MessageBody::AttributeRelease {
                object,
                attributes: attributes.clone(),
            },
            None,
        );
        match self.send_data(message)? {
            Some(RtiMessage {
                body: MessageBody::AttributeRelease { attributes, .. },
                ..
            }) => Ok(attributes),
            _ => Ok(BTreeSet::new()),
        }
    }

    pub fn cancel_acquisition(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let message = self.data(
            MessageBody::CancelAcquire {
                object,
                attributes: attributes.clone(),
            },
            None,
        );
        self.send_data(message).map(|_| ())
    }

    /// `None` when the attribute is unowned
    pub fn attribute_owner(
        &self,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<Option<FederateHandle>, RtiError> {
        let instance = self.state.object(object)?;
        if !instance.has_attribute(&attribute) {
            return Err(RtiError::AttributeNotDefined { attribute });
        }
        Ok(instance.owner(&attribute))
    }

    pub fn is_attribute_owned_by_federate(
        &self,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<bool, RtiError> {
        let owner = self.attribute_owner(object, attribute)?;
        Ok(owner.is_some() && owner == self.federate_handle())
    }

    // Time management

    fn check_time_service(&self) -> Result<(), RtiError> {
        self.state.check_joined()?;
        self.state.check_idle()?;
        if self.state.time.is_in_advancing_state() {
            return Err(RtiError::AdvanceAlreadyInProgress);
        }
        Ok(())
    }

    /// Returns the time the RTI confirmed, which is never behind this
    /// federate's current time
    pub fn enable_time_regulation(
        &mut self,
        time: LogicalTime,
        lookahead: LogicalTime,
    ) -> Result<LogicalTime, RtiError> {
        self.check_time_service()?;
        match self.state.time.regulating {
            TriState::On => {
                return Err(RtiError::AlreadyEnabled {
                    service: TimeService::Regulation,
                })
            }
            TriState::Pending => {
                return Err(RtiError::EnablePending {
                    service: TimeService::Regulation,
                })
            }
            TriState::Off => {}
        }
        let lookahead = self.config.time.validate_lookahead(lookahead)?;
        validate_start_time(time)?;

        self.state.time.regulating = TriState::Pending;
        let body = match self.request(MessageBody::EnableTimeRegulation { time, lookahead }) {
            Ok(body) => body,
            Err(error) => {
                self.state.time.regulating = TriState::Off;
                return Err(error);
            }
        };
        let ResponseBody::Time { time, lookahead } = body else {
            self.state.time.regulating = TriState::Off;
            return Err(unexpected(&body));
        };

        let status = &mut self.state.time;
        status.regulating = TriState::On;
        status.current_time = time;
        status.requested_time = time;
        status.set_lookahead(lookahead);
        self.state.callback(Callback::TimeRegulationEnabled { time });
        Ok(time)
    }

    pub fn disable_time_regulation(&mut self) -> Result<(), RtiError> {
        self.check_time_service()?;
        if self.state.time.regulating == TriState::Off {
            return Err(RtiError::WasNotEnabled {
                service: TimeService::Regulation,
            });
        }
        self.request(MessageBody::DisableTimeRegulation)?;
        self.state.time.regulating = TriState::Off;
        Ok(())
    }

    pub fn enable_time_constrained(&mut self) -> Result<LogicalTime, RtiError> {
        self.check_time_service()?;
        match self.state.time.constrained {
            TriState::On => {
                return Err(RtiError::AlreadyEnabled {
                    service: TimeService::Constrained,
                })
            }
            TriState::Pending => {
                return Err(RtiError::EnablePending {
                    service: TimeService::Constrained,
                })
            }
            TriState::Off => {}
        }

        self.state.time.constrained = TriState::Pending;
        let body = match self.request(MessageBody::EnableTimeConstrained) {
            Ok(body) => body,
            Err(error) => {
                self.state.time.constrained = TriState::Off;
                return Err(error);
            }
        };
        let ResponseBody::Time { time, .. } = body else {
            self.state.time.constrained = TriState::Off;
            return Err(unexpected(&body));
        };
        self.state.time.constrained = TriState::On;
        self.state.callback(Callback::TimeConstrainedEnabled { time });
        Ok(time)
    }

    pub fn disable_time_constrained(&mut self) -> Result<(), RtiError> {
        self.check_time_service()?;
        if self.state.time.constrained == TriState::Off {
            return Err(RtiError::WasNotEnabled {
                service: TimeService::Constrained,
            });
        }
        self.request(MessageBody::DisableTimeConstrained)?;
        self.state.time.constrained = TriState::Off;

        // nothing waits for a grant anymore
        for message in self.state.queue.release_tso_up_to(f64::MAX) {
            self.state.queue.push_ro(message);
        }
        Ok(())
    }

    /// Receive-order messages are delivered on every tick either way; the
    /// flag is kept for the RTI's view of this federate
    pub fn enable_asynchronous_delivery(&mut self) -> Result<(), RtiError> {
        self.set_asynchronous_delivery(true)
    }

    pub fn disable_asynchronous_delivery(&mut self) -> Result<(), RtiError> {
        self.set_asynchronous_delivery(false)
    }

    fn set_asynchronous_delivery(&mut self, enabled: bool) -> Result<(), RtiError> {
        self.state.check_joined()?;
        let service = TimeService::AsyncDelivery;
        if self.state.time.asynchronous == enabled {
            return Err(if enabled {
                RtiError::AlreadyEnabled { service }
            } else {
                RtiError::WasNotEnabled { service }
            });
        }
        let body = if enabled {
            MessageBody::EnableAsyncDelivery
        } else {
            MessageBody::DisableAsyncDelivery
        };
        self.request(body)?;
        self.state.time.asynchronous = enabled;
        Ok(())
    }

    /// Returns the lookahead actually in force
    pub fn modify_lookahead(&mut self, lookahead: LogicalTime) -> Result<LogicalTime, RtiError> {
        self.check_time_service()?;
        if !self.state.time.is_regulating() {
            return Err(RtiError::WasNotEnabled {
                service: TimeService::Regulation,
            });
        }
        let lookahead = self.config.time.validate_lookahead(lookahead)?;
        let body = self.request(MessageBody::ModifyLookahead { lookahead })?;
        let ResponseBody::Time { lookahead, .. } = body else {
            return Err(unexpected(&body));
        };
        self.state.time.set_lookahead(lookahead);
        Ok(lookahead)
    }

    pub fn time_advance_request(&mut self, time: LogicalTime) -> Result<(), RtiError> {
        self.advance(time, AdvanceKind::TimeAdvance)
    }

    pub fn time_advance_request_available(&mut self, time: LogicalTime) -> Result<(), RtiError> {
        self.advance(time, AdvanceKind::TimeAdvanceAvailable)
    }

    /// Advance to `time` or to the next queued TSO message, whichever comes
    /// first
    pub fn next_event_request(&mut self, time: LogicalTime) -> Result<(), RtiError> {
        self.advance(time, AdvanceKind::NextEvent)
    }

    pub fn next_event_request_available(&mut self, time: LogicalTime) -> Result<(), RtiError> {
        self.advance(time, AdvanceKind::NextEventAvailable)
    }

    /// Delivers every queued TSO message up to `max_time` on the next tick,
    /// then advances to `max_time`
    pub fn flush_queue_request(&mut self, max_time: LogicalTime) -> Result<(), RtiError> {
        self.advance(max_time, AdvanceKind::FlushQueue)
    }

    fn advance(&mut self, time: LogicalTime, kind: AdvanceKind) -> Result<(), RtiError> {
        self.check_time_service()?;
        let current = self.state.time.current_time;
        if time.is_nan() || time <= current {
            return Err(RtiError::FederationTimeAlreadyPassed {
                requested: time,
                current,
            });
        }

        self.receive();
        let mut time = time;
        if kind.is_next_event() {
            if let Some(next) = self.state.queue.peek_tso() {
                if next > current && next < time {
                    time = next;
                }
            }
        }
        if kind == AdvanceKind::FlushQueue {
            for message in self.state.queue.flush_tso(time) {
                self.state.queue.push_ro(message);
            }
        }

        self.state.time.time_advance_requested(time);
        if let Err(error) = self.request(MessageBody::TimeAdvanceRequest { time, kind }) {
            let status = &mut self.state.time;
            status.advancing = AdvanceState::None;
            status.requested_time = status.current_time;
            let lookahead = status.lookahead;
            status.set_lookahead(lookahead);
            return Err(error);
        }
        Ok(())
    }

    pub fn query_logical_time(&self) -> LogicalTime {
        self.state.time.current_time
    }

    pub fn query_lookahead(&self) -> LogicalTime {
        self.state.time.lookahead
    }

    /// This federate's own bound: the earliest time it may still send a
    /// time-stamped message
    pub fn query_lbts(&self) -> LogicalTime {
        self.state.time.lbts
    }

    pub fn time_status(&self) -> &TimeStatus {
        &self.state.time
    }

    // Synchronization points

    /// Registers `label` for the given federates, or the whole federation
    /// when `federates` is empty
    pub fn register_sync_point(
        &mut self,
        label: &str,
        tag: Vec<u8>,
        federates: &BTreeSet<FederateHandle>,
    ) -> Result<(), RtiError> {
        self.state.check_joined()?;
        self.request(MessageBody::RegisterSyncPoint {
            label: label.to_string(),
            tag,
            federates: federates.clone(),
        })?;
        self.state.callback(Callback::SyncPointRegistered {
            label: label.to_string(),
        });
        Ok(())
    }

    pub fn sync_point_achieved(&mut self, label: &str) -> Result<(), RtiError> {
        self.state.check_joined()?;
        self.request(MessageBody::SyncPointAchieved {
            label: label.to_string(),
        })
        .map(|_| ())
    }

    // Save and restore

    pub fn request_federation_save(&mut self, label: &str) -> Result<(), RtiError> {
        self.state.check_joined()?;
        self.state.check_idle()?;
        self.request(MessageBody::RequestSave {
            label: label.to_string(),
        })
        .map(|_| ())
    }

    pub fn federate_save_complete(&mut self, success: bool) -> Result<(), RtiError> {
        self.state.check_joined()?;
        if !self.state.save_in_progress {
            return Err(RtiError::SaveNotInitiated);
        }
        self.request(MessageBody::SaveComplete { success }).map(|_| ())
    }

    pub fn request_federation_restore(&mut self, label: &str) -> Result<(), RtiError> {
        self.state.check_joined()?;
        self.state.check_idle()?;
        self.request(MessageBody::RequestRestore {
            label: label.to_string(),
        })
        .map(|_| ())
    }

    pub fn federate_restore_complete(&mut self, success: bool) -> Result<(), RtiError> {
        self.state.check_joined()?;
        if !self.state.restore_in_progress {
            return Err(RtiError::RestoreNotRequested);
        }
        self.request(MessageBody::RestoreComplete { success }).map(|_| ())
    }

    pub fn is_save_in_progress(&self) -> bool {
        self.state.save_in_progress
    }

    pub fn is_restore_in_progress(&self) -> bool {
        self.state.restore_in_progress
    }
}

impl Drop for RtiAmbassador {
    fn drop(&mut self) {
        self.channel.close();
    }
}

fn unexpected(body: &ResponseBody) -> RtiError {
    RtiError::internal(format!("unexpected response {body:?}"))
}
