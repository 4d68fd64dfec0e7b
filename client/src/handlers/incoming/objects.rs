use std::collections::BTreeMap;

use log::debug;

use rti_shared::{
    MessageBody, MessageContext, MessageSink, MessageType, ObjectInstance, Outcome, SinkPlugin,
};

use crate::{
    callback::Callback,
    handlers::{from_self, mismatched},
    state::LrcState,
};

/// Keeps the local repository in step with registrations and deletions and
/// turns remote data into discover, reflect, remove and receive callbacks
pub struct ObjectPlugin;

impl SinkPlugin<LrcState> for ObjectPlugin {
    fn build(&self, sink: &mut MessageSink<LrcState>) {
        sink.add_handler(MessageType::RegisterObject, "register", register)
            .add_handler(MessageType::UpdateAttributes, "reflect", reflect)
            .add_handler(MessageType::DeleteObject, "remove", remove)
            .add_handler(MessageType::SendInteraction, "receive", receive);
    }
}

fn register(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let registrar = context.request().source;
    let MessageBody::RegisterObject {
        class,
        object,
        name,
        attributes,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    if state.repository.contains(object) {
        debug!("{object} is already known, ignoring registration");
        return Outcome::Veto;
    }

    let mut instance = ObjectInstance::new(
        *object,
        *class,
        name.clone(),
        registrar,
        &state.model.attributes_of(class),
        attributes,
    );
    if state.interests.is_object_class_subscribed(state.federate, *class) {
        instance.set_discovered(true);
        state.callback(Callback::DiscoverObject {
            object: *object,
            class: *class,
            name: name.clone(),
        });
    }
    state.repository.add(instance);
    Outcome::Continue
}

fn reflect(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let timestamp = context.request().timestamp;
    let MessageBody::UpdateAttributes {
        object,
        values,
        tag,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    let local = state.federate;
    let Some(instance) = state.repository.get_mut(object) else {
        debug!("Update for unknown {object} dropped");
        return Outcome::Veto;
    };
    let Some(subscribed) = state.interests.subscribed_attributes(local, instance.class()) else {
        return Outcome::Veto;
    };
    let values: BTreeMap<_, _> = values
        .iter()
        .filter(|(attribute, _)| subscribed.contains(attribute))
        .map(|(attribute, value)| (*attribute, value.clone()))
        .collect();
    if values.is_empty() {
        return Outcome::Veto;
    }

    // subscribed after the registration went by
    if !instance.is_discovered() {
        instance.set_discovered(true);
        let discovery = Callback::DiscoverObject {
            object: *object,
            class: instance.class(),
            name: instance.name().to_string(),
        };
        state.callback(discovery);
    }
    state.callback(Callback::ReflectAttributes {
        object: *object,
        values,
        tag: tag.clone(),
        timestamp,
    });
    Outcome::Continue
}

fn remove(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let timestamp = context.request().timestamp;
    let MessageBody::DeleteObject { object, tag } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    let Some(instance) = state.repository.remove(object) else {
        return Outcome::Veto;
    };
    state.ownership.remove_object(*object);
    if instance.is_discovered() {
        state.callback(Callback::RemoveObject {
            object: *object,
            tag: tag.clone(),
            timestamp,
        });
    }
    Outcome::Continue
}

fn receive(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let timestamp = context.request().timestamp;
    let MessageBody::SendInteraction {
        class,
        parameters,
        tag,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    if !state
        .interests
        .is_interaction_class_subscribed(state.federate, *class)
    {
        return Outcome::Veto;
    }
    state.callback(Callback::ReceiveInteraction {
        class: *class,
        parameters: parameters.clone(),
        tag: tag.clone(),
        timestamp,
    });
    Outcome::Continue
}
