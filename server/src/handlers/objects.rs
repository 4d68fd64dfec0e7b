use log::{debug, warn};

use rti_shared::{
    MessageBody, MessageContext, MessageSink, MessageType, ObjectInstance, Outcome, ResponseBody,
    RtiError, SinkPlugin,
};

use crate::{
    federation::Federation,
    handlers::{checked, member, mismatched},
};

pub struct ObjectPlugin;

impl SinkPlugin<Federation> for ObjectPlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::RegisterObject, "register", checked(register_object))
            .add_handler(MessageType::UpdateAttributes, "update", known_object)
            .add_handler(MessageType::DeleteObject, "delete", delete_object)
            .add_handler(MessageType::SendInteraction, "interaction", known_member);
    }
}

/// Assigns the object its handle, records it, and tells everyone else about
/// it. The registrar learns the handle from the response.
fn register_object(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::RegisterObject { class, name, .. } = &context.request().body else {
        return Err(mismatched(context));
    };
    let class = *class;
    let requested_name = name.clone();

    let Some(published) = federation.interests.published_attributes(source, class).cloned() else {
        return Err(RtiError::ObjectClassNotPublished { class });
    };
    if !requested_name.is_empty() && federation.repository.handle_for_name(&requested_name).is_some() {
        return Err(RtiError::internal(format!(
            "object name \"{requested_name}\" is already in use"
        )));
    }

    let object = federation.allocate_object_handle();
    let name = if requested_name.is_empty() {
        format!("HLAobject{}", object.value())
    } else {
        requested_name
    };
    let all = federation.model().attributes_of(&class);
    federation.repository.add(ObjectInstance::new(
        object,
        class,
        name.clone(),
        source,
        &all,
        &published,
    ));
    debug!("Registered {object} \"{name}\" of {class} for {source}");

    let announcement = {
        let request = context.request_mut();
        request.body = MessageBody::RegisterObject {
            class,
            object,
            name,
            attributes: published,
        };
        request.clone()
    };
    let origin = federation.federate(source).map(|federate| federate.connection());
    federation.broadcast_data(&announcement, origin);

    context.success_with(ResponseBody::Object(object));
    Ok(())
}

fn known_member(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    if federation.federate(source).is_none() {
        debug!("Dropping {:?} from non-member {source}", context.request().message_type());
        return Outcome::Veto;
    }
    Outcome::Continue
}

/// Stale updates for objects that are already gone are dropped
fn known_object(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let MessageBody::UpdateAttributes { object, .. } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    if !federation.repository.contains(object) {
        debug!("Dropping update for unknown {object}");
        return Outcome::Veto;
    }
    known_member(federation, context)
}

/// Only the registrar may delete an object
fn delete_object(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::DeleteObject { object, .. } = context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    let Some(instance) = federation.repository.get(&object) else {
        debug!("Dropping delete of unknown {object}");
        return Outcome::Veto;
    };
    if instance.registrar() != source {
        warn!("{source} tried to delete {object} registered by {}", instance.registrar());
        return Outcome::Veto;
    }
    federation.repository.remove(&object);
    federation.ownership.remove_object(object);
    Outcome::Continue
}
