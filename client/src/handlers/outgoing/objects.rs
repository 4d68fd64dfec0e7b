use log::debug;

use rti_shared::{MessageBody, MessageContext, MessageSink, MessageType, RtiError, SinkPlugin};

use crate::{
    handlers::{checked, mismatched},
    state::LrcState,
};

pub struct ObjectPlugin;

impl SinkPlugin<LrcState> for ObjectPlugin {
    fn build(&self, sink: &mut MessageSink<LrcState>) {
        sink.add_handler(MessageType::UpdateAttributes, "update", checked(update))
            .add_handler(MessageType::DeleteObject, "delete", checked(delete))
            .add_handler(MessageType::SendInteraction, "interaction", checked(interaction));
    }
}

/// Only the owner of an attribute may update it
fn update(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::UpdateAttributes { object, values, .. } = &context.request().body else {
        return Err(mismatched(context));
    };
    let instance = state.object(*object)?;
    state.model.validate_attributes(&instance.class(), values.keys())?;
    if let Some(attribute) = values
        .keys()
        .find(|attribute| !instance.is_owned_by(attribute, state.federate))
    {
        return Err(RtiError::AttributeNotOwned {
            object: *object,
            attribute: *attribute,
        });
    }
    Ok(())
}

fn delete(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::DeleteObject { object, .. } = &context.request().body else {
        return Err(mismatched(context));
    };
    let object = *object;
    if state.object(object)?.registrar() != state.federate {
        return Err(RtiError::DeletePrivilegeNotHeld { object });
    }
    state.repository.remove(&object);
    state.ownership.remove_object(object);
    debug!("{} deleted {}", state.federate, object);
    Ok(())
}

fn interaction(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::SendInteraction { class, .. } = &context.request().body else {
        return Err(mismatched(context));
    };
    if !state.model.has_interaction_class(class) {
        return Err(RtiError::InteractionClassNotDefined {
            name: class.to_string(),
        });
    }
    if !state
        .interests
        .is_interaction_class_published(state.federate, *class)
    {
        return Err(RtiError::InteractionClassNotPublished { class: *class });
    }
    Ok(())
}
