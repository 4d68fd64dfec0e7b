use rti_shared::{
    MessageBody, MessageContext, MessageSink, MessageType, ObjectClassHandle, RtiError, SinkPlugin,
};

use crate::{
    federation::Federation,
    handlers::{checked, member, mismatched},
};

pub struct DeclarationPlugin;

impl SinkPlugin<Federation> for DeclarationPlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::PublishObjectClass, "publish-object", checked(publish_object_class))
            .add_handler(MessageType::UnpublishObjectClass, "unpublish-object", checked(unpublish_object_class))
            .add_handler(MessageType::SubscribeObjectClass, "subscribe-object", checked(subscribe_object_class))
            .add_handler(
                MessageType::UnsubscribeObjectClass,
                "unsubscribe-object",
                checked(unsubscribe_object_class),
            )
            .add_handler(
                MessageType::PublishInteractionClass,
                "publish-interaction",
                checked(interaction_interest),
            )
            .add_handler(
                MessageType::UnpublishInteractionClass,
                "unpublish-interaction",
                checked(interaction_interest),
            )
            .add_handler(
                MessageType::SubscribeInteractionClass,
                "subscribe-interaction",
                checked(interaction_interest),
            )
            .add_handler(
                MessageType::UnsubscribeInteractionClass,
                "unsubscribe-interaction",
                checked(interaction_interest),
            );
    }
}

fn check_object_class(federation: &Federation, class: &ObjectClassHandle) -> Result<(), RtiError> {
    if federation.model().object_class(class).is_none() {
        return Err(RtiError::ObjectClassNotDefined {
            name: class.to_string(),
        });
    }
    Ok(())
}

fn publish_object_class(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::PublishObjectClass { class, attributes } = &context.request().body else {
        return Err(mismatched(context));
    };
    check_object_class(federation, class)?;
    federation.model().validate_attributes(class, attributes)?;
    federation
        .interests
        .publish_object_class(source, *class, attributes.clone());
    context.success();
    Ok(())
}

fn unpublish_object_class(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::UnpublishObjectClass { class } = context.request().body else {
        return Err(mismatched(context));
    };
    check_object_class(federation, &class)?;
    federation.interests.unpublish_object_class(source, class);
    context.success();
    Ok(())
}

fn subscribe_object_class(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::SubscribeObjectClass { class, attributes } = &context.request().body else {
        return Err(mismatched(context));
    };
    check_object_class(federation, class)?;
    federation.model().validate_attributes(class, attributes)?;
    federation
        .interests
        .subscribe_object_class(source, *class, attributes.clone());
    context.success();
    Ok(())
}

fn unsubscribe_object_class(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::UnsubscribeObjectClass { class } = context.request().body else {
        return Err(mismatched(context));
    };
    check_object_class(federation, &class)?;
    federation.interests.unsubscribe_object_class(source, class);
    context.success();
    Ok(())
}

/// The four interaction class calls share one handler
fn interaction_interest(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let (class, publish, enable) = match context.request().body {
        MessageBody::PublishInteractionClass { class } => (class, true, true),
        MessageBody::UnpublishInteractionClass { class } => (class, true, false),
        MessageBody::SubscribeInteractionClass { class } => (class, false, true),
        MessageBody::UnsubscribeInteractionClass { class } => (class, false, false),
        _ => return Err(mismatched(context)),
    };
    if !federation.model().has_interaction_class(&class) {
        return Err(RtiError::InteractionClassNotDefined {
            name: class.to_string(),
        });
    }

    let interests = &mut federation.interests;
    match (publish, enable) {
        (true, true) => interests.publish_interaction_class(source, class),
        (true, false) => {
            interests.unpublish_interaction_class(source, class);
        }
        (false, true) => interests.subscribe_interaction_class(source, class),
        (false, false) => {
            interests.unsubscribe_interaction_class(source, class);
        }
    }
    context.success();
    Ok(())
}
