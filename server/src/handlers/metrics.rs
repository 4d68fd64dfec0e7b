use rti_shared::{
    FederateHandle, MessageBody, MessageContext, MessageSink, MessageType, Outcome, Response,
    ResponseBody, SinkPlugin,
};

use crate::federation::Federation;

/// Runs last in each chain it joins, so only messages that got through are
/// counted
pub struct MetricsPlugin;

impl SinkPlugin<Federation> for MetricsPlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::UpdateAttributes, "metrics", count_update)
            .add_handler(MessageType::SendInteraction, "metrics", count_interaction)
            .add_handler(MessageType::RegisterObject, "metrics", count_registration)
            .add_handler(MessageType::OwnershipAcquired, "metrics", count_acquisition);
    }
}

fn count_update(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::UpdateAttributes { object, .. } = context.request().body else {
        return Outcome::Continue;
    };
    let Some(class) = federation.repository.get(&object).map(|instance| instance.class()) else {
        return Outcome::Continue;
    };

    let reflectors: Vec<FederateHandle> = federation
        .interests
        .subscribers_of(class)
        .into_iter()
        .filter(|federate| *federate != source)
        .collect();
    if let Some(federate) = federation.federate_mut(source) {
        federate.metrics.updates_sent += 1;
        federate.metrics.objects_updated.insert(object);
    }
    for handle in reflectors {
        if let Some(federate) = federation.federate_mut(handle) {
            federate.metrics.reflections_received += 1;
            federate.metrics.objects_reflected.insert(object);
        }
    }
    Outcome::Continue
}

fn count_interaction(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::SendInteraction { class, .. } = context.request().body else {
        return Outcome::Continue;
    };

    let receivers: Vec<FederateHandle> = federation
        .federate_handles()
        .into_iter()
        .filter(|federate| {
            *federate != source && federation.interests.is_interaction_class_subscribed(*federate, class)
        })
        .collect();
    if let Some(federate) = federation.federate_mut(source) {
        federate.metrics.interactions_sent += 1;
    }
    for handle in receivers {
        if let Some(federate) = federation.federate_mut(handle) {
            federate.metrics.interactions_received += 1;
        }
    }
    Outcome::Continue
}

fn count_registration(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let Some(Response::Success(ResponseBody::Object(object))) = context.response() else {
        return Outcome::Continue;
    };
    let object = *object;
    if let Some(federate) = federation.federate_mut(source) {
        federate.metrics.objects_registered += 1;
        federate.metrics.objects_owned.insert(object);
    }
    Outcome::Continue
}

fn count_acquisition(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::OwnershipAcquired { object, .. } = context.request().body else {
        return Outcome::Continue;
    };
    if let Some(federate) = federation.federate_mut(source) {
        federate.metrics.objects_owned.insert(object);
    }
    Outcome::Continue
}
