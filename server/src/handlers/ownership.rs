use std::collections::BTreeSet;

use log::{debug, trace};

use rti_shared::{
    AttributeHandle, MessageBody, MessageContext, MessageSink, MessageType, Outcome, ResponseBody,
    RtiError, RtiMessage, SinkPlugin,
};

use crate::{
    federation::Federation,
    handlers::{member, mismatched},
};

/// Mirrors every ownership exchange into the RTI's own bookkeeping. The
/// negotiation itself happens between the LRCs, except for if-available
/// acquisitions, which the RTI settles on its own.
pub struct OwnershipPlugin;

impl SinkPlugin<Federation> for OwnershipPlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::AttributeDivest, "divest", divest)
            .add_handler(MessageType::AttributeAcquire, "acquire", acquire)
            .add_handler(MessageType::AttributeRelease, "release", release)
            .add_handler(MessageType::OwnershipAcquired, "acquired", acquired)
            .add_handler(MessageType::CancelAcquire, "cancel-acquire", cancel_acquire)
            .add_handler(MessageType::CancelDivest, "cancel-divest", cancel_divest)
            .add_handler(
                MessageType::ConfirmAcquisitionCancellation,
                "confirm-cancel",
                |_: &mut Federation, _: &mut MessageContext| Outcome::Continue,
            )
            .add_handler(MessageType::AttributesUnavailable, "unavailable", unavailable);
    }
}

fn divest(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::AttributeDivest {
        object,
        attributes,
        unconditional,
        ..
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    let Some(instance) = federation.repository.get_mut(object) else {
        debug!("Dropping divest of unknown {object}");
        return Outcome::Veto;
    };

    let owned = instance.owned_by(attributes, source);
    if *unconditional {
        instance.set_owner(&owned, None);
        trace!("{source} dropped {owned:?} of {object}");
    } else {
        federation.ownership.request_divestiture(*object, &owned, source);
    }
    Outcome::Continue
}

fn acquire(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let MessageBody::AttributeAcquire {
        object,
        attributes,
        if_available,
        ..
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    if *if_available {
        return match acquire_if_available(federation, context) {
            Ok(()) => Outcome::Veto,
            Err(error) => Outcome::Error(error),
        };
    }

    let source = context.request().source;
    if !federation.repository.contains(object) {
        debug!("Dropping acquisition of unknown {object}");
        return Outcome::Veto;
    }
    federation.ownership.request_acquisition(*object, attributes, source);
    Outcome::Continue
}

/// Hands over whatever is unowned right now and answers with what the
/// requester got. Nothing is forwarded: the LRCs learn of the change from
/// the OwnershipAcquired announcement.
fn acquire_if_available(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::AttributeAcquire {
        object, attributes, ..
    } = &context.request().body
    else {
        return Err(mismatched(context));
    };
    let object = *object;
    let Some(instance) = federation.repository.get(&object) else {
        return Err(RtiError::ObjectNotKnown { object });
    };
    federation.model().validate_attributes(&instance.class(), attributes)?;

    let unowned: BTreeSet<AttributeHandle> = attributes
        .iter()
        .filter(|attribute| instance.is_unowned(attribute))
        .copied()
        .collect();
    federation
        .ownership
        .request_acquisition_if_available(object, &unowned, source);
    let obtained = federation.ownership.complete_acquisition_if_available(object, source);
    if let Some(instance) = federation.repository.get_mut(&object) {
        instance.set_owner(&obtained, Some(source));
    }
    debug!("{source} obtained {obtained:?} of {object} if available");

    if !obtained.is_empty() {
        let announcement = RtiMessage::new(
            source,
            federation.handle(),
            MessageBody::OwnershipAcquired {
                object,
                attributes: obtained.clone(),
                if_available: true,
            },
        );
        let origin = federation.federate(source).map(|federate| federate.connection());
        federation.broadcast_data(&announcement, origin);
    }

    context.success_with(ResponseBody::Attributes(obtained));
    Ok(())
}

fn release(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let MessageBody::AttributeRelease { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    let released = federation.ownership.release_attributes(*object, attributes);
    if let Some(instance) = federation.repository.get_mut(object) {
        for (attribute, recipient) in &released {
            instance.set_owner([attribute], Some(*recipient));
        }
    }
    federation.ownership.complete_divest(*object, attributes);
    Outcome::Continue
}

fn acquired(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::OwnershipAcquired {
        object,
        attributes,
        if_available,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    if *if_available {
        federation.ownership.complete_acquisition_if_available(*object, source);
    } else {
        federation.ownership.complete_acquisition(*object, source);
    }
    if let Some(instance) = federation.repository.get_mut(object) {
        instance.set_owner(attributes, Some(source));
    }
    Outcome::Continue
}

fn cancel_acquire(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let MessageBody::CancelAcquire { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    federation.ownership.cancel_acquisition(*object, attributes);
    Outcome::Continue
}

fn cancel_divest(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let MessageBody::CancelDivest { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    federation.ownership.cancel_divest(*object, attributes);
    Outcome::Continue
}

/// Clears whatever is left of a best-effort bid that came back empty
fn unavailable(federation: &mut Federation, context: &mut MessageContext) -> Outcome {
    let source = context.request().source;
    let MessageBody::AttributesUnavailable { object, .. } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    federation.ownership.complete_acquisition_if_available(*object, source);
    Outcome::Continue
}
