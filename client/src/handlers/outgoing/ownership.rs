use std::collections::BTreeSet;

use log::trace;

use rti_shared::{
    AttributeHandle, MessageBody, MessageContext, MessageSink, MessageType, ObjectHandle, Outcome,
    RtiError, SinkPlugin,
};

use crate::{
    callback::Callback,
    handlers::{checked, hand_over, mismatched},
    state::LrcState,
};

/// The local half of ownership negotiation: what this federate may ask
/// for or give up, and the bookkeeping of having asked
pub struct OwnershipPlugin;

impl SinkPlugin<LrcState> for OwnershipPlugin {
    fn build(&self, sink: &mut MessageSink<LrcState>) {
        sink.add_handler(MessageType::AttributeDivest, "divest", divest)
            .add_handler(MessageType::AttributeAcquire, "acquire", checked(acquire))
            .add_handler(MessageType::AttributeRelease, "release", release)
            .add_handler(MessageType::CancelAcquire, "cancel-acquire", checked(cancel_acquire))
            .add_handler(MessageType::CancelDivest, "cancel-divest", checked(cancel_divest))
            .add_handler(
                MessageType::AttributesUnavailable,
                "unavailable",
                checked(unavailable),
            );
    }
}

fn check_owned(
    state: &LrcState,
    object: ObjectHandle,
    attributes: &BTreeSet<AttributeHandle>,
) -> Result<(), RtiError> {
    let instance = state.object(object)?;
    state.model.validate_attributes(&instance.class(), attributes)?;
    match attributes
        .iter()
        .find(|attribute| !instance.is_owned_by(attribute, state.federate))
    {
        Some(attribute) => Err(RtiError::AttributeNotOwned {
            object,
            attribute: *attribute,
        }),
        None => Ok(()),
    }
}

/// Fails unless this federate publishes every attribute and owns none of
/// them yet
pub(crate) fn check_acquirable(
    state: &LrcState,
    object: ObjectHandle,
    attributes: &BTreeSet<AttributeHandle>,
) -> Result<(), RtiError> {
    let instance = state.object(object)?;
    let class = instance.class();
    state.model.validate_attributes(&class, attributes)?;

    let publishable = state.interests.publishable(state.federate, class, attributes);
    if let Some(attribute) = attributes.difference(&publishable).next() {
        return Err(RtiError::AttributeNotPublished {
            attribute: *attribute,
        });
    }
    if let Some(attribute) = instance.owned_by(attributes, state.federate).first() {
        return Err(RtiError::FederateOwnsAttributes {
            object,
            attribute: *attribute,
        });
    }
    Ok(())
}

/// Attributes with a firm bid waiting go straight to the bidder; only the
/// rest is divested. With nothing left the divest itself is not sent.
fn divest(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::AttributeDivest {
        object,
        attributes,
        unconditional,
        tag,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    let object = *object;
    let unconditional = *unconditional;
    let tag = tag.clone();
    let attributes = attributes.clone();
    let local = state.federate;
    if let Err(error) = check_owned(state, object, &attributes) {
        return Outcome::Error(error);
    }
    if !unconditional {
        if let Some(attribute) = attributes
            .iter()
            .find(|attribute| state.ownership.is_attribute_under_divest_request(object, attribute))
        {
            return Outcome::Error(RtiError::AttributeAlreadyBeingDivested {
                object,
                attribute: *attribute,
            });
        }
    }

    let remaining = release_to_bidders(state, object, &attributes);
    if remaining.is_empty() {
        return Outcome::Veto;
    }
    if unconditional {
        state.ownership.complete_divest(object, &remaining);
        if let Some(instance) = state.repository.get_mut(&object) {
            instance.set_owner(&remaining, None);
        }
        trace!("{local} dropped {remaining:?} of {object}");
    } else {
        state.ownership.request_divestiture(object, &remaining, local);
    }
    context.request_mut().body = MessageBody::AttributeDivest {
        object,
        attributes: remaining,
        unconditional,
        tag,
    };
    Outcome::Continue
}

/// Releases the attributes some federate already holds a firm request on
/// and queues the matching release. Returns what is left to divest.
fn release_to_bidders(
    state: &mut LrcState,
    object: ObjectHandle,
    attributes: &BTreeSet<AttributeHandle>,
) -> BTreeSet<AttributeHandle> {
    let wanted: BTreeSet<AttributeHandle> = state
        .ownership
        .attributes_under_acquisition_request(object, attributes)
        .into_keys()
        .collect();
    if wanted.is_empty() {
        return attributes.clone();
    }
    let released = hand_over(state, object, &wanted);
    trace!("{} releases {released:?} of {object} to waiting bids", state.federate);
    state.callback(Callback::DivestitureConfirmed {
        object,
        attributes: released.clone(),
    });
    let release = state.message(MessageBody::AttributeRelease {
        object,
        attributes: released.clone(),
    });
    state.send_later(release);
    attributes.difference(&released).copied().collect()
}

fn acquire(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::AttributeAcquire {
        object,
        attributes,
        if_available,
        ..
    } = &context.request().body
    else {
        return Err(mismatched(context));
    };
    if *if_available {
        return Err(RtiError::internal(
            "best-effort acquisitions are requests, not data",
        ));
    }
    check_acquirable(state, *object, attributes)?;
    let local = state.federate;
    state.ownership.request_acquisition(*object, attributes, local);
    Ok(())
}

/// Hands over whatever has a bidder waiting. The message is rewritten to
/// carry only those attributes; with no bidder it is not sent at all.
fn release(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::AttributeRelease { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    let object = *object;
    if let Err(error) = check_owned(state, object, attributes) {
        return Outcome::Error(error);
    }
    let attributes = attributes.clone();
    let released = hand_over(state, object, &attributes);
    if released.is_empty() {
        return Outcome::Veto;
    }

    state.callback(Callback::DivestitureConfirmed {
        object,
        attributes: released.clone(),
    });
    context.request_mut().body = MessageBody::AttributeRelease {
        object,
        attributes: released,
    };
    Outcome::Continue
}

fn cancel_acquire(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::CancelAcquire { object, attributes } = &context.request().body else {
        return Err(mismatched(context));
    };
    let object = *object;
    state.object(object)?;
    let requested = state
        .ownership
        .all_attributes_requested_by(object, state.federate);
    if let Some(attribute) = attributes.difference(&requested).next() {
        return Err(RtiError::AttributeAcquisitionWasNotRequested {
            object,
            attribute: *attribute,
        });
    }
    state.ownership.cancel_acquisition(object, attributes);
    Ok(())
}

fn cancel_divest(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::CancelDivest { object, attributes } = &context.request().body else {
        return Err(mismatched(context));
    };
    let object = *object;
    state.object(object)?;
    let offered = state
        .ownership
        .attributes_offered_for_divest(object, attributes, state.federate);
    if let Some(attribute) = attributes.difference(&offered).next() {
        return Err(RtiError::AttributeDivestitureWasNotRequested {
            object,
            attribute: *attribute,
        });
    }
    state.ownership.cancel_divest(object, attributes);
    Ok(())
}

fn unavailable(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let MessageBody::AttributesUnavailable { object, .. } = &context.request().body else {
        return Err(mismatched(context));
    };
    let local = state.federate;
    state.ownership.complete_acquisition_if_available(*object, local);
    Ok(())
}
