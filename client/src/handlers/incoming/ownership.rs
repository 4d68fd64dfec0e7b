use std::collections::BTreeSet;

use log::{debug, trace};

use rti_shared::{
    AttributeHandle, MessageBody, MessageContext, MessageSink, MessageType, Outcome, SinkPlugin,
};

use crate::{
    callback::Callback,
    handlers::{from_self, hand_over, mismatched},
    state::LrcState,
};

/// The remote half of ownership negotiation. Every LRC applies the same
/// bookkeeping to the same messages, so all replicas of the ownership
/// manager settle on the same winners.
pub struct OwnershipPlugin;

impl SinkPlugin<LrcState> for OwnershipPlugin {
    fn build(&self, sink: &mut MessageSink<LrcState>) {
        sink.add_handler(MessageType::AttributeDivest, "divest", divest)
            .add_handler(MessageType::AttributeAcquire, "acquire", acquire)
            .add_handler(MessageType::AttributeRelease, "release", release)
            .add_handler(MessageType::OwnershipAcquired, "acquired", acquired)
            .add_handler(MessageType::CancelAcquire, "cancel-acquire", cancel_acquire)
            .add_handler(MessageType::CancelDivest, "cancel-divest", cancel_divest)
            .add_handler(
                MessageType::ConfirmAcquisitionCancellation,
                "confirm-cancel",
                confirm_cancel,
            )
            .add_handler(MessageType::AttributesUnavailable, "unavailable", unavailable);
    }
}

/// Records the offer and tells the federate about anything it could take
fn divest(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let source = context.request().source;
    let MessageBody::AttributeDivest {
        object,
        attributes,
        unconditional,
        tag,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    let local = state.federate;
    let Some(instance) = state.repository.get_mut(object) else {
        debug!("Divest of unknown {object} ignored");
        return Outcome::Veto;
    };

    let owned = instance.owned_by(attributes, source);
    if *unconditional {
        instance.set_owner(&owned, None);
    } else {
        state.ownership.request_divestiture(*object, &owned, source);
    }

    let offered: BTreeSet<AttributeHandle> = state
        .interests
        .publishable(local, instance.class(), &owned)
        .into_iter()
        .filter(|attribute| !instance.is_owned_by(attribute, local))
        .collect();
    if offered.is_empty() {
        return Outcome::Veto;
    }
    state.callback(Callback::OwnershipOffered {
        object: *object,
        attributes: offered,
        tag: tag.clone(),
    });
    Outcome::Continue
}

/// Records the bid. Attributes this federate is already divesting are
/// released at once; for the rest it is asked to release.
fn acquire(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let source = context.request().source;
    let MessageBody::AttributeAcquire {
        object,
        attributes,
        if_available,
        tag,
    } = &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    let object = *object;
    let local = state.federate;
    let Some(instance) = state.repository.get(&object) else {
        debug!("Acquisition of unknown {object} ignored");
        return Outcome::Veto;
    };
    let owned = instance.owned_by(attributes, local);

    // best-effort bids are settled by the RTI
    if *if_available {
        state
            .ownership
            .request_acquisition_if_available(object, attributes, source);
        return Outcome::Veto;
    }
    state.ownership.request_acquisition(object, attributes, source);
    if owned.is_empty() {
        return Outcome::Veto;
    }

    let divesting = state
        .ownership
        .attributes_offered_for_divest(object, &owned, local);
    let released = if divesting.is_empty() {
        BTreeSet::new()
    } else {
        hand_over(state, object, &divesting)
    };
    if !released.is_empty() {
        trace!("{local} releases {released:?} of {object} to a waiting bid");
        state.callback(Callback::DivestitureConfirmed {
            object,
            attributes: released.clone(),
        });
        let release = state.message(MessageBody::AttributeRelease {
            object,
            attributes: released.clone(),
        });
        state.send_later(release);
    }

    let still_owned: BTreeSet<AttributeHandle> = owned.difference(&released).copied().collect();
    if still_owned.is_empty() {
        return Outcome::Veto;
    }
    state.callback(Callback::ReleaseRequested {
        object,
        attributes: still_owned,
        tag: tag.clone(),
    });
    Outcome::Continue
}

/// Moves released attributes to their new owners. When this federate is
/// one of them it confirms the acquisition to everybody else.
fn release(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let MessageBody::AttributeRelease { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    let object = *object;
    let local = state.federate;

    let recipients = state.ownership.release_attributes(object, attributes);
    if let Some(instance) = state.repository.get_mut(&object) {
        for (attribute, recipient) in &recipients {
            instance.set_owner([attribute], Some(*recipient));
        }
    }
    state.ownership.complete_divest(object, attributes);

    if !recipients.values().any(|recipient| *recipient == local) {
        return Outcome::Continue;
    }
    let obtained = state.ownership.complete_acquisition(object, local);
    if obtained.is_empty() {
        return Outcome::Continue;
    }
    let announcement = state.message(MessageBody::OwnershipAcquired {
        object,
        attributes: obtained.clone(),
        if_available: false,
    });
    state.send_later(announcement);
    state.callback(Callback::OwnershipAcquired {
        object,
        attributes: obtained,
    });
    Outcome::Continue
}

fn acquired(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
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
        state.ownership.complete_acquisition_if_available(*object, source);
    } else {
        state.ownership.complete_acquisition(*object, source);
    }
    if let Some(instance) = state.repository.get_mut(object) {
        instance.set_owner(attributes, Some(source));
    }
    Outcome::Continue
}

/// Forgets the bid. Whoever owns any of the attributes confirms the
/// cancellation back to the bidder.
fn cancel_acquire(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let source = context.request().source;
    let MessageBody::CancelAcquire { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    let object = *object;
    state.ownership.cancel_acquisition(object, attributes);

    let owned = match state.repository.get(&object) {
        Some(instance) => instance.owned_by(attributes, state.federate),
        None => BTreeSet::new(),
    };
    if owned.is_empty() {
        return Outcome::Continue;
    }
    let confirmation = state
        .message(MessageBody::ConfirmAcquisitionCancellation {
            object,
            attributes: owned,
        })
        .with_target(source);
    state.send_later(confirmation);
    Outcome::Continue
}

fn cancel_divest(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let MessageBody::CancelDivest { object, attributes } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.ownership.cancel_divest(*object, attributes);
    Outcome::Continue
}

fn confirm_cancel(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if !context.request().is_for(state.federate) {
        return Outcome::Veto;
    }
    let MessageBody::ConfirmAcquisitionCancellation { object, attributes } =
        &context.request().body
    else {
        return Outcome::Error(mismatched(context));
    };
    state.callback(Callback::AcquisitionCancellationConfirmed {
        object: *object,
        attributes: attributes.clone(),
    });
    Outcome::Continue
}

fn unavailable(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if from_self(state, context) {
        return Outcome::Veto;
    }
    let source = context.request().source;
    let MessageBody::AttributesUnavailable { object, .. } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state
        .ownership
        .complete_acquisition_if_available(*object, source);
    Outcome::Continue
}
