use std::collections::BTreeSet;

use rti_shared::{
    AttributeHandle, MessageContext, MessageSink, ObjectHandle, Outcome, RtiError,
};

use crate::state::LrcState;

mod incoming;
mod outgoing;

pub(crate) use outgoing::check_acquirable;

/// Chain for everything that arrives from the RTI
pub fn build_incoming_sink() -> MessageSink<LrcState> {
    let mut sink = MessageSink::builder("lrc-incoming");
    incoming::register(&mut sink);
    sink.lock();
    sink
}

/// Chain every data message runs through before it is sent. Rejects what
/// the federate may not send and keeps the local books in step.
pub fn build_outgoing_sink() -> MessageSink<LrcState> {
    let mut sink = MessageSink::builder("lrc-outgoing");
    outgoing::register(&mut sink);
    sink.lock();
    sink
}

type StateHandler = fn(&mut LrcState, &mut MessageContext) -> Result<(), RtiError>;

pub(crate) fn checked(
    handler: StateHandler,
) -> impl Fn(&mut LrcState, &mut MessageContext) -> Outcome + Send + Sync {
    move |state, context| Outcome::from(handler(state, context))
}

/// Echoes of this federate's own traffic carry nothing new
pub(crate) fn from_self(state: &LrcState, context: &MessageContext) -> bool {
    context.request().source == state.federate
}

pub(crate) fn mismatched(context: &MessageContext) -> RtiError {
    RtiError::internal(format!(
        "handler registered for the wrong message type: {:?}",
        context.request().message_type()
    ))
}

/// Gives released attributes to whoever asked for them and closes this
/// federate's divestiture of them. Returns what actually changed hands.
pub(crate) fn hand_over(
    state: &mut LrcState,
    object: ObjectHandle,
    attributes: &BTreeSet<AttributeHandle>,
) -> BTreeSet<AttributeHandle> {
    let recipients = state.ownership.release_attributes(object, attributes);
    if let Some(instance) = state.repository.get_mut(&object) {
        for (attribute, recipient) in &recipients {
            instance.set_owner([attribute], Some(*recipient));
        }
    }
    let released: BTreeSet<AttributeHandle> = recipients.into_keys().collect();
    state.ownership.complete_divest(object, &released);
    released
}
