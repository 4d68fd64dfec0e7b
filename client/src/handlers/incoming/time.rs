use log::trace;

use rti_shared::{MessageBody, MessageContext, MessageSink, MessageType, Outcome, SinkPlugin};

use crate::{callback::Callback, handlers::mismatched, state::LrcState};

pub struct TimePlugin;

impl SinkPlugin<LrcState> for TimePlugin {
    fn build(&self, sink: &mut MessageSink<LrcState>) {
        sink.add_handler(MessageType::TimeAdvanceGrant, "grant", grant);
    }
}

/// The ambassador delivers every TSO message up to the granted time before
/// this runs
fn grant(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if !context.request().is_for(state.federate) {
        return Outcome::Veto;
    }
    let MessageBody::TimeAdvanceGrant { time } = context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    trace!("{} granted {}", state.federate, time);
    state.time.advance_grant_callback_processed(time);
    state.callback(Callback::TimeAdvanceGrant { time });
    Outcome::Continue
}
