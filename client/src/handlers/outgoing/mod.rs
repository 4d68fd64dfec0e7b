use rti_shared::{MessageContext, MessageSink, MessageType, RtiError};

use crate::{handlers::checked, state::LrcState};

mod objects;
mod ownership;

use objects::ObjectPlugin;
use ownership::OwnershipPlugin;

pub(crate) use ownership::check_acquirable;

pub(super) fn register(sink: &mut MessageSink<LrcState>) {
    for message_type in [
        MessageType::UpdateAttributes,
        MessageType::DeleteObject,
        MessageType::SendInteraction,
    ] {
        sink.add_handler(message_type, "timestamp", checked(timestamp));
    }
    sink.add_plugin(ObjectPlugin).add_plugin(OwnershipPlugin);
}

/// A time-stamped send needs regulation and may not reach below the
/// federate's current time plus its lookahead
fn timestamp(state: &mut LrcState, context: &mut MessageContext) -> Result<(), RtiError> {
    let Some(time) = context.request().timestamp else {
        return Ok(());
    };
    if !state.time.is_regulating() {
        return Err(RtiError::InvalidFederationTime {
            time,
            reason: "time-stamped sends require time regulation".to_string(),
        });
    }
    let earliest = state.time.current_time + state.time.lookahead;
    if time.is_nan() || time < earliest {
        return Err(RtiError::InvalidFederationTime {
            time,
            reason: format!("the earliest time this federate may send is {earliest}"),
        });
    }
    Ok(())
}
