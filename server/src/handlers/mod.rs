mod declarations;
mod federation;
mod metrics;
mod objects;
mod ownership;
mod save_restore;
mod sync;
mod time;

use rti_shared::{FederateHandle, MessageContext, MessageSink, Outcome, RtiError};

use crate::federation::Federation;

use declarations::DeclarationPlugin;
use federation::FederationPlugin;
use metrics::MetricsPlugin;
use objects::ObjectPlugin;
use ownership::OwnershipPlugin;
use save_restore::SaveRestorePlugin;
use sync::SyncPlugin;
use time::TimePlugin;

/// The handler table every federation on this RTI runs messages through
pub fn build_federation_sink() -> MessageSink<Federation> {
    let mut sink = MessageSink::builder("rti");
    sink.add_plugin(FederationPlugin)
        .add_plugin(DeclarationPlugin)
        .add_plugin(ObjectPlugin)
        .add_plugin(OwnershipPlugin)
        .add_plugin(TimePlugin)
        .add_plugin(SyncPlugin)
        .add_plugin(SaveRestorePlugin)
        .add_plugin(MetricsPlugin);
    sink.lock();
    sink
}

type RequestHandler = fn(&mut Federation, &mut MessageContext) -> Result<(), RtiError>;

/// Adapts a handler that reports failure through `Result`
pub(crate) fn checked(
    handler: RequestHandler,
) -> impl Fn(&mut Federation, &mut MessageContext) -> Outcome + Send + Sync {
    move |federation, context| Outcome::from(handler(federation, context))
}

/// The joined federate that sent the request being processed
pub(crate) fn member(federation: &Federation, context: &MessageContext) -> Result<FederateHandle, RtiError> {
    let source = context.request().source;
    federation.check_member(source)?;
    Ok(source)
}

pub(crate) fn mismatched(context: &MessageContext) -> RtiError {
    RtiError::internal(format!(
        "handler received unexpected {:?}",
        context.request().message_type()
    ))
}
