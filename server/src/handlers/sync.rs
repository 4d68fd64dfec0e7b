use log::debug;

use rti_shared::{MessageBody, MessageContext, MessageSink, MessageType, RtiError, RtiMessage, SinkPlugin};

use crate::{
    federation::Federation,
    handlers::{checked, member, mismatched},
};

pub struct SyncPlugin;

impl SinkPlugin<Federation> for SyncPlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::RegisterSyncPoint, "register-sync", checked(register_sync_point))
            .add_handler(MessageType::SyncPointAchieved, "achieve-sync", checked(sync_point_achieved));
    }
}

fn register_sync_point(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::RegisterSyncPoint {
        label,
        tag,
        federates,
    } = &context.request().body
    else {
        return Err(mismatched(context));
    };
    let joined = federation.federate_handles();
    let participants = federation
        .sync_points
        .register(label, tag.clone(), source, federates, &joined)?;
    debug!("Sync point \"{label}\" announced to {participants:?}");

    for federate in participants {
        federation.queue_unicast(
            RtiMessage::from_rti(
                federation.handle(),
                MessageBody::AnnounceSyncPoint {
                    label: label.clone(),
                    tag: tag.clone(),
                },
            )
            .with_target(federate),
        );
    }
    context.success();
    Ok(())
}

fn sync_point_achieved(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::SyncPointAchieved { label } = &context.request().body else {
        return Err(mismatched(context));
    };
    let label = label.clone();
    if let Some(participants) = federation.sync_points.achieve(&label, source)? {
        debug!("Federation synchronized on \"{label}\"");
        federation.announce_synchronized(&label, &participants);
    }
    context.success();
    Ok(())
}
