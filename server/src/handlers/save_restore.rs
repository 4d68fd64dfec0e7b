use log::info;

use rti_shared::{
    ByteReader, MessageBody, MessageContext, MessageSink, MessageType, RtiError,
    RtiMessage, SaveRestoreTarget, SinkPlugin,
};

use crate::{
    federation::Federation,
    handlers::{checked, member, mismatched},
};

pub struct SaveRestorePlugin;

impl SinkPlugin<Federation> for SaveRestorePlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::RequestSave, "request-save", checked(request_save))
            .add_handler(MessageType::SaveComplete, "save-complete", checked(save_complete))
            .add_handler(MessageType::RequestRestore, "request-restore", checked(request_restore))
            .add_handler(MessageType::RestoreComplete, "restore-complete", checked(restore_complete));
    }
}

/// Captures the RTI's own share of the federation state under the label,
/// then asks every federate to save theirs
fn request_save(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    member(federation, context)?;
    let MessageBody::RequestSave { label } = &context.request().body else {
        return Err(mismatched(context));
    };
    let label = label.clone();

    let snapshot = federation.snapshot();
    let joined = federation.federate_handles();
    federation.save_restore.begin_save(&label, &joined, snapshot)?;

    info!("Federation {}: save \"{label}\" initiated", federation.name());
    federation.queue_control_message(RtiMessage::from_rti(
        federation.handle(),
        MessageBody::InitiateSave { label },
    ));
    context.success();
    Ok(())
}

fn save_complete(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::SaveComplete { success } = context.request().body else {
        return Err(mismatched(context));
    };
    if let Some(completion) = federation.save_restore.save_complete(source, success)? {
        info!(
            "Federation {}: save \"{}\" finished, success: {}",
            federation.name(),
            completion.label,
            completion.success
        );
        federation.queue_control_message(RtiMessage::from_rti(
            federation.handle(),
            MessageBody::FederationSaved {
                label: completion.label,
                success: completion.success,
            },
        ));
    }
    context.success();
    Ok(())
}

/// Rolls the RTI's own state back right away; federates follow once they
/// see InitiateRestore
fn request_restore(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    member(federation, context)?;
    let MessageBody::RequestRestore { label } = &context.request().body else {
        return Err(mismatched(context));
    };
    let label = label.clone();

    let joined = federation.federate_handles();
    let snapshot = federation.save_restore.begin_restore(&label, &joined)?;
    if let Err(error) = federation.restore_from(&mut ByteReader::new(&snapshot)) {
        federation.save_restore.restore_abandoned();
        return Err(RtiError::internal(format!(
            "snapshot \"{label}\" could not be read: {error}"
        )));
    }

    info!("Federation {}: restore \"{label}\" initiated", federation.name());
    federation.queue_control_message(RtiMessage::from_rti(
        federation.handle(),
        MessageBody::InitiateRestore { label },
    ));
    context.success();
    Ok(())
}

fn restore_complete(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::RestoreComplete { success } = context.request().body else {
        return Err(mismatched(context));
    };
    if let Some(completion) = federation.save_restore.restore_complete(source, success)? {
        info!(
            "Federation {}: restore \"{}\" finished, success: {}",
            federation.name(),
            completion.label,
            completion.success
        );
        federation.queue_control_message(RtiMessage::from_rti(
            federation.handle(),
            MessageBody::FederationRestored {
                label: completion.label,
                success: completion.success,
            },
        ));
    }
    context.success();
    Ok(())
}
