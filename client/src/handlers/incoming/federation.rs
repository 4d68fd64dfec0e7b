use log::{info, warn};

use rti_shared::{MessageBody, MessageContext, MessageSink, MessageType, Outcome, SinkPlugin};

use crate::{callback::Callback, handlers::mismatched, state::LrcState};

/// Membership, synchronization and save/restore announcements
pub struct FederationPlugin;

impl SinkPlugin<LrcState> for FederationPlugin {
    fn build(&self, sink: &mut MessageSink<LrcState>) {
        sink.add_handler(MessageType::FederateJoined, "joined", joined)
            .add_handler(MessageType::FederateResigned, "resigned", resigned)
            .add_handler(MessageType::AnnounceSyncPoint, "announce", announce)
            .add_handler(MessageType::FederationSynchronized, "synchronized", synchronized)
            .add_handler(MessageType::InitiateSave, "initiate-save", initiate_save)
            .add_handler(MessageType::FederationSaved, "saved", saved)
            .add_handler(MessageType::InitiateRestore, "initiate-restore", initiate_restore)
            .add_handler(MessageType::FederationRestored, "restored", restored);
    }
}

fn joined(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::FederateJoined { federate, name } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.callback(Callback::FederateJoined {
        federate: *federate,
        name: name.clone(),
    });
    Outcome::Continue
}

/// Whatever the departed federate was negotiating is void now
fn resigned(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::FederateResigned { federate, name } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.ownership.remove_federate(*federate);
    state.interests.remove_federate(*federate);
    state.callback(Callback::FederateResigned {
        federate: *federate,
        name: name.clone(),
    });
    Outcome::Continue
}

// Synchronization

fn announce(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if !context.request().is_for(state.federate) {
        return Outcome::Veto;
    }
    let MessageBody::AnnounceSyncPoint { label, tag } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.callback(Callback::AnnounceSyncPoint {
        label: label.clone(),
        tag: tag.clone(),
    });
    Outcome::Continue
}

fn synchronized(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    if !context.request().is_for(state.federate) {
        return Outcome::Veto;
    }
    let MessageBody::FederationSynchronized { label } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.callback(Callback::FederationSynchronized {
        label: label.clone(),
    });
    Outcome::Continue
}

// Save and restore

fn initiate_save(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::InitiateSave { label } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.save_in_progress = true;
    state.store_snapshot(label);
    state.callback(Callback::InitiateSave {
        label: label.clone(),
    });
    Outcome::Continue
}

fn saved(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::FederationSaved { label, success } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.save_in_progress = false;
    info!("Federation save \"{label}\" finished, success: {success}");
    state.callback(Callback::FederationSaved {
        label: label.clone(),
        success: *success,
    });
    Outcome::Continue
}

fn initiate_restore(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::InitiateRestore { label } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.restore_in_progress = true;
    let dropped = state.queue.clear_tso();
    if dropped > 0 {
        warn!("Restore of \"{label}\" discards {dropped} queued TSO messages");
    }
    state.load_snapshot(label);
    state.callback(Callback::InitiateRestore {
        label: label.clone(),
    });
    Outcome::Continue
}

fn restored(state: &mut LrcState, context: &mut MessageContext) -> Outcome {
    let MessageBody::FederationRestored { label, success } = &context.request().body else {
        return Outcome::Error(mismatched(context));
    };
    state.restore_in_progress = false;
    state.callback(Callback::FederationRestored {
        label: label.clone(),
        success: *success,
    });
    Outcome::Continue
}
