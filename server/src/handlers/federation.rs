use log::debug;

use rti_shared::{
    FederateHandle, MessageBody, MessageContext, MessageSink, MessageType, ResignAction,
    RtiError, RtiMessage, SinkPlugin,
};

use crate::{
    federation::Federation,
    handlers::{checked, member, mismatched},
};

pub struct FederationPlugin;

impl SinkPlugin<Federation> for FederationPlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::ResignFederation, "resign", checked(resign));
    }
}

fn resign(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::ResignFederation { action } = context.request().body else {
        return Err(mismatched(context));
    };

    match action {
        ResignAction::NoAction => {
            let held = federation.repository.iter().find_map(|instance| {
                let owned = instance.all_owned_by(source);
                owned.first().map(|attribute| (instance.handle(), *attribute))
            });
            if let Some((object, attribute)) = held {
                return Err(RtiError::FederateOwnsAttributes { object, attribute });
            }
        }
        ResignAction::UnconditionallyDivestAttributes => divest_everything(federation, source),
        ResignAction::DeleteObjects => {
            delete_registered(federation, source);
            divest_everything(federation, source);
        }
        ResignAction::CancelThenDivest => {
            federation.ownership.remove_federate(source);
            divest_everything(federation, source);
        }
    }

    federation.resign_federate(source)?;
    context.success();
    Ok(())
}

/// Tells every LRC that the federate gave up all it owned
fn divest_everything(federation: &mut Federation, source: FederateHandle) {
    let released = federation.repository.release_all_owned_by(source);
    for (object, attributes) in released {
        debug!("Divesting {attributes:?} of {object} on behalf of resigning {source}");
        let message = RtiMessage::new(
            source,
            federation.handle(),
            MessageBody::AttributeDivest {
                object,
                attributes,
                unconditional: true,
                tag: Vec::new(),
            },
        );
        federation.broadcast_data(&message, None);
    }
}

fn delete_registered(federation: &mut Federation, source: FederateHandle) {
    for object in federation.repository.registered_by(source) {
        federation.repository.remove(&object);
        federation.ownership.remove_object(object);
        let message = RtiMessage::new(
            source,
            federation.handle(),
            MessageBody::DeleteObject {
                object,
                tag: Vec::new(),
            },
        );
        federation.broadcast_data(&message, None);
    }
}
