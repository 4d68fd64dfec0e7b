use rti_shared::MessageSink;

use crate::state::LrcState;

mod federation;
mod objects;
mod ownership;
mod time;

use federation::FederationPlugin;
use objects::ObjectPlugin;
use ownership::OwnershipPlugin;
use time::TimePlugin;

pub(super) fn register(sink: &mut MessageSink<LrcState>) {
    sink.add_plugin(FederationPlugin)
        .add_plugin(ObjectPlugin)
        .add_plugin(OwnershipPlugin)
        .add_plugin(TimePlugin);
}
