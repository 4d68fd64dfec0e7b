mod federate;
mod federation;
mod federation_manager;
mod outgoing;
mod save_restore;
mod sync_points;
mod time_manager;

pub use federate::{Federate, FederateMetrics};
pub use federation::Federation;
pub use federation_manager::FederationManager;
pub use save_restore::{Completion, SaveRestoreManager};
pub use sync_points::{SyncPoint, SyncPointManager};
pub use time_manager::{Grant, TimeManager};
