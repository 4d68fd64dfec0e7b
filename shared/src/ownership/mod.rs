mod acquire_request;
mod divest_request;
mod ownership_manager;

pub use acquire_request::{AcquireRequest, AcquireStatus};
pub use divest_request::DivestRequest;
pub use ownership_manager::OwnershipManager;
