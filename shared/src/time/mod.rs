mod time_config;
mod time_status;

pub use time_config::{validate_start_time, TimeConfig};
pub use time_status::{AdvanceKind, AdvanceState, TimeStatus, TriState};
