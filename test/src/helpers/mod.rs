pub mod assertions;
pub mod test_federate;
pub mod test_model;
pub mod test_rti;

pub use test_federate::TestFederate;
pub use test_model::{attributes, battle, Battle, BATTLE};
pub use test_rti::TestRti;
