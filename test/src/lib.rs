//! # RTI Test
//! Helpers for driving a live RTI and its LRCs from integration tests.

pub mod helpers;

pub use helpers::*;
