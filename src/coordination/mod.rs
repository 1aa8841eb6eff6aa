//! Coordination layer
//!
//! - Cooperative stop flag shared by the polling loop and manual bursts

pub mod shutdown;

pub use shutdown::{StopFlag, StopReason};
