//! Scanner layer
//!
//! - `ScanEngine`: staleness filter, detection, signal tracking and alerting for one batch
//! - `Runner`: peak-aware polling loop and manual bursts
//! - `PeakSchedule`: per-sport peak windows

pub mod engine;
pub mod runner;
pub mod schedule;

pub use engine::{EventScan, ScanEngine, ScanStats};
pub use runner::{BurstReport, Runner};
pub use schedule::{PeakSchedule, PeakWindow};
