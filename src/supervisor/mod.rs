//! Supervisor layer
//!
//! - Alert manager: alert formatting, per-event cooldown and delivery

pub mod alert_manager;

pub use alert_manager::AlertManager;
