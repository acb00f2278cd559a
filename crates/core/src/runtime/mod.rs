//! Kiosk control loop.

mod config;
mod control_loop;

pub use config::RuntimeConfig;
pub use control_loop::{HoursRule, KioskRuntime, RuntimeState};
