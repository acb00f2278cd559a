//! Screen orchestration.
//!
//! The [`ScreenController`] exclusively owns which screen is visible and runs
//! at most one animated transition at a time. Requests that arrive while a
//! transition is in flight are rejected, not queued.

mod controller;
mod types;

pub use controller::ScreenController;
pub use types::{Navigator, Screen, ScreenError, ScreenRegistry};
