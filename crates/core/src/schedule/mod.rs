//! Time-of-day rules.

mod hours;

pub use hours::{OperatingHours, OperatingHoursConfig};
