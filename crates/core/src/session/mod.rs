//! Session log and transient handoff state.
//!
//! Kiosk components report discrete events through a [`SessionLogHandle`];
//! a background [`SessionLogWriter`] hands them to the external log
//! collaborator as `(message, level, tags, data)` entries.

mod events;
mod handle;
mod store;
mod writer;

pub use events::*;
pub use handle::*;
pub use store::*;
pub use writer::*;
