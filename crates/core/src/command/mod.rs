//! External command ingestion.
//!
//! A dedicated thread receives UDP datagrams and enqueues their text; the
//! control loop drains the queue on each tick, keeping only the newest
//! command.

mod queue;
mod udp;

pub use queue::{command_channel, CommandQueue, CommandSender};
pub use udp::{CommandError, UdpCommandReceiver, UdpCommandSender};

/// Normalize a raw datagram into a command token.
///
/// Returns `None` for blank payloads.
pub fn parse_token(raw: &str) -> Option<&str> {
    let token = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
