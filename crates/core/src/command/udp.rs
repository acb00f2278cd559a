//! UDP command ingestion.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::queue::CommandSender;

/// Largest UDP payload; a read buffer this size never truncates.
const MAX_DATAGRAM_SIZE: usize = 65_536;

/// How often the receive thread checks for a stop request.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send UDP command: {0}")]
    Send(#[source] std::io::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to start receiver thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// Background thread that reads UTF-8 datagrams and hands them to the
/// control loop through a [`CommandSender`].
pub struct UdpCommandReceiver {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl UdpCommandReceiver {
    /// Bind `addr` and start the receive thread.
    pub fn spawn(addr: SocketAddr, sender: CommandSender<String>) -> Result<Self, CommandError> {
        let socket = UdpSocket::bind(addr).map_err(|source| CommandError::Bind { addr, source })?;
        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|source| CommandError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| CommandError::Bind { addr, source })?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("udp-command-receiver".to_string())
            .spawn(move || receive_loop(socket, sender, thread_running))
            .map_err(CommandError::Thread)?;

        info!(local_addr = %local_addr, "UDP command receiver started");

        Ok(Self {
            local_addr,
            running,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the receive thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("UDP command receiver thread panicked");
            }
            info!("UDP command receiver stopped");
        }
    }
}

impl Drop for UdpCommandReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: UdpSocket, sender: CommandSender<String>, running: Arc<AtomicBool>) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buffer) {
            Ok((len, from)) => {
                let text = String::from_utf8_lossy(&buffer[..len]).into_owned();
                trace!(from = %from, len, "Command datagram received");
                sender.enqueue(text);
                if sender.is_closed() {
                    debug!("Command queue closed, stopping receiver");
                    break;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => {
                warn!("UDP receive error: {}", e);
            }
        }
    }

    running.store(false, Ordering::Release);
}

/// Sends text commands to a kiosk.
pub struct UdpCommandSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpCommandSender {
    pub fn new(target: impl ToSocketAddrs) -> Result<Self, CommandError> {
        let target = target
            .to_socket_addrs()
            .map_err(|e| CommandError::InvalidAddress(e.to_string()))?
            .next()
            .ok_or_else(|| CommandError::InvalidAddress("no address resolved".to_string()))?;

        let bind: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind).map_err(|source| CommandError::Bind { addr: bind, source })?;

        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&self, command: &str) -> Result<(), CommandError> {
        self.socket
            .send_to(command.as_bytes(), self.target)
            .map_err(CommandError::Send)?;
        debug!(target = %self.target, command, "Command sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::command::command_channel;

    fn wait_for<T>(mut f: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(value) = f() {
                return Some(value);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn test_datagram_reaches_queue() {
        let (tx, mut queue) = command_channel();
        let receiver = UdpCommandReceiver::spawn("127.0.0.1:0".parse().unwrap(), tx).unwrap();

        let sender = UdpCommandSender::new(receiver.local_addr()).unwrap();
        sender.send("instructions").unwrap();

        let received = wait_for(|| queue.dequeue());
        assert_eq!(received.as_deref(), Some("instructions"));
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let (tx, mut queue) = command_channel();
        let receiver = UdpCommandReceiver::spawn("127.0.0.1:0".parse().unwrap(), tx).unwrap();

        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(&[0x66, 0xff, 0x6f], receiver.local_addr()).unwrap();

        let received = wait_for(|| queue.dequeue()).unwrap();
        assert_eq!(received, "f\u{fffd}o");
    }

    #[test]
    fn test_long_datagram_is_not_truncated() {
        let (tx, mut queue) = command_channel();
        let receiver = UdpCommandReceiver::spawn("127.0.0.1:0".parse().unwrap(), tx).unwrap();

        let command = "x".repeat(4000);
        let sender = UdpCommandSender::new(receiver.local_addr()).unwrap();
        sender.send(&command).unwrap();

        let received = wait_for(|| queue.dequeue()).unwrap();
        assert_eq!(received.len(), 4000);
        assert_eq!(received, command);
    }

    #[test]
    fn test_stop_joins_thread() {
        let (tx, _queue) = command_channel();
        let mut receiver = UdpCommandReceiver::spawn("127.0.0.1:0".parse().unwrap(), tx).unwrap();
        assert!(receiver.is_running());

        receiver.stop();
        assert!(!receiver.is_running());
        receiver.stop();
    }

    #[test]
    fn test_bind_conflict_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let (tx, _queue) = command_channel();

        let result = UdpCommandReceiver::spawn(taken.local_addr().unwrap(), tx);
        assert!(matches!(result, Err(CommandError::Bind { .. })));
    }
}
