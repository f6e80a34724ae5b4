//! UDP transport layer for Ether I/O communication.
//!
//! This module provides the [`UdpTransport`] struct which owns the datagram
//! socket used to talk to one board. The transport layer only knows about
//! sockets and bytes; command framing and retries live above it.
//!
//! # Design
//!
//! - **Protocol agnostic** - Handles only byte transmission
//! - **Synchronous** - Non-blocking send, receive bounded by a timeout
//! - **Simple** - One socket, one remote address, no connection pooling
//!
//! The socket is bound to an ephemeral local port and is not connected, so
//! several transports can talk to several boards from the same process.
//!
//! # Example
//!
//! ```no_run
//! use ether_io::{Channel, UdpTransport};
//! use std::time::Duration;
//!
//! let transport = UdpTransport::connect(
//!     "10.10.10.10:2424".parse().unwrap(),
//!     Duration::from_millis(500),
//! ).unwrap();
//!
//! transport.send(b"a").unwrap();
//! let reply = transport.receive(2);
//! ```
//!
//! # Stray datagrams
//!
//! Only datagrams from the board address are treated as replies. Anything
//! else that reaches the socket is dropped, and datagrams still queued from
//! an earlier exchange (a reply that arrived after its request gave up) are
//! discarded by [`Channel::discard_pending`] before the next request goes
//! out.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::{EtherIoError, Result};

/// Fixed UDP port every Ether I/O board listens on.
pub const ETHER_IO_PORT: u16 = 2424;

/// Default receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Receive buffer size; larger than any reply the boards send.
pub const MAX_PACKET_SIZE: usize = 2048;

/// Raw datagram channel to one board.
///
/// Implemented by [`UdpTransport`]; the request/reply engine is written
/// against this trait only.
pub trait Channel {
    /// Sends one datagram. Never waits for the network.
    fn send(&self, data: &[u8]) -> Result<()>;

    /// Waits for one reply datagram, up to the channel timeout.
    ///
    /// Returns exactly `expected_len` bytes. Fails with
    /// [`EtherIoError::Timeout`] if nothing arrives in time, with
    /// [`EtherIoError::Interrupted`] if the wait was cancelled and with
    /// [`EtherIoError::Protocol`] if the reply has any other length.
    fn receive(&self, expected_len: usize) -> Result<Vec<u8>>;

    /// Drops datagrams queued before a new request is sent.
    ///
    /// Fails with [`EtherIoError::Interrupted`] if a cancellation is pending.
    fn discard_pending(&self) -> Result<()> {
        Ok(())
    }
}

/// Lifecycle of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no socket yet.
    Unopened,
    /// Socket bound; send and receive allowed.
    Open,
    /// Socket released; terminal.
    Closed,
}

enum Socket {
    Unopened,
    Open(UdpSocket),
    Closed,
}

/// UDP transport bound to one board endpoint.
pub struct UdpTransport {
    socket: Socket,
    remote_addr: SocketAddr,
    timeout: Duration,
    cancels: Arc<AtomicUsize>,
}

impl UdpTransport {
    /// Creates an unopened transport for `remote_addr`.
    pub fn new(remote_addr: SocketAddr, timeout: Duration) -> Self {
        Self {
            socket: Socket::Unopened,
            remote_addr,
            timeout,
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a transport and opens its socket.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket cannot be created or configured.
    pub fn connect(remote_addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let mut transport = Self::new(remote_addr, timeout);
        transport.open()?;
        Ok(transport)
    }

    /// Binds an ephemeral local socket.
    ///
    /// Opening an already open transport is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the transport was closed, or an I/O error
    /// if the socket cannot be created.
    pub fn open(&mut self) -> Result<()> {
        match self.socket {
            Socket::Open(_) => return Ok(()),
            Socket::Closed => return Err(EtherIoError::SessionClosed),
            Socket::Unopened => {}
        }
        validate_timeout(self.timeout)?;

        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_read_timeout(Some(self.timeout))?;
        debug!(
            "opened transport {:?} -> {}",
            socket.local_addr().ok(),
            self.remote_addr
        );
        self.socket = Socket::Open(socket);
        Ok(())
    }

    /// Releases the socket. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Socket::Open(socket) = std::mem::replace(&mut self.socket, Socket::Closed) {
            debug!(
                "closed transport {:?} -> {}",
                socket.local_addr().ok(),
                self.remote_addr
            );
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.socket {
            Socket::Unopened => SessionState::Unopened,
            Socket::Open(_) => SessionState::Open,
            Socket::Closed => SessionState::Closed,
        }
    }

    /// Returns the remote board address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns the receive timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Changes the receive timeout; applies to the next receive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a zero timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        validate_timeout(timeout)?;
        if let Socket::Open(socket) = &self.socket {
            socket.set_read_timeout(Some(timeout))?;
        }
        self.timeout = timeout;
        Ok(())
    }

    /// Returns the local socket address, if open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            Socket::Open(socket) => socket.local_addr().ok(),
            _ => None,
        }
    }

    /// Returns a handle that can abort a pending receive from another thread.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` unless the transport is open.
    pub fn cancel_handle(&self) -> Result<CancelHandle> {
        let socket = self.socket()?;
        Ok(CancelHandle {
            socket: Arc::new(socket.try_clone()?),
            wake_addr: wake_addr(socket)?,
            cancels: Arc::clone(&self.cancels),
        })
    }

    /// Consumes one pending cancellation, if any.
    fn take_cancel(&self) -> bool {
        self.cancels
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn drain(&self, socket: &UdpSocket, wake: SocketAddr) -> Result<()> {
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        loop {
            match socket.recv_from(&mut buffer) {
                Ok((0, from)) if from == wake => {
                    if self.take_cancel() {
                        return Err(EtherIoError::Interrupted);
                    }
                }
                Ok((size, from)) => {
                    debug!("discarding stale {} byte(s) from {}", size, from);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(classify_recv_error(e)),
            }
        }
    }

    fn socket(&self) -> Result<&UdpSocket> {
        match &self.socket {
            Socket::Open(socket) => Ok(socket),
            _ => Err(EtherIoError::SessionClosed),
        }
    }
}

impl Channel for UdpTransport {
    fn send(&self, data: &[u8]) -> Result<()> {
        let socket = self.socket()?;
        trace!("-> {} {:02X?}", self.remote_addr, data);
        socket.send_to(data, self.remote_addr)?;
        Ok(())
    }

    fn receive(&self, expected_len: usize) -> Result<Vec<u8>> {
        let socket = self.socket()?;
        let wake = wake_addr(socket)?;
        let deadline = Instant::now() + self.timeout;
        let mut buffer = vec![0u8; MAX_PACKET_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(EtherIoError::Timeout);
            }
            socket.set_read_timeout(Some(remaining))?;
            let (size, from) = socket.recv_from(&mut buffer).map_err(classify_recv_error)?;

            if from == wake && size == 0 {
                if self.take_cancel() {
                    return Err(EtherIoError::Interrupted);
                }
                continue;
            }
            if from != self.remote_addr {
                debug!("dropping {} byte(s) from {}", size, from);
                continue;
            }

            buffer.truncate(size);
            trace!("<- {} {:02X?}", from, buffer);
            if size != expected_len {
                return Err(EtherIoError::protocol(format!(
                    "expected a {} byte reply, got {}",
                    expected_len, size
                )));
            }
            return Ok(buffer);
        }
    }

    fn discard_pending(&self) -> Result<()> {
        let socket = self.socket()?;
        let wake = wake_addr(socket)?;
        socket.set_nonblocking(true)?;
        let drained = self.drain(socket, wake);
        socket.set_nonblocking(false)?;
        drained
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.local_addr())
            .field("state", &self.state())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Aborts a receive blocked on a [`UdpTransport`].
///
/// Cancelling wakes the blocked receive, which then fails with
/// [`EtherIoError::Interrupted`]. If nothing is waiting, the next request on
/// the transport fails that way instead. Each call cancels exactly one
/// receive or request.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    socket: Arc<UdpSocket>,
    wake_addr: SocketAddr,
    cancels: Arc<AtomicUsize>,
}

impl CancelHandle {
    /// Requests cancellation of the pending receive.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the wake-up datagram cannot be sent.
    pub fn cancel(&self) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.socket.send_to(&[], self.wake_addr) {
            self.cancels.fetch_sub(1, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Loopback address the cancel wake-ups of `socket` come from.
fn wake_addr(socket: &UdpSocket) -> Result<SocketAddr> {
    let port = socket.local_addr()?.port();
    Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
}

/// Maps a receive failure onto the driver error kinds.
pub(crate) fn classify_recv_error(e: io::Error) -> EtherIoError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => EtherIoError::Timeout,
        io::ErrorKind::Interrupted => EtherIoError::Interrupted,
        _ => EtherIoError::Io(e),
    }
}

fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(EtherIoError::invalid_parameter(
            "timeout",
            "must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn local_board() -> (UdpSocket, SocketAddr) {
        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = board.local_addr().unwrap();
        (board, addr)
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(ETHER_IO_PORT, 2424);
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_millis(1000));
    }

    #[test]
    fn test_lifecycle() {
        let addr: SocketAddr = "127.0.0.1:2424".parse().unwrap();
        let mut transport = UdpTransport::new(addr, Duration::from_millis(100));
        assert_eq!(transport.state(), SessionState::Unopened);
        assert!(matches!(
            transport.send(b"a").unwrap_err(),
            EtherIoError::SessionClosed
        ));

        transport.open().unwrap();
        assert_eq!(transport.state(), SessionState::Open);
        assert!(transport.local_addr().is_some());

        transport.close();
        transport.close();
        assert_eq!(transport.state(), SessionState::Closed);
        assert!(transport.receive(2).is_err());
        assert!(matches!(
            transport.open().unwrap_err(),
            EtherIoError::SessionClosed
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let addr: SocketAddr = "127.0.0.1:2424".parse().unwrap();
        assert!(UdpTransport::connect(addr, Duration::ZERO).is_err());
        let mut transport = UdpTransport::connect(addr, Duration::from_millis(50)).unwrap();
        assert!(transport.set_timeout(Duration::ZERO).is_err());
        transport.set_timeout(Duration::from_millis(75)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_millis(75));
    }

    #[test]
    fn test_send_receive() {
        let (board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_secs(2)).unwrap();

        transport.send(b"b").unwrap();
        let mut buf = [0u8; 16];
        let (n, from) = board.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"b");

        board.send_to(&[b'B', 0x42], from).unwrap();
        assert_eq!(transport.receive(2).unwrap(), vec![b'B', 0x42]);
    }

    #[test]
    fn test_receive_rejects_wrong_length() {
        let (board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        transport.send(b"a").unwrap();
        let mut buf = [0u8; 16];
        let (_, from) = board.recv_from(&mut buf).unwrap();

        board.send_to(&[b'A', 1, 2], from).unwrap();
        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Protocol { .. }
        ));
        board.send_to(&[b'A'], from).unwrap();
        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Protocol { .. }
        ));
    }

    #[test]
    fn test_receive_ignores_other_senders() {
        let (board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        let local = SocketAddr::from((Ipv4Addr::LOCALHOST, transport.local_addr().unwrap().port()));

        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
        stranger.send_to(&[b'X', 0xEE], local).unwrap();
        board.send_to(&[b'C', 0x07], local).unwrap();

        assert_eq!(transport.receive(2).unwrap(), vec![b'C', 0x07]);
    }

    #[test]
    fn test_discard_pending_drops_stale_replies() {
        let (board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_millis(100)).unwrap();
        let local = SocketAddr::from((Ipv4Addr::LOCALHOST, transport.local_addr().unwrap().port()));

        board.send_to(&[b'B', 0x0B], local).unwrap();
        thread::sleep(Duration::from_millis(50));
        transport.discard_pending().unwrap();

        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Timeout
        ));
    }

    #[test]
    fn test_each_cancel_interrupts_once() {
        let (_board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_millis(100)).unwrap();
        let handle = transport.cancel_handle().unwrap();

        handle.cancel().unwrap();
        handle.cancel().unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Interrupted
        ));
        assert!(matches!(
            transport.discard_pending().unwrap_err(),
            EtherIoError::Interrupted
        ));
        transport.discard_pending().unwrap();
        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Timeout
        ));
    }

    #[test]
    fn test_receive_timeout() {
        let (_board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_millis(30)).unwrap();
        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Timeout
        ));
    }

    #[test]
    fn test_cancel_interrupts_receive() {
        let (_board, addr) = local_board();
        let transport = UdpTransport::connect(addr, Duration::from_secs(5)).unwrap();
        let handle = transport.cancel_handle().unwrap();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel().unwrap();
        });

        assert!(matches!(
            transport.receive(2).unwrap_err(),
            EtherIoError::Interrupted
        ));
        canceller.join().unwrap();
    }

    #[test]
    fn test_classify_recv_error() {
        let timeout = io::Error::new(io::ErrorKind::WouldBlock, "would block");
        assert!(matches!(classify_recv_error(timeout), EtherIoError::Timeout));
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        assert!(matches!(classify_recv_error(timeout), EtherIoError::Timeout));
        let intr = io::Error::new(io::ErrorKind::Interrupted, "eintr");
        assert!(matches!(classify_recv_error(intr), EtherIoError::Interrupted));
        let other = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(classify_recv_error(other), EtherIoError::Io(_)));
    }

    #[test]
    fn test_transport_debug() {
        let addr: SocketAddr = "127.0.0.1:2424".parse().unwrap();
        let transport = UdpTransport::connect(addr, Duration::from_millis(100)).unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("UdpTransport"));
        assert!(debug_str.contains("127.0.0.1:2424"));
    }
}
