//! Board discovery.
//!
//! Boards answer the 4-byte tag `"IO24"` sent to UDP port 2424. Discovery
//! broadcasts the tag once on every local interface that has a broadcast
//! address, then collects answers until the network has been silent for
//! `max_retries` consecutive scan windows.
//!
//! Each answer is recorded as 16 bytes:
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0..4 | `"IO24"` |
//! | 4..10 | MAC address |
//! | 10..12 | firmware version (two decimal digits) |
//! | 12..16 | source IPv4 address, filled in from the datagram sender |
//!
//! The discovery socket is private to one scan and released when it ends.
//!
//! # Example
//!
//! ```no_run
//! use ether_io::discovery::{discover_with, DiscoveryConfig};
//! use std::time::Duration;
//!
//! let config = DiscoveryConfig::new().with_scan_timeout(Duration::from_millis(500));
//! for board in discover_with(&config)? {
//!     println!("{} mac={:02x?} fw={:?}", board.ip(), board.mac(), board.firmware());
//! }
//! # Ok::<(), ether_io::EtherIoError>(())
//! ```

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use log::{debug, trace, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::command::{Command, IDENTIFY_TAG};
use crate::error::{EtherIoError, Result};
use crate::net_utils;
use crate::transport::{classify_recv_error, ETHER_IO_PORT, MAX_PACKET_SIZE};

/// Default wait per listen window.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default number of consecutive silent windows that end a scan.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Size of one discovery record.
pub const RECORD_LEN: usize = 16;

/// Configuration for a discovery scan.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Wait per listen window.
    pub scan_timeout: Duration,
    /// Consecutive silent windows that end the scan (at least 1).
    pub max_retries: u32,
    /// UDP port the boards listen on.
    pub port: u16,
    /// Explicit destinations; `None` broadcasts on every local interface.
    pub targets: Option<Vec<SocketAddr>>,
}

impl DiscoveryConfig {
    /// Creates the default configuration: 1 s windows, 3 retries, port 2424.
    pub fn new() -> Self {
        Self {
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            port: ETHER_IO_PORT,
            targets: None,
        }
    }

    /// Sets the wait per listen window.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Sets the number of silent windows that end the scan; 0 is treated as 1.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Sets the board port used for interface broadcasts.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sends the identify tag to `targets` instead of the interface
    /// broadcast addresses.
    pub fn with_targets(mut self, targets: Vec<SocketAddr>) -> Self {
        self.targets = Some(targets);
        self
    }

    fn resolve_targets(&self) -> Result<Vec<SocketAddr>> {
        if let Some(targets) = &self.targets {
            return Ok(targets.clone());
        }

        let mut addrs = net_utils::broadcast_addresses()?;
        if cfg!(not(unix)) && addrs.is_empty() {
            addrs.push(Ipv4Addr::BROADCAST);
        }
        Ok(addrs
            .into_iter()
            .map(|ip| SocketAddr::from((ip, self.port)))
            .collect())
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One board that answered a discovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveredDevice {
    raw: [u8; RECORD_LEN],
}

impl DiscoveredDevice {
    /// Builds a record from an answer and its sender.
    ///
    /// At most 16 answer bytes are kept; bytes 12..16 are then overwritten
    /// with `source`.
    pub fn from_reply(reply: &[u8], source: Ipv4Addr) -> Self {
        let mut raw = [0u8; RECORD_LEN];
        let n = reply.len().min(RECORD_LEN);
        raw[..n].copy_from_slice(&reply[..n]);
        raw[12..].copy_from_slice(&source.octets());
        Self { raw }
    }

    /// Answer tag; `"IO24"` for genuine boards.
    pub fn tag(&self) -> [u8; 4] {
        [self.raw[0], self.raw[1], self.raw[2], self.raw[3]]
    }

    /// Returns `true` if the answer started with the identify tag.
    pub fn has_identify_tag(&self) -> bool {
        self.tag() == IDENTIFY_TAG
    }

    /// MAC address.
    pub fn mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.raw[4..10]);
        mac
    }

    /// Firmware version bytes, each read as a decimal number.
    pub fn firmware(&self) -> [u8; 2] {
        [self.raw[10], self.raw[11]]
    }

    /// Address the answer came from.
    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.raw[12], self.raw[13], self.raw[14], self.raw[15])
    }

    /// The full 16-byte record.
    pub fn as_bytes(&self) -> &[u8; RECORD_LEN] {
        &self.raw
    }
}

/// Scans all local interfaces with the default configuration.
///
/// # Errors
///
/// See [`discover_with`].
pub fn discover() -> Result<Vec<DiscoveredDevice>> {
    discover_with(&DiscoveryConfig::new())
}

/// Broadcasts the identify tag and collects the answers.
///
/// Timeouts and per-datagram receive failures only count as silent windows;
/// the scan returns whatever was collected, possibly nothing.
///
/// # Errors
///
/// Returns an I/O error if the socket cannot be set up, the interface list
/// cannot be read or a broadcast cannot be sent, and `Interrupted` if the
/// wait was interrupted.
pub fn discover_with(config: &DiscoveryConfig) -> Result<Vec<DiscoveredDevice>> {
    if config.scan_timeout.is_zero() {
        return Err(EtherIoError::invalid_parameter(
            "scan_timeout",
            "must be greater than 0",
        ));
    }

    let targets = config.resolve_targets()?;
    let socket = broadcast_socket(config.scan_timeout)?;

    let identify = Command::identify();
    for target in &targets {
        debug!("identify -> {}", target);
        socket.send_to(identify.as_bytes(), target)?;
    }

    collect(&socket, config.max_retries.max(1))
}

fn broadcast_socket(timeout: Duration) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_broadcast(true)?;
    socket.set_reuse_address(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&SockAddr::from(bind_addr))?;
    socket.set_read_timeout(Some(timeout))?;

    Ok(socket.into())
}

fn collect(socket: &UdpSocket, max_retries: u32) -> Result<Vec<DiscoveredDevice>> {
    let mut devices = Vec::new();
    let mut buffer = [0u8; MAX_PACKET_SIZE];
    let mut strikes = 0;

    while strikes < max_retries {
        match socket.recv_from(&mut buffer) {
            Ok((size, SocketAddr::V4(from))) => {
                strikes = 0;
                trace!("identify <- {} {:02X?}", from, &buffer[..size]);
                devices.push(DiscoveredDevice::from_reply(&buffer[..size], *from.ip()));
            }
            Ok((_, from)) => {
                debug!("ignoring answer from {}", from);
            }
            Err(e) => match classify_recv_error(e) {
                EtherIoError::Timeout => strikes += 1,
                EtherIoError::Interrupted => return Err(EtherIoError::Interrupted),
                other => {
                    warn!("discovery receive failed: {}", other);
                    strikes += 1;
                }
            },
        }
    }

    debug!("discovery found {} board(s)", devices.len());
    Ok(devices)
}
