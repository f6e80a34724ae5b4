//! # Ether I/O Driver
//!
//! A Rust driver for the Ether I/O family of digital I/O boards (IO24,
//! IO24F, IO24R, IO24TPC, IO72TPC), which are controlled with single UDP
//! datagrams sent to port 2424.
//!
//! Each board exposes byte-wide registers per port (value, direction,
//! pull-up, threshold, Schmitt trigger) plus an EEPROM. This crate encodes
//! operations into the boards' fixed legacy byte format, runs the
//! request/reply cycle over UDP with bounded retries and decodes replies
//! into typed values.
//!
//! ## Features
//!
//! - **Byte-exact** - commands match the firmware's wire format, including
//!   lower-case reads and upper-case writes
//! - **Variant aware** - port and line ranges, pull-up register letter and
//!   optional command groups come from a per-board capability table
//! - **Serialized** - one request in flight per board, so replies can't be
//!   crossed between threads
//! - **No panics** - all errors returned as `Result<T, EtherIoError>`
//! - **Discovery** - find boards on every local subnet by broadcast
//!
//! ## Quick Start
//!
//! ```no_run
//! use ether_io::{Device, DeviceConfig, Variant};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> ether_io::Result<()> {
//!     let config = DeviceConfig::new(Variant::Io24, Ipv4Addr::new(10, 10, 10, 10));
//!     let device = Device::open(config)?;
//!
//!     // All of port B as outputs, then set line 2
//!     device.write_port_direction('b', 0x00)?;
//!     device.write_line('b', 2, true)?;
//!
//!     let reading = device.read_port_value('b')?;
//!     println!("port {} = {:08b}", reading.port(), reading.value());
//!
//!     device.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Discovery
//!
//! ```no_run
//! for board in ether_io::discover()? {
//!     println!("{} firmware {:?}", board.ip(), board.firmware());
//! }
//! # Ok::<(), ether_io::EtherIoError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use ether_io::{Device, DeviceConfig, EtherIoError, Variant};
//! use std::net::Ipv4Addr;
//!
//! let device = Device::open(DeviceConfig::new(Variant::Io24, Ipv4Addr::new(10, 10, 10, 10)))?;
//!
//! match device.read_port_value('d') {
//!     Ok(reading) => println!("{}", reading.value()),
//!     Err(EtherIoError::InvalidPort { letter, first, last }) => {
//!         println!("{letter} is not in {first}..={last}");
//!     }
//!     Err(EtherIoError::Timeout) => println!("board did not answer"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), EtherIoError>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: session open/close and
//! discovery targets at `debug`, every datagram at `trace`.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod command;
mod device;
pub mod discovery;
mod engine;
mod error;
pub mod net_utils;
mod response;
mod transport;
pub mod utils;
mod variant;

// Public re-exports
pub use command::{Command, Opcode, Register, IDENTIFY_TAG, MAX_SPI_BYTES};
pub use device::{Device, DeviceConfig};
pub use discovery::{discover, discover_with, DiscoveredDevice, DiscoveryConfig};
pub use engine::{exchange, RequestEngine, MAX_ATTEMPTS};
pub use error::{EtherIoError, Result};
pub use response::{EepromWord, HostData, PortValue, RegisterValue};
pub use transport::{
    CancelHandle, Channel, SessionState, UdpTransport, DEFAULT_TIMEOUT, ETHER_IO_PORT,
    MAX_PACKET_SIZE,
};
pub use variant::{Capabilities, Variant};
