//! Reply decoding.
//!
//! Replies are fixed-length byte strings whose shape depends only on the
//! command that was sent:
//!
//! | Reply | Size | Layout |
//! |-------|:----:|--------|
//! | [`PortValue`] | 2 | upper(port), value |
//! | [`RegisterValue`] | 3 | register code, upper(port), value |
//! | [`EepromWord`] | 4 | `'R'`, address, msb, lsb |
//! | [`HostData`] | 16 | `'%'`, serial\[3\], ip\[4\], mac\[6\], port (BE u16) |
//!
//! Decoders only check the length; they keep the raw bytes so callers can
//! inspect the echo fields themselves.
//!
//! # Example
//!
//! ```
//! use ether_io::{PortValue, RegisterValue};
//!
//! let reply = PortValue::from_bytes(&[b'A', 0x81]).unwrap();
//! assert_eq!(reply.port(), 'A');
//! assert_eq!(reply.value(), 0x81);
//!
//! let reply = RegisterValue::from_bytes(&[b'!', b'B', 0xFF]).unwrap();
//! assert_eq!(reply.code(), b'!');
//! assert_eq!(reply.value(), 0xFF);
//! ```

use std::net::Ipv4Addr;

use crate::error::{EtherIoError, Result};
use crate::utils::word_from_bytes;

fn fixed<const N: usize>(data: &[u8], what: &str) -> Result<[u8; N]> {
    if data.len() != N {
        return Err(EtherIoError::protocol(format!(
            "{} reply must be {} bytes, got {}",
            what,
            N,
            data.len()
        )));
    }
    let mut raw = [0u8; N];
    raw.copy_from_slice(data);
    Ok(raw)
}

/// Reply to a port value read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortValue {
    raw: [u8; 2],
}

impl PortValue {
    /// Reply length in bytes.
    pub const LEN: usize = 2;

    /// Decodes a 2-byte reply.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::Protocol` if `data` is not exactly 2 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            raw: fixed(data, "port value")?,
        })
    }

    /// Port letter echoed by the board (upper case).
    pub fn port(&self) -> char {
        char::from(self.raw[0])
    }

    /// Port value.
    pub fn value(&self) -> u8 {
        self.raw[1]
    }

    /// Raw reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Reply to a direction, pull-up, threshold or Schmitt trigger read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterValue {
    raw: [u8; 3],
}

impl RegisterValue {
    /// Reply length in bytes.
    pub const LEN: usize = 3;

    /// Decodes a 3-byte reply.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::Protocol` if `data` is not exactly 3 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            raw: fixed(data, "register")?,
        })
    }

    /// Register code echoed by the board.
    pub fn code(&self) -> u8 {
        self.raw[0]
    }

    /// Port letter echoed by the board (upper case).
    pub fn port(&self) -> char {
        char::from(self.raw[1])
    }

    /// Register value.
    pub fn value(&self) -> u8 {
        self.raw[2]
    }

    /// Raw reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Reply to an EEPROM word read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromWord {
    raw: [u8; 4],
}

impl EepromWord {
    /// Reply length in bytes.
    pub const LEN: usize = 4;

    /// Decodes a 4-byte reply.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::Protocol` if `data` is not exactly 4 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            raw: fixed(data, "EEPROM word")?,
        })
    }

    /// Word address echoed by the board.
    pub fn address(&self) -> u8 {
        self.raw[1]
    }

    /// Most significant byte.
    pub fn msb(&self) -> u8 {
        self.raw[2]
    }

    /// Least significant byte.
    pub fn lsb(&self) -> u8 {
        self.raw[3]
    }

    /// The word as a big-endian `u16`.
    pub fn value(&self) -> u16 {
        word_from_bytes(self.msb(), self.lsb())
    }

    /// Raw reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Reply to the host data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostData {
    raw: [u8; 16],
}

impl HostData {
    /// Reply length in bytes.
    pub const LEN: usize = 16;

    /// Decodes a 16-byte reply.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::Protocol` if `data` is not exactly 16 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            raw: fixed(data, "host data")?,
        })
    }

    /// 24-bit board serial number.
    pub fn serial_number(&self) -> u32 {
        u32::from_be_bytes([0, self.raw[1], self.raw[2], self.raw[3]])
    }

    /// Board IP address.
    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.raw[4], self.raw[5], self.raw[6], self.raw[7])
    }

    /// Board MAC address.
    pub fn mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.raw[8..14]);
        mac
    }

    /// UDP port the board listens on.
    pub fn port(&self) -> u16 {
        word_from_bytes(self.raw[14], self.raw[15])
    }

    /// Raw reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}
