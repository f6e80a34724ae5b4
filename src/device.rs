//! High-level driver for one Ether I/O board.
//!
//! This module provides the [`Device`] struct, the primary interface for
//! reading and writing board registers.
//!
//! # Overview
//!
//! The device handles:
//! - Validation of port letters and line numbers against the board variant
//! - Command construction per the variant's capability table
//! - One request in flight at a time per board
//! - Reply decoding into typed values
//!
//! # Example
//!
//! ```no_run
//! use ether_io::{Device, DeviceConfig, Variant};
//! use std::net::Ipv4Addr;
//!
//! let device = Device::open(DeviceConfig::new(Variant::Io24, Ipv4Addr::new(10, 10, 10, 10)))?;
//!
//! // Port A all outputs, all high
//! device.write_port_direction('a', 0x00)?;
//! device.write_port_value('a', 0xFF)?;
//!
//! // Drop line 3 of port A
//! device.write_line('a', 3, false)?;
//!
//! let reading = device.read_port_value('a')?;
//! assert_eq!(reading.value(), 0xF7);
//!
//! device.close();
//! # Ok::<(), ether_io::EtherIoError>(())
//! ```
//!
//! # Thread Safety
//!
//! `Device` is `Sync`. Commands from several threads are serialized so a
//! reply is always delivered to the caller that sent the request. Compound
//! operations such as [`Device::write_line`] are *not* atomic: two threads
//! changing lines of the same port can still overwrite each other.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::{debug, warn};

use crate::command::{Command, Register};
use crate::engine::RequestEngine;
use crate::error::{EtherIoError, Result};
use crate::response::{EepromWord, HostData, PortValue, RegisterValue};
use crate::transport::{CancelHandle, SessionState, UdpTransport, DEFAULT_TIMEOUT, ETHER_IO_PORT};
use crate::utils::{set_line, split_word};
use crate::variant::Variant;

/// Highest line index inside one 8-bit port register.
const LAST_LINE_IN_PORT: u8 = 7;

/// Configuration for opening a [`Device`].
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Board variant.
    pub variant: Variant,
    /// Board address and UDP port.
    pub board_addr: SocketAddr,
    /// Receive timeout per attempt.
    pub timeout: Duration,
}

impl DeviceConfig {
    /// Creates a configuration with the default port (2424) and timeout (1 s).
    ///
    /// # Example
    ///
    /// ```
    /// use ether_io::{DeviceConfig, Variant};
    /// use std::net::Ipv4Addr;
    ///
    /// let config = DeviceConfig::new(Variant::Io72Tpc, Ipv4Addr::new(10, 10, 10, 10));
    /// assert_eq!(config.board_addr.port(), 2424);
    /// ```
    pub fn new(variant: Variant, ip: impl Into<IpAddr>) -> Self {
        Self {
            variant,
            board_addr: SocketAddr::new(ip.into(), ETHER_IO_PORT),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom board port (default is 2424).
    pub fn with_port(mut self, port: u16) -> Self {
        self.board_addr.set_port(port);
        self
    }

    /// Sets a custom receive timeout (default is 1 second).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Driver for one Ether I/O board.
pub struct Device {
    engine: RequestEngine<UdpTransport>,
    variant: Variant,
}

impl Device {
    /// Opens a session to the board and checks that it answers.
    ///
    /// The check reads the value of port `a`; the board must reply with
    /// exactly 2 bytes. On any failure the socket is released.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the board does not answer, `Protocol` if it
    /// answers with the wrong length, or an I/O error if the socket cannot
    /// be created.
    pub fn open(config: DeviceConfig) -> Result<Self> {
        let transport = UdpTransport::connect(config.board_addr, config.timeout)?;
        let device = Self {
            engine: RequestEngine::new(transport),
            variant: config.variant,
        };

        if let Err(e) = device.probe() {
            warn!("{} at {} failed probe: {}", device.variant, config.board_addr, e);
            device.close();
            return Err(e);
        }

        debug!("{} at {} is online", device.variant, config.board_addr);
        Ok(device)
    }

    fn probe(&self) -> Result<()> {
        let cmd = Command::read_register(self.variant, Register::Value, 'a')?;
        let reply = self.engine.execute(&cmd)?;
        if reply.len() != PortValue::LEN {
            return Err(EtherIoError::protocol(format!(
                "could not get port data: expected {} bytes, got {}",
                PortValue::LEN,
                reply.len()
            )));
        }
        Ok(())
    }

    /// Releases the socket. Safe to call more than once.
    pub fn close(&self) {
        self.engine.with_channel(|transport| transport.close());
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.engine.with_channel(|transport| transport.state())
    }

    /// Returns the board variant.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Returns the board address.
    pub fn board_addr(&self) -> SocketAddr {
        self.engine.with_channel(|transport| transport.remote_addr())
    }

    /// Returns the receive timeout.
    pub fn timeout(&self) -> Duration {
        self.engine.with_channel(|transport| transport.timeout())
    }

    /// Changes the receive timeout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a zero timeout.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.engine
            .with_channel(|transport| transport.set_timeout(timeout))
    }

    /// Returns a handle that aborts a pending read from another thread.
    pub fn cancel_handle(&self) -> Result<CancelHandle> {
        self.engine.with_channel(|transport| transport.cancel_handle())
    }

    /// Checks a port letter against this board.
    pub fn validate_port_letter(&self, letter: char) -> Result<()> {
        self.variant.validate_port_letter(letter).map(drop)
    }

    /// Checks a flat line number against this board.
    pub fn validate_line_number(&self, line: u8) -> Result<()> {
        self.variant.validate_line_number(line).map(drop)
    }

    fn read_register(&self, register: Register, port: char) -> Result<RegisterValue> {
        let cmd = Command::read_register(self.variant, register, port)?;
        RegisterValue::from_bytes(&self.engine.execute(&cmd)?)
    }

    fn write_register(&self, register: Register, port: char, value: u8) -> Result<()> {
        let cmd = Command::write_register(self.variant, register, port, value)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Reads the value register of `port`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use ether_io::{Device, DeviceConfig, Variant};
    /// # use std::net::Ipv4Addr;
    /// # let device = Device::open(DeviceConfig::new(Variant::Io24, Ipv4Addr::new(10, 10, 10, 10))).unwrap();
    /// let reading = device.read_port_value('b')?;
    /// println!("port {} = {:08b}", reading.port(), reading.value());
    /// # Ok::<(), ether_io::EtherIoError>(())
    /// ```
    pub fn read_port_value(&self, port: char) -> Result<PortValue> {
        let cmd = Command::read_register(self.variant, Register::Value, port)?;
        PortValue::from_bytes(&self.engine.execute(&cmd)?)
    }

    /// Writes all 8 lines of `port`.
    pub fn write_port_value(&self, port: char, value: u8) -> Result<()> {
        self.write_register(Register::Value, port, value)
    }

    /// Reads the direction register of `port`.
    pub fn read_port_direction(&self, port: char) -> Result<RegisterValue> {
        self.read_register(Register::Direction, port)
    }

    /// Writes the direction register of `port` (1 = input, 0 = output).
    pub fn write_port_direction(&self, port: char, value: u8) -> Result<()> {
        self.write_register(Register::Direction, port, value)
    }

    /// Reads the pull-up register of `port`.
    pub fn read_port_pull_up(&self, port: char) -> Result<RegisterValue> {
        self.read_register(Register::PullUp, port)
    }

    /// Writes the pull-up register of `port`.
    pub fn write_port_pull_up(&self, port: char, value: u8) -> Result<()> {
        self.write_register(Register::PullUp, port, value)
    }

    /// Reads the threshold register of `port`.
    pub fn read_port_threshold(&self, port: char) -> Result<RegisterValue> {
        self.read_register(Register::Threshold, port)
    }

    /// Writes the threshold register of `port`.
    pub fn write_port_threshold(&self, port: char, value: u8) -> Result<()> {
        self.write_register(Register::Threshold, port, value)
    }

    /// Reads the Schmitt trigger register of `port`.
    pub fn read_port_schmitt_trigger(&self, port: char) -> Result<RegisterValue> {
        self.read_register(Register::SchmittTrigger, port)
    }

    /// Writes the Schmitt trigger register of `port`.
    pub fn write_port_schmitt_trigger(&self, port: char, value: u8) -> Result<()> {
        self.write_register(Register::SchmittTrigger, port, value)
    }

    /// Sets or clears one line of `port`.
    ///
    /// Reads the current value of `port`, changes bit `line` and writes the
    /// whole byte back. The value read is always that of `port` itself, not
    /// of port `a` as older drivers for these boards did. The read and the
    /// write are separate commands, so a concurrent writer of the same port
    /// may be overwritten.
    ///
    /// # Arguments
    ///
    /// * `port` - Port letter
    /// * `line` - Line within the port (0-7, 0 is the least significant bit)
    /// * `state` - `true` to set, `false` to clear
    ///
    /// # Errors
    ///
    /// Returns a validation error if the port is invalid for the board or
    /// `line` is outside 0-7; nothing is sent in that case.
    pub fn write_line(&self, port: char, line: u8, state: bool) -> Result<()> {
        self.variant.validate_port_letter(port)?;
        self.variant.validate_line_number(line)?;
        if line > LAST_LINE_IN_PORT {
            return Err(EtherIoError::InvalidLine {
                line,
                max: LAST_LINE_IN_PORT,
            });
        }

        let current = self.read_port_value(port)?.value();
        let Some(updated) = set_line(current, line, state) else {
            return Err(EtherIoError::InvalidLine {
                line,
                max: LAST_LINE_IN_PORT,
            });
        };
        self.write_port_value(port, updated)
    }

    /// Resets the board. Ports return to inputs (or their EEPROM defaults);
    /// allow the board some time before sending further commands.
    pub fn reset_board(&self) -> Result<()> {
        self.engine.execute(&Command::reset_board()).map(drop)
    }

    /// Enables EEPROM writes.
    pub fn enable_eeprom_write(&self) -> Result<()> {
        let cmd = Command::eeprom_write_enable(self.variant)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Disables EEPROM writes.
    pub fn disable_eeprom_write(&self) -> Result<()> {
        let cmd = Command::eeprom_write_disable(self.variant)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Erases one EEPROM word (it reads back as `0xFFFF`).
    pub fn erase_eeprom_word(&self, word_address: u8) -> Result<()> {
        let cmd = Command::eeprom_erase_word(self.variant, word_address)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Writes one EEPROM word from its two bytes.
    pub fn write_eeprom_word(&self, word_address: u8, msb: u8, lsb: u8) -> Result<()> {
        let cmd = Command::eeprom_write_word(word_address, msb, lsb);
        self.engine.execute(&cmd).map(drop)
    }

    /// Writes one EEPROM word from a `u16`.
    pub fn write_eeprom_u16(&self, word_address: u8, word: u16) -> Result<()> {
        let (msb, lsb) = split_word(word);
        self.write_eeprom_word(word_address, msb, lsb)
    }

    /// Reads one EEPROM word.
    pub fn read_eeprom_word(&self, word_address: u8) -> Result<EepromWord> {
        let cmd = Command::eeprom_read_word(word_address);
        EepromWord::from_bytes(&self.engine.execute(&cmd)?)
    }

    /// Drives one pin high by flat pin number (TPC boards).
    pub fn raise_pin(&self, pin: u8) -> Result<()> {
        let cmd = Command::set_pin(self.variant, pin, true)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Drives one pin low by flat pin number (TPC boards).
    pub fn lower_pin(&self, pin: u8) -> Result<()> {
        let cmd = Command::set_pin(self.variant, pin, false)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Sends one byte and returns the board's echo (IO24).
    pub fn echo_byte(&self, byte: u8) -> Result<u8> {
        let cmd = Command::echo_byte(self.variant, byte)?;
        single_byte(&self.engine.execute(&cmd)?, "echo")
    }

    /// Requests the board's serial number, IP, MAC and port (IO24).
    pub fn host_data(&self) -> Result<HostData> {
        let cmd = Command::host_data(self.variant)?;
        HostData::from_bytes(&self.engine.execute(&cmd)?)
    }

    /// Sends a space and returns the board's one-byte answer (IO24).
    pub fn send_space(&self) -> Result<u8> {
        let cmd = Command::send_space(self.variant)?;
        single_byte(&self.engine.execute(&cmd)?, "space")
    }

    /// Switches port A into SPI mode (IO24R).
    pub fn enable_port_a_spi(&self) -> Result<()> {
        let cmd = Command::spi_mode(self.variant, true)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Switches port A back to digital I/O (IO24R).
    pub fn disable_port_a_spi(&self) -> Result<()> {
        let cmd = Command::spi_mode(self.variant, false)?;
        self.engine.execute(&cmd).map(drop)
    }

    /// Clocks `data` out of the port A SPI interface (IO24R).
    pub fn spi_send(&self, data: &[u8]) -> Result<()> {
        let cmd = Command::spi_send(self.variant, data)?;
        self.engine.execute(&cmd).map(drop)
    }
}

fn single_byte(reply: &[u8], what: &str) -> Result<u8> {
    match reply {
        [byte] => Ok(*byte),
        _ => Err(EtherIoError::protocol(format!(
            "{} reply must be 1 byte, got {}",
            what,
            reply.len()
        ))),
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("variant", &self.variant)
            .field("engine", &self.engine)
            .finish()
    }
}
