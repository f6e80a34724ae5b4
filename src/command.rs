//! Ether I/O command encoding.
//!
//! A command is the raw datagram payload sent to a board: 1 to 5 bytes for
//! the register and EEPROM set, a little more for SPI transfers. The first
//! byte (or first two) selects the operation; the rest are operands. There is
//! no header, length prefix or checksum.
//!
//! The reply to a command carries no length either, so every [`Opcode`]
//! knows how many reply bytes it produces. That number is never inferred
//! from the wire.
//!
//! # Wire Table
//!
//! | Operation | Request bytes | Reply bytes |
//! |-----------|---------------|:-----------:|
//! | Read port value | `[lower(port)]` | 2 |
//! | Write port value | `[upper(port), value]` | - |
//! | Read register | `[code, lower(port)]` | 3 |
//! | Write register | `[code, upper(port), value]` | - |
//! | Reset board | `['\'', '@', 0, 0xAA, 0x55]` | - |
//! | EEPROM write enable | `['\'', '1', 0, 0xAA, 0x55]` | - |
//! | EEPROM write disable | `['\'', '0', 0, 0, 0]` | - |
//! | EEPROM erase word | `['\'', 'E', addr, 0xAA, 0x55]` | - |
//! | EEPROM write word | `['\'', 'W', addr, msb, lsb]` | - |
//! | EEPROM read word | `['\'', 'R', addr, 0, 0]` | 4 |
//! | Raise/lower pin | `['H' \| 'L', pin]` | - |
//! | Identify | `"IO24"` | 16 |
//!
//! Register codes: direction `!`, pull-up `@` (or `%` on TPC boards),
//! threshold `#`, Schmitt trigger `$`.
//!
//! Reads carry the port letter in lower case and writes in upper case. The
//! firmware tells them apart that way, so the asymmetry must be kept.
//!
//! # Example
//!
//! ```
//! use ether_io::{Command, Register, Variant};
//!
//! let cmd = Command::read_register(Variant::Io24, Register::Direction, 'A').unwrap();
//! assert_eq!(cmd.as_bytes(), b"!a");
//! assert_eq!(cmd.reply_len(), Some(3));
//!
//! let cmd = Command::write_register(Variant::Io24, Register::Value, 'b', 0x0F).unwrap();
//! assert_eq!(cmd.as_bytes(), &[b'B', 0x0F]);
//! assert_eq!(cmd.reply_len(), None);
//! ```

use crate::error::{EtherIoError, Result};
use crate::variant::Variant;

/// Tag broadcast to discover boards; also the first 4 bytes of each answer.
pub const IDENTIFY_TAG: [u8; 4] = *b"IO24";

/// Prefix of the reset and EEPROM commands.
pub(crate) const CMD_EEPROM: u8 = b'\'';
/// Direction register code.
pub(crate) const CMD_DIRECTION: u8 = b'!';
/// Threshold register code.
pub(crate) const CMD_THRESHOLD: u8 = b'#';
/// Schmitt trigger register code.
pub(crate) const CMD_SCHMITT: u8 = b'$';
/// Host data request (IO24); the same letter is the pull-up code on TPC boards.
pub(crate) const CMD_HOST_DATA: u8 = b'%';
pub(crate) const CMD_ECHO: u8 = b'`';
pub(crate) const CMD_SPACE: u8 = b'*';
pub(crate) const CMD_SPI: u8 = b'S';
pub(crate) const CMD_PIN_HIGH: u8 = b'H';
pub(crate) const CMD_PIN_LOW: u8 = b'L';

/// Confirmation bytes the firmware requires on destructive commands.
pub(crate) const CONFIRM: [u8; 2] = [0xAA, 0x55];

/// Largest SPI payload that fits the one-byte length field.
pub const MAX_SPI_BYTES: usize = 255;

/// Per-port byte-wide register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Port value (line states).
    Value,
    /// Direction (1 = input, 0 = output).
    Direction,
    /// Pull-up enable.
    PullUp,
    /// Input threshold (CMOS/TTL).
    Threshold,
    /// Schmitt trigger enable.
    SchmittTrigger,
}

impl Register {
    /// All registers, port value first.
    pub const ALL: [Register; 5] = [
        Register::Value,
        Register::Direction,
        Register::PullUp,
        Register::Threshold,
        Register::SchmittTrigger,
    ];

    /// Returns the register code byte for `variant`, or `None` for the port
    /// value register, which has no code.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::Unsupported` if the variant lacks the register.
    pub fn code(self, variant: Variant) -> Result<Option<u8>> {
        let caps = variant.capabilities();
        match self {
            Register::Value => Ok(None),
            Register::Direction => Ok(Some(CMD_DIRECTION)),
            Register::PullUp => Ok(Some(caps.pull_up_code)),
            Register::Threshold | Register::SchmittTrigger if !caps.input_conditioning => {
                Err(EtherIoError::unsupported(variant, self.name()))
            }
            Register::Threshold => Ok(Some(CMD_THRESHOLD)),
            Register::SchmittTrigger => Ok(Some(CMD_SCHMITT)),
        }
    }

    /// Human readable register name.
    pub fn name(self) -> &'static str {
        match self {
            Register::Value => "port value register",
            Register::Direction => "direction register",
            Register::PullUp => "pull-up register",
            Register::Threshold => "threshold register",
            Register::SchmittTrigger => "Schmitt trigger register",
        }
    }
}

/// Operation carried by a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Read one register of one port.
    ReadRegister(Register),
    /// Write one register of one port.
    WriteRegister(Register),
    /// Reset the board.
    ResetBoard,
    /// EEPROM write enable.
    EepromWriteEnable,
    /// EEPROM write disable.
    EepromWriteDisable,
    /// EEPROM erase word.
    EepromErase,
    /// EEPROM write word.
    EepromWrite,
    /// EEPROM read word.
    EepromRead,
    /// Drive one pin high.
    RaisePin,
    /// Drive one pin low.
    LowerPin,
    /// Discovery broadcast.
    Identify,
    /// Echo one byte back.
    EchoByte,
    /// Request host data.
    HostData,
    /// Send space.
    SendSpace,
    /// Switch port A into SPI mode.
    SpiEnable,
    /// Switch port A back to I/O mode.
    SpiDisable,
    /// Clock bytes out of the SPI port.
    SpiSend,
}

impl Opcode {
    /// Number of reply bytes the board sends for this operation, or `None`
    /// for fire-and-forget commands.
    pub const fn reply_len(self) -> Option<usize> {
        match self {
            Opcode::ReadRegister(Register::Value) => Some(2),
            Opcode::ReadRegister(_) => Some(3),
            Opcode::EepromRead => Some(4),
            Opcode::Identify | Opcode::HostData => Some(16),
            Opcode::EchoByte | Opcode::SendSpace => Some(1),
            Opcode::WriteRegister(_)
            | Opcode::ResetBoard
            | Opcode::EepromWriteEnable
            | Opcode::EepromWriteDisable
            | Opcode::EepromErase
            | Opcode::EepromWrite
            | Opcode::RaisePin
            | Opcode::LowerPin
            | Opcode::SpiEnable
            | Opcode::SpiDisable
            | Opcode::SpiSend => None,
        }
    }
}

/// An encoded request datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    bytes: Vec<u8>,
}

impl Command {
    fn new(opcode: Opcode, bytes: Vec<u8>) -> Self {
        Self { opcode, bytes }
    }

    /// Builds a register read for `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port letter is invalid for `variant` or the
    /// variant lacks the register.
    pub fn read_register(variant: Variant, register: Register, port: char) -> Result<Self> {
        let lower = variant.validate_port_letter(port)?;
        let bytes = match register.code(variant)? {
            None => vec![lower],
            Some(code) => vec![code, lower],
        };
        Ok(Self::new(Opcode::ReadRegister(register), bytes))
    }

    /// Builds a register write for `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port letter is invalid for `variant` or the
    /// variant lacks the register.
    pub fn write_register(
        variant: Variant,
        register: Register,
        port: char,
        value: u8,
    ) -> Result<Self> {
        let upper = variant.validate_port_letter(port)?.to_ascii_uppercase();
        let bytes = match register.code(variant)? {
            None => vec![upper, value],
            Some(code) => vec![code, upper, value],
        };
        Ok(Self::new(Opcode::WriteRegister(register), bytes))
    }

    /// Builds the board reset command.
    pub fn reset_board() -> Self {
        Self::new(
            Opcode::ResetBoard,
            vec![CMD_EEPROM, b'@', 0, CONFIRM[0], CONFIRM[1]],
        )
    }

    /// Builds the EEPROM write-enable command.
    pub fn eeprom_write_enable(variant: Variant) -> Result<Self> {
        require(variant, variant.capabilities().eeprom_control, "EEPROM write enable")?;
        Ok(Self::new(
            Opcode::EepromWriteEnable,
            vec![CMD_EEPROM, b'1', 0, CONFIRM[0], CONFIRM[1]],
        ))
    }

    /// Builds the EEPROM write-disable command.
    pub fn eeprom_write_disable(variant: Variant) -> Result<Self> {
        require(variant, variant.capabilities().eeprom_control, "EEPROM write disable")?;
        Ok(Self::new(
            Opcode::EepromWriteDisable,
            vec![CMD_EEPROM, b'0', 0, 0, 0],
        ))
    }

    /// Builds an EEPROM word erase; the word reads back as `0xFFFF`.
    pub fn eeprom_erase_word(variant: Variant, word_address: u8) -> Result<Self> {
        require(variant, variant.capabilities().eeprom_control, "EEPROM erase")?;
        Ok(Self::new(
            Opcode::EepromErase,
            vec![CMD_EEPROM, b'E', word_address, CONFIRM[0], CONFIRM[1]],
        ))
    }

    /// Builds an EEPROM word write.
    pub fn eeprom_write_word(word_address: u8, msb: u8, lsb: u8) -> Self {
        Self::new(
            Opcode::EepromWrite,
            vec![CMD_EEPROM, b'W', word_address, msb, lsb],
        )
    }

    /// Builds an EEPROM word read.
    pub fn eeprom_read_word(word_address: u8) -> Self {
        Self::new(
            Opcode::EepromRead,
            vec![CMD_EEPROM, b'R', word_address, 0, 0],
        )
    }

    /// Builds a command driving one pin high or low by flat pin number.
    pub fn set_pin(variant: Variant, pin: u8, high: bool) -> Result<Self> {
        require(variant, variant.capabilities().pin_control, "pin commands")?;
        let pin = variant.validate_line_number(pin)?;
        let (opcode, code) = if high {
            (Opcode::RaisePin, CMD_PIN_HIGH)
        } else {
            (Opcode::LowerPin, CMD_PIN_LOW)
        };
        Ok(Self::new(opcode, vec![code, pin]))
    }

    /// Builds the discovery broadcast payload.
    pub fn identify() -> Self {
        Self::new(Opcode::Identify, IDENTIFY_TAG.to_vec())
    }

    /// Builds an echo request for `byte`.
    pub fn echo_byte(variant: Variant, byte: u8) -> Result<Self> {
        require(variant, variant.capabilities().diagnostics, "echo")?;
        Ok(Self::new(Opcode::EchoByte, vec![CMD_ECHO, byte]))
    }

    /// Builds the host data request.
    pub fn host_data(variant: Variant) -> Result<Self> {
        require(variant, variant.capabilities().diagnostics, "host data")?;
        Ok(Self::new(Opcode::HostData, vec![CMD_HOST_DATA]))
    }

    /// Builds the send-space request.
    pub fn send_space(variant: Variant) -> Result<Self> {
        require(variant, variant.capabilities().diagnostics, "send space")?;
        Ok(Self::new(Opcode::SendSpace, vec![CMD_SPACE]))
    }

    /// Builds the command switching port A in or out of SPI mode.
    pub fn spi_mode(variant: Variant, enable: bool) -> Result<Self> {
        require(variant, variant.capabilities().spi, "SPI")?;
        let opcode = if enable {
            Opcode::SpiEnable
        } else {
            Opcode::SpiDisable
        };
        Ok(Self::new(opcode, vec![CMD_SPI, u8::from(enable), b'A']))
    }

    /// Builds an SPI transfer of `data` out of port A.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `data` is empty or longer than
    /// [`MAX_SPI_BYTES`].
    pub fn spi_send(variant: Variant, data: &[u8]) -> Result<Self> {
        require(variant, variant.capabilities().spi, "SPI")?;
        if data.is_empty() {
            return Err(EtherIoError::invalid_parameter("data", "must not be empty"));
        }
        if data.len() > MAX_SPI_BYTES {
            return Err(EtherIoError::invalid_parameter(
                "data",
                format!("must not exceed {} bytes", MAX_SPI_BYTES),
            ));
        }

        let mut bytes = Vec::with_capacity(3 + data.len());
        bytes.extend_from_slice(&[CMD_SPI, b'A', data.len() as u8]);
        bytes.extend_from_slice(data);
        Ok(Self::new(Opcode::SpiSend, bytes))
    }

    /// Returns the operation this command carries.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the raw datagram payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of reply bytes the board sends, `None` if it sends nothing.
    pub fn reply_len(&self) -> Option<usize> {
        self.opcode.reply_len()
    }
}

fn require(variant: Variant, supported: bool, operation: &'static str) -> Result<()> {
    if supported {
        Ok(())
    } else {
        Err(EtherIoError::unsupported(variant, operation))
    }
}
