//! Board variants and their capability tables.
//!
//! Every Ether I/O board speaks the same byte-oriented command set, but the
//! boards differ in how many ports they expose, which register letter holds
//! the pull-up setting and which optional command groups they understand.
//! Those differences are data: each [`Variant`] maps to a static
//! [`Capabilities`] record that the codec consults before building a command.
//!
//! # Variants Overview
//!
//! | Variant | Ports | Lines | Pull-up | Threshold/Schmitt | EEPROM control | Pins | SPI | Diagnostics |
//! |---------|:-----:|:-----:|:-------:|:-----------------:|:--------------:|:----:|:---:|:-----------:|
//! | IO24    | a..c  | 0..23 | `@`     | ✓ | ✓ | ✗ | ✗ | ✓ |
//! | IO24R   | a..c  | 0..23 | `@`     | ✓ | ✓ | ✗ | ✓ | ✗ |
//! | IO24TPC | a..c  | 0..23 | `%`     | ✗ | ✗ | ✓ | ✗ | ✗ |
//! | IO72TPC | a..i  | 0..71 | `%`     | ✗ | ✗ | ✓ | ✗ | ✗ |
//!
//! # Example
//!
//! ```
//! use ether_io::Variant;
//!
//! assert!(Variant::Io24.validate_port_letter('C').is_ok());
//! assert!(Variant::Io24.validate_port_letter('d').is_err());
//! assert!(Variant::Io72Tpc.validate_port_letter('i').is_ok());
//!
//! assert_eq!(Variant::Io24Tpc.capabilities().pull_up_code, b'%');
//! ```

use crate::error::{EtherIoError, Result};

/// Static description of what a board variant understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Last valid port letter (lower case); ports always start at `a`.
    pub last_port: char,
    /// Highest valid flat line number.
    pub last_line: u8,
    /// Register code of the pull-up register.
    pub pull_up_code: u8,
    /// Threshold and Schmitt trigger registers.
    pub input_conditioning: bool,
    /// EEPROM write enable/disable and word erase.
    pub eeprom_control: bool,
    /// Raise/lower a single pin by flat number.
    pub pin_control: bool,
    /// Port A SPI mode.
    pub spi: bool,
    /// Echo byte, host data and space commands.
    pub diagnostics: bool,
}

const IO24: Capabilities = Capabilities {
    last_port: 'c',
    last_line: 23,
    pull_up_code: b'@',
    input_conditioning: true,
    eeprom_control: true,
    pin_control: false,
    spi: false,
    diagnostics: true,
};

const IO24R: Capabilities = Capabilities {
    diagnostics: false,
    spi: true,
    ..IO24
};

const IO24TPC: Capabilities = Capabilities {
    last_port: 'c',
    last_line: 23,
    pull_up_code: b'%',
    input_conditioning: false,
    eeprom_control: false,
    pin_control: true,
    spi: false,
    diagnostics: false,
};

const IO72TPC: Capabilities = Capabilities {
    last_port: 'i',
    last_line: 71,
    ..IO24TPC
};

/// Ether I/O board family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// IO24 and IO24F: 24 lines, common command set plus diagnostics.
    Io24,
    /// IO24R: 24 lines, common command set plus port A SPI.
    Io24R,
    /// IO24TPC: 24 lines, `%` pull-up register and pin commands.
    Io24Tpc,
    /// IO72TPC: 72 lines over ports a..i.
    Io72Tpc,
}

impl Variant {
    /// All known variants.
    pub const ALL: [Variant; 4] = [
        Variant::Io24,
        Variant::Io24R,
        Variant::Io24Tpc,
        Variant::Io72Tpc,
    ];

    /// Returns the capability table for this variant.
    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            Variant::Io24 => &IO24,
            Variant::Io24R => &IO24R,
            Variant::Io24Tpc => &IO24TPC,
            Variant::Io72Tpc => &IO72TPC,
        }
    }

    /// Number of ports on the board.
    pub fn port_count(self) -> u8 {
        self.capabilities().last_port as u8 - b'a' + 1
    }

    /// Number of lines on the board.
    pub fn line_count(self) -> u16 {
        u16::from(self.capabilities().last_line) + 1
    }

    /// Checks a port letter (either case) against this variant.
    ///
    /// Returns the lower-case ASCII byte of the port on success.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::InvalidPort` naming the letter and the valid
    /// range.
    ///
    /// # Example
    ///
    /// ```
    /// use ether_io::Variant;
    ///
    /// assert_eq!(Variant::Io24.validate_port_letter('B').unwrap(), b'b');
    /// ```
    pub fn validate_port_letter(self, letter: char) -> Result<u8> {
        let last = self.capabilities().last_port;
        let lower = letter.to_ascii_lowercase();
        if ('a'..=last).contains(&lower) {
            Ok(lower as u8)
        } else {
            Err(EtherIoError::InvalidPort {
                letter,
                first: 'a',
                last,
            })
        }
    }

    /// Checks a flat line number against this variant.
    ///
    /// # Errors
    ///
    /// Returns `EtherIoError::InvalidLine` naming the line and the highest
    /// valid line.
    pub fn validate_line_number(self, line: u8) -> Result<u8> {
        let max = self.capabilities().last_line;
        if line <= max {
            Ok(line)
        } else {
            Err(EtherIoError::InvalidLine { line, max })
        }
    }

    /// Product name as printed on the board.
    pub fn name(self) -> &'static str {
        match self {
            Variant::Io24 => "IO24",
            Variant::Io24R => "IO24R",
            Variant::Io24Tpc => "IO24TPC",
            Variant::Io72Tpc => "IO72TPC",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_ranges() {
        for letter in ['a', 'b', 'c', 'A', 'B', 'C'] {
            assert!(Variant::Io24.validate_port_letter(letter).is_ok());
            assert!(Variant::Io24Tpc.validate_port_letter(letter).is_ok());
        }
        for letter in ['d', 'i', 'z', '@', '1', 'é'] {
            assert!(Variant::Io24.validate_port_letter(letter).is_err());
        }
        for letter in 'a'..='i' {
            assert!(Variant::Io72Tpc.validate_port_letter(letter).is_ok());
        }
        assert!(Variant::Io72Tpc.validate_port_letter('j').is_err());
        assert!(Variant::Io72Tpc.validate_port_letter('J').is_err());
    }

    #[test]
    fn test_port_error_names_letter() {
        let err = Variant::Io24.validate_port_letter('X').unwrap_err();
        match err {
            EtherIoError::InvalidPort { letter, first, last } => {
                assert_eq!(letter, 'X');
                assert_eq!(first, 'a');
                assert_eq!(last, 'c');
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err_message(Variant::Io72Tpc, 'k').contains("\"k\""));
    }

    fn err_message(variant: Variant, letter: char) -> String {
        variant.validate_port_letter(letter).unwrap_err().to_string()
    }

    #[test]
    fn test_line_ranges() {
        assert!(Variant::Io24.validate_line_number(0).is_ok());
        assert!(Variant::Io24.validate_line_number(23).is_ok());
        assert!(Variant::Io24.validate_line_number(24).is_err());
        assert!(Variant::Io24R.validate_line_number(255).is_err());
        assert!(Variant::Io72Tpc.validate_line_number(71).is_ok());
        assert!(Variant::Io72Tpc.validate_line_number(72).is_err());
    }

    #[test]
    fn test_counts() {
        assert_eq!(Variant::Io24.port_count(), 3);
        assert_eq!(Variant::Io72Tpc.port_count(), 9);
        assert_eq!(Variant::Io24.line_count(), 24);
        assert_eq!(Variant::Io72Tpc.line_count(), 72);
    }

    #[test]
    fn test_pull_up_codes() {
        assert_eq!(Variant::Io24.capabilities().pull_up_code, b'@');
        assert_eq!(Variant::Io24R.capabilities().pull_up_code, b'@');
        assert_eq!(Variant::Io24Tpc.capabilities().pull_up_code, b'%');
        assert_eq!(Variant::Io72Tpc.capabilities().pull_up_code, b'%');
    }

    #[test]
    fn test_optional_groups() {
        assert!(Variant::Io24.capabilities().diagnostics);
        assert!(!Variant::Io24R.capabilities().diagnostics);
        assert!(Variant::Io24R.capabilities().spi);
        assert!(Variant::Io72Tpc.capabilities().pin_control);
        assert!(!Variant::Io72Tpc.capabilities().input_conditioning);
    }

    #[test]
    fn test_display() {
        let names: Vec<String> = Variant::ALL.iter().map(|v| v.to_string()).collect();
        assert_eq!(names, ["IO24", "IO24R", "IO24TPC", "IO72TPC"]);
    }
}
