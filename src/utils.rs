//! Bit and word helpers.
//!
//! Port registers are single bytes with line 0 in the least significant bit.
//! EEPROM words travel as separate most/least significant bytes.
//!
//! # Example
//!
//! ```
//! use ether_io::utils::{get_line, set_line, split_word, word_from_bytes};
//!
//! let value = set_line(0, 7, true).unwrap();
//! assert_eq!(value, 0b1000_0000);
//! assert_eq!(get_line(value, 7), Some(true));
//! assert_eq!(get_line(value, 8), None);
//!
//! assert_eq!(split_word(0xBEEF), (0xBE, 0xEF));
//! assert_eq!(word_from_bytes(0xBE, 0xEF), 0xBEEF);
//! ```

/// Bit mask of one line, `None` past line 7.
#[inline]
pub fn line_mask(line: u8) -> Option<u8> {
    1u8.checked_shl(u32::from(line))
}

/// Gets one line from a port byte.
///
/// # Arguments
///
/// * `value` - Port register value
/// * `line` - Line within the port (0-7, where 0 is LSB)
///
/// Returns `None` if `line` is greater than 7.
#[inline]
pub fn get_line(value: u8, line: u8) -> Option<bool> {
    line_mask(line).map(|mask| value & mask != 0)
}

/// Sets or clears one line in a port byte.
///
/// `state = true` ORs in `1 << line`; `state = false` ANDs with its
/// complement. Returns `None` if `line` is greater than 7.
///
/// # Example
///
/// ```
/// use ether_io::utils::set_line;
///
/// assert_eq!(set_line(0, 0, true), Some(1));
/// assert_eq!(set_line(1, 1, true), Some(3));
/// assert_eq!(set_line(255, 0, false), Some(254));
/// assert_eq!(set_line(255, 8, false), None);
/// ```
#[inline]
pub fn set_line(value: u8, line: u8, state: bool) -> Option<u8> {
    let mask = line_mask(line)?;
    Some(if state { value | mask } else { value & !mask })
}

/// Joins two bytes into a big-endian word.
#[inline]
pub fn word_from_bytes(msb: u8, lsb: u8) -> u16 {
    u16::from_be_bytes([msb, lsb])
}

/// Splits a word into `(msb, lsb)`.
#[inline]
pub fn split_word(word: u16) -> (u8, u8) {
    let [msb, lsb] = word.to_be_bytes();
    (msb, lsb)
}

/// Returns the indices of the lines that are on, lowest first.
///
/// # Example
///
/// ```
/// use ether_io::utils::get_on_lines;
///
/// assert_eq!(get_on_lines(0b1000_0011), vec![0, 1, 7]);
/// ```
pub fn get_on_lines(value: u8) -> Vec<u8> {
    (0..8)
        .filter(|&line| get_line(value, line) == Some(true))
        .collect()
}
