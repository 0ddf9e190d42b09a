/// Positional grammar and checksum validation for multisensor telegrams
///
/// A telegram is exactly 40 bytes, for example
/// `W+07.6016300N99901.2N?151515151515?1889` followed by ETX (0x03):
/// - Byte 0: `W`
/// - Byte 1: temperature sign, `+` or `-`
/// - Bytes 2-5: temperature magnitude, `DD.D`
/// - Bytes 6-7, 8-9, 10-11: sun exposure from south, west and east, `DD`
/// - Byte 12: obscurity, `J` when pitch black, `N` otherwise
/// - Bytes 13-15: dawn level, `DDD`
/// - Bytes 16-19: wind speed, `DD.D`
/// - Byte 20: rain, `J` when raining, `N` otherwise
/// - Bytes 21-34: the constant `?151515151515?`
/// - Bytes 35-38: checksum, decimal sum of bytes 0-34
/// - Byte 39: ETX
use bitflags::bitflags;
use std::fmt;
use std::ops::Range;

use crate::serial::reader::RawFrame;

pub const TELEGRAM_LEN: usize = 40;

const PATTERN: &[u8] = b"?151515151515?";
const PATTERN_RANGE: Range<usize> = 21..35;
const CHECKSUM_RANGE: Range<usize> = 35..39;

bitflags! {
    /// Defects found in a rejected frame, one bit per grammar rule
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValidationError: u16 {
        const LENGTH = 0x0001;
        const PREFIX = 0x0002;
        const SIGN = 0x0004;
        const TEMPERATURE = 0x0008;
        const SUN_SOUTH = 0x0010;
        const SUN_WEST = 0x0020;
        const SUN_EAST = 0x0040;
        const OBSCURITY = 0x0080;
        const DAWN = 0x0100;
        const WIND = 0x0200;
        const RAIN = 0x0400;
        const PATTERN = 0x0800;
        const CHECKSUM_DIGITS = 0x1000;
        const CHECKSUM = 0x2000;
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.bits())
    }
}

impl std::error::Error for ValidationError {}

/// A frame that passed every rule
///
/// Only `validate` constructs this, so decoding never has to re-check
/// the layout.
#[derive(Debug, Clone, Copy)]
pub struct ValidTelegram<'a> {
    pub(crate) bytes: &'a [u8; TELEGRAM_LEN],
}

fn digits_at(bytes: &[u8], range: Range<usize>) -> bool {
    bytes
        .get(range)
        .is_some_and(|field| field.iter().all(u8::is_ascii_digit))
}

fn one_of_at(bytes: &[u8], pos: usize, allowed: &[u8]) -> bool {
    bytes.get(pos).is_some_and(|b| allowed.contains(b))
}

/// `DD.D` starting at `start`
fn fixed_point_at(bytes: &[u8], start: usize) -> bool {
    digits_at(bytes, start..start + 2)
        && one_of_at(bytes, start + 2, b".")
        && digits_at(bytes, start + 3..start + 4)
}

/// Decimal value of the digits in `field`; any `.` is skipped
pub(crate) fn decimal_value(field: &[u8]) -> u32 {
    field
        .iter()
        .filter(|b| b.is_ascii_digit())
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Sum of the raw bytes that the checksum field covers
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(PATTERN_RANGE.end)
        .map(|&b| u32::from(b))
        .sum()
}

/// Check a raw frame against the telegram grammar
///
/// Every rule is evaluated, so a badly damaged frame reports all of its
/// defects at once. Positions beyond the end of a short frame fail their
/// rule.
///
/// # Returns
/// The validated telegram, or the mask of every failed rule
pub fn validate(frame: &RawFrame) -> Result<ValidTelegram<'_>, ValidationError> {
    let bytes = frame.as_bytes();
    let mut err = ValidationError::empty();

    if bytes.len() != TELEGRAM_LEN || !frame.is_terminated() {
        err |= ValidationError::LENGTH;
    }
    if !one_of_at(bytes, 0, b"W") {
        err |= ValidationError::PREFIX;
    }
    if !one_of_at(bytes, 1, b"+-") {
        err |= ValidationError::SIGN;
    }
    if !fixed_point_at(bytes, 2) {
        err |= ValidationError::TEMPERATURE;
    }
    if !digits_at(bytes, 6..8) {
        err |= ValidationError::SUN_SOUTH;
    }
    if !digits_at(bytes, 8..10) {
        err |= ValidationError::SUN_WEST;
    }
    if !digits_at(bytes, 10..12) {
        err |= ValidationError::SUN_EAST;
    }
    if !one_of_at(bytes, 12, b"JN") {
        err |= ValidationError::OBSCURITY;
    }
    if !digits_at(bytes, 13..16) {
        err |= ValidationError::DAWN;
    }
    if !fixed_point_at(bytes, 16) {
        err |= ValidationError::WIND;
    }
    if !one_of_at(bytes, 20, b"JN") {
        err |= ValidationError::RAIN;
    }
    if bytes.get(PATTERN_RANGE) != Some(PATTERN) {
        err |= ValidationError::PATTERN;
    }

    // Malformed digits leave nothing to compare against
    if !digits_at(bytes, CHECKSUM_RANGE) {
        err |= ValidationError::CHECKSUM_DIGITS | ValidationError::CHECKSUM;
    } else if checksum(bytes) != decimal_value(&bytes[CHECKSUM_RANGE]) {
        err |= ValidationError::CHECKSUM;
    }

    if !err.is_empty() {
        return Err(err);
    }

    bytes
        .try_into()
        .map(|bytes| ValidTelegram { bytes })
        .map_err(|_| ValidationError::LENGTH)
}
