/// Fixed-point number encoding used by the sensor's registers
///
/// A value is stored as a little-endian integer part of 1-4 bytes, optionally
/// followed by one byte holding the fractional digits. For signed formats
/// the top bit of the most significant integer byte is a sign flag, not part
/// of a two's complement representation.
use std::fmt;

use crate::sensor::error::CodecError;

const SIGN_BIT: u8 = 0x80;

// Relative nudge applied to the fractional digits before truncation. Absorbs
// binary representation error so that decimal inputs such as 21.15 keep
// their last digit.
const TRUNCATION_TOLERANCE: f64 = 1e-14;

/// Widest integer part the device uses.
pub const MAX_INTEGER_BYTES: usize = 4;

/// Byte layout of a single fixed-point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPointFormat {
    pub signed: bool,
    pub integer_bytes: usize,
    pub fraction_digits: u32,
}

impl FixedPointFormat {
    pub const fn signed(integer_bytes: usize, fraction_digits: u32) -> Self {
        Self {
            signed: true,
            integer_bytes,
            fraction_digits,
        }
    }

    pub const fn unsigned(integer_bytes: usize, fraction_digits: u32) -> Self {
        Self {
            signed: false,
            integer_bytes,
            fraction_digits,
        }
    }

    pub const fn has_fraction(&self) -> bool {
        self.fraction_digits > 0
    }

    /// Number of bytes one encoded value occupies.
    pub const fn width(&self) -> usize {
        self.integer_bytes + if self.has_fraction() { 1 } else { 0 }
    }

    /// Whether the layout can be encoded at all.
    pub const fn is_valid(&self) -> bool {
        self.integer_bytes >= 1 && self.integer_bytes <= MAX_INTEGER_BYTES
    }

    pub(crate) fn check(&self) -> Result<(), CodecError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CodecError::InvalidFormat(*self))
        }
    }

    /// Largest integer magnitude the integer bytes can hold.
    /// Only meaningful for a valid format.
    fn max_magnitude(&self) -> u64 {
        let bits = self.integer_bytes * 8 - usize::from(self.signed);
        (1u64 << bits) - 1
    }
}

impl fmt::Display for FixedPointFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.signed { "signed" } else { "unsigned" };
        write!(f, "{}({},{})", kind, self.integer_bytes, self.fraction_digits)
    }
}

/// Decode one value from the start of `bytes`.
pub fn decode(format: &FixedPointFormat, bytes: &[u8]) -> Result<f64, CodecError> {
    format.check()?;
    let width = format.width();
    if bytes.len() < width {
        return Err(CodecError::BufferUnderrun {
            needed: width,
            remaining: bytes.len(),
        });
    }
    let (integer, rest) = bytes.split_at(format.integer_bytes);
    Ok(decode_parts(format, integer, rest.first().copied()))
}

/// Combine an integer sub-block with its (optional) fractional byte.
///
/// Used directly by the striped frame reader, where the two halves of a
/// value are not adjacent. `format` must be valid.
pub(crate) fn decode_parts(format: &FixedPointFormat, integer: &[u8], fraction: Option<u8>) -> f64 {
    let mut negative = false;
    let mut magnitude: u64 = 0;

    for (index, &byte) in integer.iter().enumerate() {
        let mut byte = byte;
        if format.signed && index + 1 == integer.len() && byte & SIGN_BIT != 0 {
            negative = true;
            byte &= !SIGN_BIT;
        }
        magnitude |= u64::from(byte) << (8 * index);
    }

    let mut value = magnitude as f64;
    if let (true, Some(fraction)) = (format.has_fraction(), fraction) {
        value += f64::from(fraction) / 10f64.powi(format.fraction_digits as i32);
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Encode `value` into the byte layout described by `format`.
///
/// The integer part is `trunc(|value|)` and is range checked as is. The
/// fractional digits are truncated to the format's resolution and never
/// carry into the integer part. Values that do not fit, including negative
/// values for an unsigned format, are rejected rather than wrapped.
pub fn encode(format: &FixedPointFormat, value: f64) -> Result<Vec<u8>, CodecError> {
    let out_of_range = || CodecError::EncodingRange {
        value,
        format: *format,
    };

    if !format.is_valid() || !value.is_finite() {
        return Err(out_of_range());
    }

    let magnitude = value.abs();
    let integer_part = magnitude.trunc();
    if integer_part > format.max_magnitude() as f64 {
        return Err(out_of_range());
    }
    let integer = integer_part as u64;

    let fraction = if format.has_fraction() {
        let scale = 10u64
            .checked_pow(format.fraction_digits)
            .ok_or_else(out_of_range)? as f64;
        let scaled = (magnitude * scale * (1.0 + TRUNCATION_TOLERANCE)).floor();
        (scaled - integer_part * scale).clamp(0.0, scale - 1.0) as u64
    } else {
        0
    };
    if fraction > u64::from(u8::MAX) {
        return Err(out_of_range());
    }

    // Anything that truncates to zero is encoded as plain zero.
    let negative = value < 0.0 && (integer > 0 || fraction > 0);
    if negative && !format.signed {
        return Err(out_of_range());
    }

    let mut bytes: Vec<u8> = (0..format.integer_bytes)
        .map(|index| (integer >> (8 * index)) as u8)
        .collect();

    if negative {
        if let Some(last) = bytes.last_mut() {
            *last |= SIGN_BIT;
        }
    }

    if format.has_fraction() {
        bytes.push(fraction as u8);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn encodes_negative_temperature_with_sign_flag() {
        let format = FixedPointFormat::signed(1, 1);
        let bytes = encode(&format, -21.5).unwrap();
        assert_eq!(bytes, vec![0x95, 0x05]);
        assert_close(decode(&format, &bytes).unwrap(), -21.5);
    }

    #[test]
    fn decodes_little_endian_integer_bytes() {
        let format = FixedPointFormat::unsigned(4, 0);
        let value = decode(&format, &[0x40, 0x8C, 0x01, 0x00]).unwrap();
        assert_close(value, 101_440.0);
    }

    #[test]
    fn sign_bit_is_only_the_top_bit_of_the_last_byte() {
        let format = FixedPointFormat::signed(2, 0);
        assert_close(decode(&format, &[0x80, 0x00]).unwrap(), 128.0);
        assert_close(decode(&format, &[0x01, 0x81]).unwrap(), -257.0);
    }

    #[test]
    fn round_trips_representable_values() {
        let cases = [
            (FixedPointFormat::signed(1, 1), vec![-127.9, -21.5, -0.1, 0.0, 0.4, 22.3, 127.9]),
            (FixedPointFormat::unsigned(1, 2), vec![0.0, 0.01, 45.67, 99.99, 255.99]),
            (FixedPointFormat::unsigned(2, 2), vec![0.0, 21.15, 1234.56, 65_535.99]),
            (FixedPointFormat::unsigned(2, 1), vec![0.0, 75.0, 412.3, 65_535.9]),
            (FixedPointFormat::unsigned(4, 0), vec![0.0, 1.0, 101_325.0, 4_294_967_295.0]),
            (FixedPointFormat::signed(4, 2), vec![-2_147_483_647.0, -3.07, 3.07]),
        ];

        for (format, values) in cases {
            for value in values {
                let bytes = encode(&format, value).unwrap();
                assert_eq!(bytes.len(), format.width());
                assert_close(decode(&format, &bytes).unwrap(), value);
            }
        }
    }

    #[test]
    fn truncates_below_resolution() {
        let format = FixedPointFormat::unsigned(1, 1);
        assert_eq!(encode(&format, 12.39).unwrap(), vec![12, 3]);
    }

    #[test]
    fn zero_has_no_sign_flag() {
        let format = FixedPointFormat::signed(1, 1);
        assert_eq!(encode(&format, 0.0).unwrap(), vec![0, 0]);
        assert_eq!(encode(&format, -0.0).unwrap(), vec![0, 0]);
        assert_eq!(encode(&format, -0.04).unwrap(), vec![0, 0]);
    }

    #[test]
    fn rejects_integer_overflow() {
        let unsigned = FixedPointFormat::unsigned(1, 0);
        assert!(matches!(
            encode(&unsigned, 256.0),
            Err(CodecError::EncodingRange { .. })
        ));

        let signed = FixedPointFormat::signed(1, 1);
        assert!(matches!(
            encode(&signed, -128.0),
            Err(CodecError::EncodingRange { .. })
        ));
        assert!(encode(&signed, 127.0).is_ok());
    }

    #[test]
    fn rejects_fractions_wider_than_a_byte() {
        let format = FixedPointFormat::unsigned(1, 3);
        assert_eq!(encode(&format, 1.255).unwrap(), vec![1, 255]);
        assert!(matches!(
            encode(&format, 1.256),
            Err(CodecError::EncodingRange { .. })
        ));
    }

    #[test]
    fn unsigned_format_rejects_negative_values() {
        let format = FixedPointFormat::unsigned(2, 2);
        assert!(matches!(
            encode(&format, -5.25),
            Err(CodecError::EncodingRange { .. })
        ));
        assert!(matches!(
            encode(&FixedPointFormat::unsigned(1, 0), -1.0),
            Err(CodecError::EncodingRange { .. })
        ));
        // Truncates to zero, so there is nothing negative left to encode.
        assert_eq!(encode(&format, -0.001).unwrap(), vec![0, 0, 0]);
        assert_eq!(encode(&format, -0.0).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn integer_part_is_range_checked_before_rounding() {
        let whole = FixedPointFormat::unsigned(1, 0);
        assert_eq!(encode(&whole, 255.99999999999997).unwrap(), vec![255]);
        assert!(encode(&whole, 256.0).is_err());

        let fractional = FixedPointFormat::unsigned(1, 2);
        assert_eq!(encode(&fractional, 255.99999999999997).unwrap(), vec![255, 99]);

        let signed = FixedPointFormat::signed(1, 1);
        assert_eq!(encode(&signed, -127.99999999999999).unwrap(), vec![0xFF, 9]);
    }

    #[test]
    fn keeps_last_decimal_digit() {
        let format = FixedPointFormat::unsigned(2, 2);
        assert_eq!(encode(&format, 21.15).unwrap(), vec![21, 0, 15]);
        assert_eq!(encode(&format, 0.29).unwrap(), vec![0, 0, 29]);
    }

    #[test]
    fn rejects_unsupported_integer_widths() {
        for format in [
            FixedPointFormat::signed(0, 1),
            FixedPointFormat::unsigned(0, 0),
            FixedPointFormat::unsigned(5, 0),
            FixedPointFormat::signed(8, 2),
        ] {
            assert!(!format.is_valid());
            assert!(matches!(
                encode(&format, 1.0),
                Err(CodecError::EncodingRange { .. })
            ));
            assert_eq!(
                decode(&format, &[0; 16]),
                Err(CodecError::InvalidFormat(format))
            );
        }
    }

    #[test]
    fn rejects_non_finite_values() {
        let format = FixedPointFormat::unsigned(2, 0);
        assert!(encode(&format, f64::NAN).is_err());
        assert!(encode(&format, f64::INFINITY).is_err());
    }

    #[test]
    fn decode_reports_short_input() {
        let format = FixedPointFormat::unsigned(2, 2);
        assert_eq!(
            decode(&format, &[1, 2]),
            Err(CodecError::BufferUnderrun {
                needed: 3,
                remaining: 2
            })
        );
    }
}
