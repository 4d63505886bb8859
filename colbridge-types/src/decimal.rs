//! Fixed-point decimal values.
//!
//! A [`DecimalValue`] is a scaled 128-bit integer: the number `12345.67` is held
//! as the integer `1234567` with scale `2`. The engine's DECIMAL(width, scale)
//! columns store the same scaled integer in the smallest of 32, 64 or 128 bits
//! that holds `width` digits (see [`crate::DecimalStorage`]).

use std::fmt;
use std::str::FromStr;

use crate::constants::MAX_DECIMAL_WIDTH;

/// Errors that can occur while manipulating decimal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// Requested scale falls outside the supported range.
    ScaleOutOfRange { scale: u32 },
    /// Value has more digits than any DECIMAL width can hold.
    PrecisionOverflow { value: i128, scale: u8 },
    /// Arithmetic overflowed the 128-bit range.
    Overflow,
    /// Lowering the scale would drop non-zero digits.
    InexactRescale { from: u8, to: u8 },
    /// Text could not be parsed as a decimal literal.
    InvalidLiteral(String),
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::ScaleOutOfRange { scale } => {
                write!(f, "decimal scale {scale} outside supported range")
            }
            DecimalError::PrecisionOverflow { value, scale } => write!(
                f,
                "decimal value {value} with scale {scale} exceeds maximum precision"
            ),
            DecimalError::Overflow => write!(f, "decimal arithmetic overflow"),
            DecimalError::InexactRescale { from, to } => write!(
                f,
                "cannot rescale decimal from scale {from} to {to} without losing precision"
            ),
            DecimalError::InvalidLiteral(text) => write!(f, "invalid decimal literal '{text}'"),
        }
    }
}

impl std::error::Error for DecimalError {}

/// Exact decimal number stored as a scaled integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    value: i128,
    scale: u8,
}

impl DecimalValue {
    /// Create a decimal from its raw parts, validating precision bounds.
    pub fn new(value: i128, scale: u8) -> Result<Self, DecimalError> {
        if scale > MAX_DECIMAL_WIDTH {
            return Err(DecimalError::ScaleOutOfRange {
                scale: u32::from(scale),
            });
        }
        if digit_count(value) > MAX_DECIMAL_WIDTH {
            return Err(DecimalError::PrecisionOverflow { value, scale });
        }
        Ok(Self { value, scale })
    }

    /// The scaled integer backing this decimal.
    #[inline]
    pub fn raw_value(self) -> i128 {
        self.value
    }

    /// Number of fractional digits.
    #[inline]
    pub fn scale(self) -> u8 {
        self.scale
    }

    /// Total digit count of the scaled integer.
    #[inline]
    pub fn precision(self) -> u8 {
        digit_count(self.value)
    }

    /// Return the same number expressed with `scale` fractional digits.
    ///
    /// Raising the scale always succeeds unless the result overflows. Lowering it
    /// only succeeds when the dropped digits are all zero.
    pub fn rescale(self, scale: u8) -> Result<Self, DecimalError> {
        if scale == self.scale {
            return Ok(self);
        }
        if scale > self.scale {
            let factor = pow10(u32::from(scale - self.scale))?;
            let value = self
                .value
                .checked_mul(factor)
                .ok_or(DecimalError::Overflow)?;
            return Self::new(value, scale);
        }
        let factor = pow10(u32::from(self.scale - scale))?;
        if self.value % factor != 0 {
            return Err(DecimalError::InexactRescale {
                from: self.scale,
                to: scale,
            });
        }
        Self::new(self.value / factor, scale)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.value);
        }
        let digits = self.value.unsigned_abs().to_string();
        let scale = usize::from(self.scale);
        if self.value < 0 {
            f.write_str("-")?;
        }
        if digits.len() <= scale {
            f.write_str("0.")?;
            for _ in digits.len()..scale {
                f.write_str("0")?;
            }
            return f.write_str(&digits);
        }
        let split = digits.len() - scale;
        f.write_str(&digits[..split])?;
        f.write_str(".")?;
        f.write_str(&digits[split..])
    }
}

impl FromStr for DecimalValue {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::InvalidLiteral(s.to_string()));
        }
        let scale = u8::try_from(frac_part.len())
            .ok()
            .filter(|scale| *scale <= MAX_DECIMAL_WIDTH)
            .ok_or(DecimalError::ScaleOutOfRange {
                scale: u32::try_from(frac_part.len()).unwrap_or(u32::MAX),
            })?;

        let combined = format!("{int_part}{frac_part}");
        let value = combined
            .parse::<i128>()
            .map_err(|_| DecimalError::InvalidLiteral(s.to_string()))?;
        Self::new(value, scale)
    }
}

fn pow10(exp: u32) -> Result<i128, DecimalError> {
    10_i128.checked_pow(exp).ok_or(DecimalError::Overflow)
}

fn digit_count(value: i128) -> u8 {
    let mut remaining = value.unsigned_abs();
    let mut count: u8 = 1;
    while remaining >= 10 {
        remaining /= 10;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for text in ["12345.67", "-0.05", "0.5", "42", "-17.250"] {
            let value: DecimalValue = text.parse().unwrap();
            assert_eq!(value.to_string(), text);
        }
        let value: DecimalValue = "123.456".parse().unwrap();
        assert_eq!(value.raw_value(), 123_456);
        assert_eq!(value.scale(), 3);
        assert_eq!(value.precision(), 6);
    }

    #[test]
    fn rescale_up_and_down() {
        let value = DecimalValue::new(15, 1).unwrap();
        let up = value.rescale(3).unwrap();
        assert_eq!(up.raw_value(), 1_500);
        assert_eq!(up.rescale(1).unwrap(), value);
        assert_eq!(
            DecimalValue::new(1_501, 3).unwrap().rescale(1),
            Err(DecimalError::InexactRescale { from: 3, to: 1 })
        );
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(DecimalValue::new(i128::MAX, 0).is_err());
        assert!(DecimalValue::new(1, 39).is_err());
        assert!("1.2.3".parse::<DecimalValue>().is_err());
        assert!("abc".parse::<DecimalValue>().is_err());
    }
}
