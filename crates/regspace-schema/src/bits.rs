//! Bit-range notation and field auto-placement.

use std::fmt;

use crate::error::{ResolveError, Result};
use crate::normalize::FieldPlacement;

/// Why a bit-range string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitRangeError {
    /// Missing brackets or stray characters.
    Malformed(String),
    /// A bound is not a non-negative decimal integer.
    BadBound(String),
    /// `msb` is below `lsb`.
    Reversed { msb: u32, lsb: u32 },
    /// A bound lies past the last bit of the widest register.
    BeyondWidest(u32),
}

/// Highest bit index any register can have.
pub const MAX_BIT: u32 = 63;

impl fmt::Display for BitRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitRangeError::Malformed(text) => {
                write!(f, "malformed bit range '{text}', expected \"[msb:lsb]\" or \"[n]\"")
            }
            BitRangeError::BadBound(bound) => write!(f, "invalid bit bound '{bound}'"),
            BitRangeError::Reversed { msb, lsb } => {
                write!(f, "bit range [{msb}:{lsb}] has msb below lsb")
            }
            BitRangeError::BeyondWidest(bit) => {
                write!(f, "bit {bit} is past bit {MAX_BIT} of the widest register")
            }
        }
    }
}

impl std::error::Error for BitRangeError {}

fn parse_bound(text: &str) -> std::result::Result<u32, BitRangeError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BitRangeError::BadBound(text.to_string()));
    }
    text.parse()
        .map_err(|_| BitRangeError::BadBound(text.to_string()))
}

/// Parse `"[msb:lsb]"` or `"[n]"` into `(bit_offset, bit_width)`.
///
/// Brackets are required; whitespace inside them is ignored.
pub fn parse_bit_range(text: &str) -> std::result::Result<(u32, u32), BitRangeError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| BitRangeError::Malformed(text.to_string()))?;
    let (msb, lsb) = match inner.split_once(':') {
        Some((msb, lsb)) => (parse_bound(msb)?, parse_bound(lsb)?),
        None => {
            let bit = parse_bound(inner)?;
            (bit, bit)
        }
    };
    if msb > MAX_BIT {
        return Err(BitRangeError::BeyondWidest(msb));
    }
    if msb < lsb {
        return Err(BitRangeError::Reversed { msb, lsb });
    }
    Ok((lsb, msb - lsb + 1))
}

/// Assigns bit positions to a register's fields in declaration order.
///
/// Fields without a range or explicit offset start at the cursor, and every
/// placed field moves the cursor past its last bit.
#[derive(Debug, Default)]
pub struct FieldPlacer {
    cursor: u32,
}

impl FieldPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Resolve one field's placement to `(bit_offset, bit_width)`.
    pub fn place(&mut self, placement: &FieldPlacement, path: &str) -> Result<(u32, u32)> {
        let (offset, width) = match placement {
            FieldPlacement::Range(text) => {
                parse_bit_range(text).map_err(|e| ResolveError::format(path, e.to_string()))?
            }
            FieldPlacement::Explicit { offset, width } => (*offset, *width),
            FieldPlacement::Auto { width } => (self.cursor, *width),
        };
        if width == 0 {
            return Err(ResolveError::format(path, "bit width must be at least 1"));
        }
        self.cursor = self.cursor.max(offset.saturating_add(width));
        Ok((offset, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(parse_bit_range("[7:4]"), Ok((4, 4)));
        assert_eq!(parse_bit_range("[0:0]"), Ok((0, 1)));
        assert_eq!(parse_bit_range("[31:0]"), Ok((0, 32)));
        assert_eq!(parse_bit_range(" [ 15 : 8 ] "), Ok((8, 8)));
        assert_eq!(parse_bit_range("[5]"), Ok((5, 1)));
    }

    #[test]
    fn reversed_range_rejected() {
        assert_eq!(
            parse_bit_range("[3:7]"),
            Err(BitRangeError::Reversed { msb: 3, lsb: 7 })
        );
    }

    #[test]
    fn malformed_ranges_rejected() {
        for text in ["7:4", "[7:4", "[a:0]", "[-1:0]", "[]", "[4:]", "[1:2:3]"] {
            assert!(parse_bit_range(text).is_err(), "{text}");
        }
    }

    #[test]
    fn bounds_past_bit_63_rejected() {
        assert_eq!(
            parse_bit_range("[4294967295:0]"),
            Err(BitRangeError::BeyondWidest(u32::MAX))
        );
        assert_eq!(parse_bit_range("[64]"), Err(BitRangeError::BeyondWidest(64)));
        assert_eq!(parse_bit_range("[63:0]"), Ok((0, 64)));

        let mut placer = FieldPlacer::new();
        let err = placer
            .place(&FieldPlacement::Range("[4294967295:0]".into()), "m.b.R.F")
            .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("m.b.R.F"));
    }

    #[test]
    fn auto_placement_follows_cursor() {
        let mut placer = FieldPlacer::new();
        let widths = [1, 3, 1];
        let offsets: Vec<u32> = widths
            .iter()
            .map(|w| placer.place(&FieldPlacement::Auto { width: *w }, "r.f").unwrap().0)
            .collect();
        assert_eq!(offsets, vec![0, 1, 4]);
        assert_eq!(placer.cursor(), 5);
    }

    #[test]
    fn explicit_fields_advance_cursor() {
        let mut placer = FieldPlacer::new();
        placer
            .place(&FieldPlacement::Range("[7:4]".into()), "r.a")
            .unwrap();
        let (offset, width) = placer
            .place(&FieldPlacement::Auto { width: 2 }, "r.b")
            .unwrap();
        assert_eq!((offset, width), (8, 2));

        // A lower explicit field never moves the cursor backwards.
        placer
            .place(&FieldPlacement::Explicit { offset: 0, width: 1 }, "r.c")
            .unwrap();
        assert_eq!(placer.cursor(), 10);
    }

    #[test]
    fn errors_carry_field_path() {
        let mut placer = FieldPlacer::new();
        let err = placer
            .place(&FieldPlacement::Range("[3:7]".into()), "soc.uart.CTRL.MODE")
            .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("soc.uart.CTRL.MODE"));

        let err = placer
            .place(&FieldPlacement::Auto { width: 0 }, "soc.uart.CTRL.X")
            .unwrap_err();
        assert!(err.is_format());
    }
}
