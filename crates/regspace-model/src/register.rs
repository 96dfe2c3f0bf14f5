//! Registers and bit fields.

use serde::{Deserialize, Serialize};

use crate::access::AccessPolicy;
use crate::array::ArrayInstance;

/// Mask with the low `width` bits set.
pub fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// A named sub-range of bits within a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BitField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// LSB index within the register.
    pub bit_offset: u32,
    /// Number of bits, at least 1.
    pub bit_width: u32,
    pub access: AccessPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_value: Option<u64>,
}

impl BitField {
    /// One past the field's MSB.
    pub fn bit_end(&self) -> u32 {
        self.bit_offset.saturating_add(self.bit_width)
    }

    /// Unshifted mask covering the field's width.
    pub fn value_mask(&self) -> u64 {
        low_mask(self.bit_width)
    }

    /// Mask of the field's bits in register position.
    pub fn mask(&self) -> u64 {
        self.value_mask()
            .checked_shl(self.bit_offset)
            .unwrap_or(0)
    }

    /// Extract this field's value from a register word.
    pub fn extract(&self, word: u64) -> u64 {
        (word & self.mask()).checked_shr(self.bit_offset).unwrap_or(0)
    }

    /// Place `value` at the field's position. Bits beyond the field width are dropped.
    pub fn insert(&self, value: u64) -> u64 {
        (value & self.value_mask())
            .checked_shl(self.bit_offset)
            .unwrap_or(0)
    }

    /// Whether `value` fits in the field width.
    pub fn fits(&self, value: u64) -> bool {
        value & !self.value_mask() == 0
    }
}

/// A register at a byte offset within its address block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Register {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Byte offset relative to the containing block.
    pub offset: u64,
    /// Width in bits (8, 16, 32 or 64).
    pub width: u32,
    pub access: AccessPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_value: Option<u64>,
    #[serde(default)]
    pub fields: Vec<BitField>,
    /// Set when this register was materialized from an array instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<ArrayInstance>,
}

impl Register {
    /// Size in bytes.
    pub fn size_bytes(&self) -> u64 {
        u64::from(self.width / 8)
    }

    /// Byte offset one past the register's last byte.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size_bytes())
    }

    /// Mask covering the register width.
    pub fn word_mask(&self) -> u64 {
        low_mask(self.width)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&BitField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Reset word: the explicit register reset, else the OR of field resets.
    pub fn composed_reset(&self) -> u64 {
        match self.reset_value {
            Some(value) => value & self.word_mask(),
            None => self
                .fields
                .iter()
                .filter_map(|f| f.reset_value.map(|v| f.insert(v)))
                .fold(0, |acc, bits| acc | bits)
                & self.word_mask(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, offset: u32, width: u32) -> BitField {
        BitField {
            name: name.into(),
            description: None,
            bit_offset: offset,
            bit_width: width,
            access: AccessPolicy::ReadWrite,
            reset_value: None,
        }
    }

    #[test]
    fn masks() {
        let f = field("MODE", 4, 4);
        assert_eq!(f.mask(), 0xF0);
        assert_eq!(f.extract(0xA5), 0xA);
        assert_eq!(f.insert(0x3), 0x30);
        assert!(f.fits(0xF));
        assert!(!f.fits(0x10));
    }

    #[test]
    fn full_width_field() {
        let f = field("ALL", 0, 64);
        assert_eq!(f.mask(), u64::MAX);
        assert_eq!(f.extract(u64::MAX), u64::MAX);
    }

    #[test]
    fn out_of_range_offset_has_empty_mask() {
        let f = field("HIGH", 70, 1);
        assert_eq!(f.mask(), 0);
        assert_eq!(f.extract(u64::MAX), 0);
    }

    #[test]
    fn composed_reset_from_fields() {
        let mut en = field("EN", 0, 1);
        en.reset_value = Some(1);
        let mut mode = field("MODE", 4, 2);
        mode.reset_value = Some(2);
        let reg = Register {
            name: "CTRL".into(),
            description: None,
            offset: 0,
            width: 8,
            access: AccessPolicy::ReadWrite,
            reset_value: None,
            fields: vec![en, mode],
            instance: None,
        };
        assert_eq!(reg.composed_reset(), 0x21);
        assert_eq!(reg.size_bytes(), 1);
        assert_eq!(reg.end(), 1);
    }
}
