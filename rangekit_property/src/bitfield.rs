// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit field properties with exclusivity and a configurable ceiling.

use core::any::type_name;

use rangekit_signal::SignalKind;

use crate::base::{Access, PropertyCore, PropertyKind};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};
use crate::storage;

#[derive(Copy, Clone, Debug)]
enum BitOp {
    Set,
    Reset,
    Toggle,
}

/// A property whose elements are raw bit fields of 1, 2, 4 or 8 bytes.
///
/// Two rules guard every write: at most one bit of the exclusivity mask may
/// be set, and the value may not exceed the configured limit.
///
/// The text form is a binary string, most significant bit first, made of
/// `'0'`, `'1'` and `'x'` (leave the bit as it is).
///
/// # Example
///
/// ```rust
/// use rangekit_property::{BitFieldProperty, PropertyDescriptor, PropertyId, PropertyKind};
///
/// let mut options = BitFieldProperty::new(
///     PropertyDescriptor::builder(PropertyId::new(0x90)).build(),
///     1,
/// )?;
/// options.set_exclusivity_mask(0b0000_0110);
/// options.set_bit(0, 1)?;
/// assert!(options.set_bit(0, 2).is_err());
///
/// options.set_string_value(0, "1x00x")?;
/// assert_eq!(options.string_value(0)?, "00010000");
/// # Ok::<(), rangekit_property::PropertyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct BitFieldProperty {
    core: PropertyCore,
    exclusivity_mask: u64,
    limit: u64,
}

impl BitFieldProperty {
    /// Creates an uninitialized bit field of `unit_size` bytes (1, 2, 4 or 8).
    pub fn new(descriptor: PropertyDescriptor, unit_size: usize) -> Result<Self> {
        let core = PropertyCore::new(descriptor, unit_size, unit_size)?;
        if !storage::is_integer_width(unit_size) {
            return Err(PropertyError::InvalidArgument {
                id: core.id(),
                reason: format!("bit field unit size must be 1, 2, 4 or 8, not {unit_size}"),
            });
        }
        Ok(Self {
            core,
            exclusivity_mask: 0,
            limit: storage::unsigned_max(unit_size),
        })
    }

    /// Number of bits per element.
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.core.unit_size() * 8
    }

    /// Bits of which at most one may be set.
    #[must_use]
    pub fn exclusivity_mask(&self) -> u64 {
        self.exclusivity_mask
    }

    /// Replaces the exclusivity mask. Stored values are not re-validated.
    pub fn set_exclusivity_mask(&mut self, mask: u64) {
        self.exclusivity_mask = mask;
    }

    /// Fails with a logic error if `value` sets more than one masked bit.
    pub fn validate_exclusivity(&self, value: u64) -> Result<()> {
        if (value & self.exclusivity_mask).count_ones() > 1 {
            return Err(PropertyError::Exclusivity {
                id: self.core.id(),
                value,
                mask: self.exclusivity_mask,
            });
        }
        Ok(())
    }

    /// Largest admissible value.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Lowers (or raises, up to the unit maximum) the largest admissible
    /// value. Fails if a stored value already exceeds it. Emits `LimitsChanged`.
    pub fn set_limit(&mut self, limit: u64) -> Result<()> {
        let id = self.core.id();
        let max = storage::unsigned_max(self.core.unit_size());
        if limit > max {
            return Err(PropertyError::OutOfRange {
                id,
                reason: format!("limit {limit} exceeds the unit maximum {max}"),
            });
        }
        if self.core.is_initialized() {
            let storage = self.core.storage();
            if let Some(value) = (0..storage.count())
                .filter_map(|index| storage.element(index).map(storage::decode_unsigned))
                .find(|value| *value > limit)
            {
                return Err(PropertyError::OutOfRange {
                    id,
                    reason: format!("stored value {value} exceeds the new limit {limit}"),
                });
            }
        }
        self.limit = limit;
        self.core.emit(SignalKind::LimitsChanged);
        Ok(())
    }

    fn validate(&self, value: u64) -> Result<()> {
        self.validate_exclusivity(value)?;
        if value > self.limit {
            return Err(PropertyError::ValueOutOfRange {
                id: self.core.id(),
                value: value.to_string(),
                min: "0".to_owned(),
                max: self.limit.to_string(),
            });
        }
        Ok(())
    }

    /// Value of element `index`.
    pub fn value(&self, index: usize) -> Result<u64> {
        Ok(storage::decode_unsigned(self.core.read(index)?))
    }

    /// Value of element `index` narrowed to `T`.
    pub fn value_as<T: TryFrom<u64>>(&self, index: usize) -> Result<T> {
        let value = self.value(index)?;
        T::try_from(value).map_err(|_| PropertyError::Narrowing {
            id: self.core.id(),
            value: value.to_string(),
            target: type_name::<T>(),
        })
    }

    /// Value last confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<u64> {
        Ok(storage::decode_unsigned(self.core.read_backup(index)?))
    }

    /// Writes element `index`, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, value: u64) -> Result<()> {
        self.write(index, value, Access::Checked)
    }

    /// Writes element `index`, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, value: u64) -> Result<()> {
        self.write(index, value, Access::Forced)
    }

    pub(crate) fn write(&mut self, index: usize, value: u64, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        self.validate(value)?;
        self.commit(index, value);
        Ok(())
    }

    fn commit(&mut self, index: usize, value: u64) {
        let bytes = storage::encode_unsigned(value, self.core.unit_size());
        self.core.commit(index, &bytes);
    }

    /// Returns whether `bit` of element `index` is set.
    pub fn bit_state(&self, index: usize, bit: usize) -> Result<bool> {
        self.check_bit(bit)?;
        Ok(self.value(index)? & (1 << bit) != 0)
    }

    /// Sets `bit` of element `index`, honoring the edit gate.
    pub fn set_bit(&mut self, index: usize, bit: usize) -> Result<()> {
        self.modify_bit(index, bit, BitOp::Set, Access::Checked)
    }

    /// Sets `bit` of element `index`, bypassing the edit gate.
    pub fn force_set_bit(&mut self, index: usize, bit: usize) -> Result<()> {
        self.modify_bit(index, bit, BitOp::Set, Access::Forced)
    }

    /// Clears `bit` of element `index`, honoring the edit gate.
    pub fn reset_bit(&mut self, index: usize, bit: usize) -> Result<()> {
        self.modify_bit(index, bit, BitOp::Reset, Access::Checked)
    }

    /// Clears `bit` of element `index`, bypassing the edit gate.
    pub fn force_reset_bit(&mut self, index: usize, bit: usize) -> Result<()> {
        self.modify_bit(index, bit, BitOp::Reset, Access::Forced)
    }

    /// Flips `bit` of element `index`, honoring the edit gate.
    pub fn toggle_bit(&mut self, index: usize, bit: usize) -> Result<()> {
        self.modify_bit(index, bit, BitOp::Toggle, Access::Checked)
    }

    fn modify_bit(&mut self, index: usize, bit: usize, op: BitOp, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        self.check_bit(bit)?;
        let current = self.current_or_zero(index);
        let mask = 1_u64 << bit;
        let value = match op {
            BitOp::Set => current | mask,
            BitOp::Reset => current & !mask,
            BitOp::Toggle => current ^ mask,
        };
        self.validate(value)?;
        self.commit(index, value);
        Ok(())
    }

    fn current_or_zero(&self, index: usize) -> u64 {
        self.core
            .pending_element(index)
            .map_or(0, storage::decode_unsigned)
    }

    fn check_bit(&self, bit: usize) -> Result<()> {
        if bit < self.bit_count() {
            Ok(())
        } else {
            Err(PropertyError::OutOfRange {
                id: self.core.id(),
                reason: format!("bit {bit} beyond the {}-bit field", self.bit_count()),
            })
        }
    }
}

impl PropertyKind for BitFieldProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::BitField
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn string_value(&self, index: usize) -> Result<String> {
        let value = self.value(index)?;
        Ok(format!("{value:0width$b}", width = self.bit_count()))
    }

    /// Applies a binary string, most significant bit first. Bits above the
    /// string's length are cleared; `'x'` keeps the current bit.
    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        let id = self.core.id();
        let width = self.bit_count();
        if text.len() > width {
            return Err(PropertyError::TooLong {
                id,
                len: text.len(),
                max: width,
            });
        }

        let mut value = self.current_or_zero(index);
        if text.len() < 64 {
            value &= (1_u64 << text.len()) - 1;
        }
        for (bit, digit) in text.bytes().rev().enumerate() {
            match digit {
                b'0' => value &= !(1_u64 << bit),
                b'1' => value |= 1_u64 << bit,
                b'x' => {}
                _ => {
                    return Err(PropertyError::InvalidText {
                        id,
                        text: text.to_owned(),
                        reason: "expected only '0', '1' or 'x'",
                    });
                }
            }
        }
        self.validate(value)?;
        self.commit(index, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{descriptor, signal_counter};

    fn byte_field() -> BitFieldProperty {
        BitFieldProperty::new(descriptor(1), 1).unwrap()
    }

    #[test]
    fn set_then_reset_round_trips() {
        let mut prop = byte_field();
        prop.set_value(0, 0b1000_0001).unwrap();
        prop.set_bit(0, 3).unwrap();
        assert!(prop.bit_state(0, 3).unwrap());
        prop.reset_bit(0, 3).unwrap();
        assert_eq!(prop.value(0).unwrap(), 0b1000_0001);
    }

    #[test]
    fn bit_ops_initialize_an_empty_field() {
        let mut prop = byte_field();
        prop.set_bit(0, 3).unwrap();
        prop.reset_bit(0, 3).unwrap();
        assert_eq!(prop.value(0).unwrap(), 0);
        prop.toggle_bit(0, 7).unwrap();
        assert_eq!(prop.value(0).unwrap(), 0x80);
        assert_eq!(prop.set_bit(0, 8).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn exclusive_bits_conflict() {
        let mut prop = byte_field();
        prop.set_exclusivity_mask(0b11);
        prop.set_bit(0, 0).unwrap();
        let err = prop.set_bit(0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert_eq!(prop.value(0).unwrap(), 0b01);
        assert_eq!(prop.set_value(0, 0b11).unwrap_err().kind(), ErrorKind::Logic);
        // Only one masked bit set.
        prop.set_value(0, 0b110).unwrap();
    }

    #[test]
    fn limit_caps_values() {
        let mut prop = byte_field();
        prop.set_limit(0x0F).unwrap();
        assert_eq!(prop.set_value(0, 0x10).unwrap_err().kind(), ErrorKind::OutOfRange);
        prop.set_value(0, 0x0F).unwrap();
        assert_eq!(prop.set_limit(0x07).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(prop.limit(), 0x0F);
        assert_eq!(prop.set_limit(0x100).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn binary_text() {
        let mut prop = BitFieldProperty::new(descriptor(1), 2).unwrap();
        prop.set_value(0, 0b1010).unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "0000000000001010");

        // Wildcards keep bits, bits above the string are cleared.
        prop.set_value(0, 0xF00A).unwrap();
        prop.set_string_value(0, "x1x0").unwrap();
        assert_eq!(prop.value(0).unwrap(), 0b1110);

        assert_eq!(
            prop.set_string_value(0, "102").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            prop.set_string_value(0, &"1".repeat(17)).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(prop.value(0).unwrap(), 0b1110);
    }

    #[test]
    fn wildcard_is_lowercase_only() {
        let mut prop = byte_field();
        prop.set_value(0, 0b0101).unwrap();
        let err = prop.set_string_value(0, "xxxxxxX1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(prop.value(0).unwrap(), 0b0101);
        prop.set_string_value(0, "xxxxxx1x").unwrap();
        assert_eq!(prop.value(0).unwrap(), 0b0111);
    }

    #[test]
    fn text_write_emits_once() {
        let mut prop = byte_field();
        prop.set_value(0, 0).unwrap();
        let hits = signal_counter(&prop);
        prop.set_string_value(0, "11110000").unwrap();
        assert_eq!(hits.get(), 1);
        prop.set_string_value(0, "1111xxxx").unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn narrowing_read() {
        let mut prop = BitFieldProperty::new(descriptor(1), 2).unwrap();
        prop.set_value(0, 0x1FF).unwrap();
        assert_eq!(prop.value_as::<u8>(0).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(prop.value_as::<u16>(0).unwrap(), 0x1FF);
    }
}
