// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer properties.
//!
//! An [`IntegerProperty`] stores 1, 2, 4 or 8 byte integers. Signedness is
//! fixed at construction and selects which pair of [`IntegerLimits`] is
//! active. Reads narrow through [`TryFrom`], so asking for a type that
//! cannot hold the stored value fails with `OutOfRange` instead of
//! truncating.

use core::any::type_name;

use rangekit_signal::SignalKind;
use smallvec::SmallVec;

use crate::base::{Access, PropertyCore, PropertyKind};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};
use crate::storage;

/// The admissible range of an integer property.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntegerLimits {
    /// Range of a signed property.
    Signed {
        /// Smallest admissible value.
        min: i64,
        /// Largest admissible value.
        max: i64,
    },
    /// Range of an unsigned property.
    Unsigned {
        /// Smallest admissible value.
        min: u64,
        /// Largest admissible value.
        max: u64,
    },
}

impl IntegerLimits {
    /// The full range of a `unit_size`-byte integer.
    #[must_use]
    pub fn natural(unit_size: usize, signed: bool) -> Self {
        if signed {
            let (min, max) = storage::signed_range(unit_size);
            Self::Signed { min, max }
        } else {
            Self::Unsigned {
                min: 0,
                max: storage::unsigned_max(unit_size),
            }
        }
    }

    fn contains(self, value: i128) -> bool {
        match self {
            Self::Signed { min, max } => (i128::from(min)..=i128::from(max)).contains(&value),
            Self::Unsigned { min, max } => (i128::from(min)..=i128::from(max)).contains(&value),
        }
    }

    fn clamp(self, value: i128) -> i128 {
        match self {
            Self::Signed { min, max } => value.clamp(i128::from(min), i128::from(max)),
            Self::Unsigned { min, max } => value.clamp(i128::from(min), i128::from(max)),
        }
    }

    fn bounds_text(self) -> (String, String) {
        match self {
            Self::Signed { min, max } => (min.to_string(), max.to_string()),
            Self::Unsigned { min, max } => (min.to_string(), max.to_string()),
        }
    }
}

/// A signed or unsigned integer property.
///
/// # Example
///
/// ```rust
/// use rangekit_property::{IntegerProperty, PropertyDescriptor, PropertyId, PropertyKind};
///
/// let mut gain = IntegerProperty::new(
///     PropertyDescriptor::builder(PropertyId::new(0x30)).build(),
///     2,
///     true,
/// )?;
/// gain.set_limits(-100, 100)?;
/// gain.set_value(0, -42)?;
///
/// assert_eq!(gain.value(0)?, -42);
/// assert!(gain.value_as::<u8>(0).is_err());
/// assert_eq!(gain.string_value_radix(0, 16)?, "-2a");
/// # Ok::<(), rangekit_property::PropertyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct IntegerProperty {
    core: PropertyCore,
    limits: IntegerLimits,
}

impl IntegerProperty {
    /// Creates an uninitialized integer property of `unit_size` bytes
    /// (1, 2, 4 or 8) whose limits span the full range of that width.
    pub fn new(descriptor: PropertyDescriptor, unit_size: usize, signed: bool) -> Result<Self> {
        let core = PropertyCore::new(descriptor, unit_size, unit_size)?;
        if !storage::is_integer_width(unit_size) {
            return Err(PropertyError::InvalidArgument {
                id: core.id(),
                reason: format!("integer unit size must be 1, 2, 4 or 8, not {unit_size}"),
            });
        }
        Ok(Self {
            core,
            limits: IntegerLimits::natural(unit_size, signed),
        })
    }

    /// Returns `true` for a signed property.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self.limits, IntegerLimits::Signed { .. })
    }

    /// Returns the active limits.
    #[must_use]
    pub fn limits(&self) -> IntegerLimits {
        self.limits
    }

    /// Lower limit of a signed property.
    pub fn min_value(&self) -> Result<i64> {
        match self.limits {
            IntegerLimits::Signed { min, .. } => Ok(min),
            IntegerLimits::Unsigned { .. } => Err(self.sign_mismatch()),
        }
    }

    /// Upper limit of a signed property.
    pub fn max_value(&self) -> Result<i64> {
        match self.limits {
            IntegerLimits::Signed { max, .. } => Ok(max),
            IntegerLimits::Unsigned { .. } => Err(self.sign_mismatch()),
        }
    }

    /// Lower limit of an unsigned property.
    pub fn min_value_unsigned(&self) -> Result<u64> {
        match self.limits {
            IntegerLimits::Unsigned { min, .. } => Ok(min),
            IntegerLimits::Signed { .. } => Err(self.sign_mismatch()),
        }
    }

    /// Upper limit of an unsigned property.
    pub fn max_value_unsigned(&self) -> Result<u64> {
        match self.limits {
            IntegerLimits::Unsigned { max, .. } => Ok(max),
            IntegerLimits::Signed { .. } => Err(self.sign_mismatch()),
        }
    }

    /// Value of element `index` as `i64`.
    pub fn value(&self, index: usize) -> Result<i64> {
        self.value_as(index)
    }

    /// Value of element `index` as `u64`.
    pub fn value_unsigned(&self, index: usize) -> Result<u64> {
        self.value_as(index)
    }

    /// Value of element `index` narrowed to `T`.
    ///
    /// Fails with `OutOfRange` if `T` cannot hold the stored value, including
    /// a negative value read into an unsigned type.
    pub fn value_as<T>(&self, index: usize) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let bytes = self.core.read(index)?;
        self.narrow(bytes)
    }

    /// Last value confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<i64> {
        self.device_value_as(index)
    }

    /// Last value confirmed by the device, narrowed to `T`.
    pub fn device_value_as<T>(&self, index: usize) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let bytes = self.core.read_backup(index)?;
        self.narrow(bytes)
    }

    fn narrow<T>(&self, bytes: &[u8]) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let narrowing = |value: String| PropertyError::Narrowing {
            id: self.core.id(),
            value,
            target: type_name::<T>(),
        };
        match self.limits {
            IntegerLimits::Signed { .. } => {
                let value = storage::decode_signed(bytes);
                T::try_from(value).map_err(|_| narrowing(value.to_string()))
            }
            IntegerLimits::Unsigned { .. } => {
                let value = storage::decode_unsigned(bytes);
                T::try_from(value).map_err(|_| narrowing(value.to_string()))
            }
        }
    }

    fn stored(&self, bytes: &[u8]) -> i128 {
        match self.limits {
            IntegerLimits::Signed { .. } => i128::from(storage::decode_signed(bytes)),
            IntegerLimits::Unsigned { .. } => i128::from(storage::decode_unsigned(bytes)),
        }
    }

    /// Writes element `index`, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, value: i64) -> Result<()> {
        self.write(index, i128::from(value), Access::Checked)
    }

    /// Writes element `index`, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, value: i64) -> Result<()> {
        self.write(index, i128::from(value), Access::Forced)
    }

    /// Writes element `index` of an unsigned property, honoring the edit gate.
    pub fn set_value_unsigned(&mut self, index: usize, value: u64) -> Result<()> {
        self.write_unsigned(index, value, Access::Checked)
    }

    /// Writes element `index` of an unsigned property, bypassing the edit gate.
    pub fn force_value_unsigned(&mut self, index: usize, value: u64) -> Result<()> {
        self.write_unsigned(index, value, Access::Forced)
    }

    pub(crate) fn write_unsigned(&mut self, index: usize, value: u64, access: Access) -> Result<()> {
        if self.is_signed() {
            return Err(self.sign_mismatch());
        }
        self.write(index, i128::from(value), access)
    }

    pub(crate) fn write(&mut self, index: usize, value: i128, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        if !self.limits.contains(value) {
            let (min, max) = self.limits.bounds_text();
            return Err(PropertyError::ValueOutOfRange {
                id: self.core.id(),
                value: value.to_string(),
                min,
                max,
            });
        }
        let bytes = self.encode(value);
        self.core.commit(index, &bytes);
        Ok(())
    }

    fn encode(&self, value: i128) -> SmallVec<[u8; 8]> {
        // Callers only pass values inside the active limits, which fit the width.
        let width = self.core.unit_size();
        let bytes = value.to_le_bytes();
        SmallVec::from_slice(&bytes[..width])
    }

    /// Replaces the limits of a signed property, or of an unsigned property
    /// narrower than 8 bytes.
    ///
    /// Stored values outside the new range are clipped to it. Emits
    /// `LimitsChanged`, then one `ValueChanged` if anything was clipped.
    pub fn set_limits(&mut self, min: i64, max: i64) -> Result<()> {
        let id = self.core.id();
        if min > max {
            return Err(PropertyError::InvalidArgument {
                id,
                reason: format!("minimum {min} exceeds maximum {max}"),
            });
        }
        let unit_size = self.core.unit_size();
        let limits = if self.is_signed() {
            IntegerLimits::Signed { min, max }
        } else {
            if unit_size == 8 {
                return Err(PropertyError::OutOfRange {
                    id,
                    reason: "8-byte unsigned limits must be set with set_limits_unsigned".into(),
                });
            }
            match (u64::try_from(min), u64::try_from(max)) {
                (Ok(min), Ok(max)) => IntegerLimits::Unsigned { min, max },
                _ => {
                    return Err(PropertyError::OutOfRange {
                        id,
                        reason: format!("negative limit [{min}, {max}] on an unsigned property"),
                    });
                }
            }
        };
        self.apply_limits(limits)
    }

    /// Replaces the limits of an unsigned property.
    pub fn set_limits_unsigned(&mut self, min: u64, max: u64) -> Result<()> {
        if self.is_signed() {
            return Err(self.sign_mismatch());
        }
        if min > max {
            return Err(PropertyError::InvalidArgument {
                id: self.core.id(),
                reason: format!("minimum {min} exceeds maximum {max}"),
            });
        }
        self.apply_limits(IntegerLimits::Unsigned { min, max })
    }

    fn apply_limits(&mut self, limits: IntegerLimits) -> Result<()> {
        let natural = IntegerLimits::natural(self.core.unit_size(), self.is_signed());
        let (min, max) = match limits {
            IntegerLimits::Signed { min, max } => (i128::from(min), i128::from(max)),
            IntegerLimits::Unsigned { min, max } => (i128::from(min), i128::from(max)),
        };
        if !natural.contains(min) || !natural.contains(max) {
            let (natural_min, natural_max) = natural.bounds_text();
            return Err(PropertyError::OutOfRange {
                id: self.core.id(),
                reason: format!(
                    "limits [{min}, {max}] exceed the {}-byte range [{natural_min}, {natural_max}]",
                    self.core.unit_size()
                ),
            });
        }

        self.limits = limits;
        self.core.emit(SignalKind::LimitsChanged);

        if !self.core.is_initialized() {
            return Ok(());
        }
        let clipped: Vec<(usize, SmallVec<[u8; 8]>)> = (0..self.core.storage().count())
            .filter_map(|index| {
                let bytes = self.core.storage().element(index)?;
                let value = self.stored(bytes);
                let clamped = limits.clamp(value);
                (clamped != value).then(|| (index, self.encode(clamped)))
            })
            .collect();
        if !clipped.is_empty() {
            tracing::warn!(
                id = %self.core.id(),
                clipped = clipped.len(),
                "limit change clipped stored values"
            );
            self.core
                .commit_many(clipped.iter().map(|(index, bytes)| (*index, bytes.as_slice())));
        }
        Ok(())
    }

    /// Text of element `index` in `radix` (2 to 36, lowercase digits).
    pub fn string_value_radix(&self, index: usize, radix: u32) -> Result<String> {
        self.check_radix(radix)?;
        let bytes = self.core.read(index)?;
        let value = self.stored(bytes);
        let magnitude = format_radix(value.unsigned_abs(), radix);
        Ok(if value < 0 {
            format!("-{magnitude}")
        } else {
            magnitude
        })
    }

    /// Parses `text` in `radix` and writes it, honoring the edit gate.
    pub fn set_string_value_radix(&mut self, index: usize, text: &str, radix: u32) -> Result<()> {
        self.write_text(index, text, radix, Access::Checked)
    }

    /// Parses `text` in `radix` and writes it, bypassing the edit gate.
    pub fn force_string_value_radix(&mut self, index: usize, text: &str, radix: u32) -> Result<()> {
        self.write_text(index, text, radix, Access::Forced)
    }

    fn write_text(&mut self, index: usize, text: &str, radix: u32, access: Access) -> Result<()> {
        self.check_radix(radix)?;
        let value = i128::from_str_radix(text.trim(), radix).map_err(|_| PropertyError::InvalidText {
            id: self.core.id(),
            text: text.to_owned(),
            reason: "not an integer in the requested base",
        })?;
        self.write(index, value, access)
    }

    fn check_radix(&self, radix: u32) -> Result<()> {
        if (2..=36).contains(&radix) {
            Ok(())
        } else {
            Err(PropertyError::InvalidArgument {
                id: self.core.id(),
                reason: format!("radix {radix} is not between 2 and 36"),
            })
        }
    }

    fn sign_mismatch(&self) -> PropertyError {
        PropertyError::Logic {
            id: self.core.id(),
            reason: if self.is_signed() {
                "unsigned accessor on a signed property"
            } else {
                "signed accessor on an unsigned property"
            },
        }
    }
}

fn format_radix(mut value: u128, radix: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let radix = u128::from(radix);
    let mut digits = SmallVec::<[u8; 64]>::new();
    while value > 0 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "remainder is below the radix"
        )]
        digits.push(DIGITS[(value % radix) as usize]);
        value /= radix;
    }
    digits.iter().rev().map(|&digit| char::from(digit)).collect()
}

impl PropertyKind for IntegerProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::Integer
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn string_value(&self, index: usize) -> Result<String> {
        self.string_value_radix(index, 10)
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        self.write_text(index, text, 10, access)
    }
}
