// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Floating-point properties, native or fixed-point scaled.
//!
//! Every element occupies four bytes. With a scale of zero those bytes are a
//! little-endian `f32`. With a non-zero scale they are a little-endian `i32`
//! holding `round(value * scale)`, which is how devices transport
//! fractional values in integer registers. The unit size names the
//! device-side register width and bounds the default limits.

use rangekit_signal::SignalKind;

use crate::base::{Access, PropertyCore, PropertyKind};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};
use crate::storage;

const STRIDE: usize = 4;

#[expect(
    clippy::cast_possible_truncation,
    reason = "property values are single precision"
)]
fn to_f32(value: f64) -> f32 {
    value as f32
}

fn truncate_decimals(value: f64, decimals: u8) -> f32 {
    let factor = 10_f64.powi(i32::from(decimals));
    to_f32((value * factor).trunc() / factor)
}

/// A native or scaled fixed-point float property.
///
/// # Example
///
/// ```rust
/// use rangekit_property::{FloatProperty, PropertyDescriptor, PropertyId, PropertyKind};
///
/// let mut threshold = FloatProperty::new(
///     PropertyDescriptor::builder(PropertyId::new(0x41)).build(),
///     2,
///     100,
///     2,
/// )?;
/// threshold.set_string_value(0, "3.14")?;
///
/// assert_eq!(threshold.raw_value(0)?, 314);
/// assert_eq!(threshold.string_value(0)?, "3.14");
/// assert_eq!(threshold.max_value(), 327.67);
/// # Ok::<(), rangekit_property::PropertyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct FloatProperty {
    core: PropertyCore,
    scale: u32,
    decimals: u8,
    min: f32,
    max: f32,
}

impl FloatProperty {
    /// Creates an uninitialized float property.
    ///
    /// `unit_size` (1, 2 or 4) is the device register width. A `scale` of
    /// zero stores native floats; otherwise values are stored as integers
    /// multiplied by `scale`. `decimals` sets the text precision.
    pub fn new(
        descriptor: PropertyDescriptor,
        unit_size: usize,
        scale: u32,
        decimals: u8,
    ) -> Result<Self> {
        let core = PropertyCore::new(descriptor, unit_size, STRIDE)?;
        if !matches!(unit_size, 1 | 2 | 4) {
            return Err(PropertyError::InvalidArgument {
                id: core.id(),
                reason: format!("float unit size must be 1, 2 or 4, not {unit_size}"),
            });
        }
        let (min, max) = natural_limits(unit_size, scale, decimals);
        Ok(Self {
            core,
            scale,
            decimals,
            min,
            max,
        })
    }

    /// Fixed-point scale, or zero for native floats.
    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Decimal places used for text rendering.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Changes the decimal places used for text rendering.
    pub fn set_decimals(&mut self, decimals: u8) {
        self.decimals = decimals;
    }

    /// Smallest admissible value.
    #[must_use]
    pub fn min_value(&self) -> f32 {
        self.min
    }

    /// Largest admissible value.
    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.max
    }

    /// Value of element `index`.
    pub fn value(&self, index: usize) -> Result<f32> {
        Ok(self.decode(self.core.read(index)?))
    }

    /// Last value confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<f32> {
        Ok(self.decode(self.core.read_backup(index)?))
    }

    /// Stored fixed-point integer of element `index`.
    pub fn raw_value(&self, index: usize) -> Result<i32> {
        self.check_scaled()?;
        Ok(decode_raw(self.core.read(index)?))
    }

    /// Last fixed-point integer confirmed by the device for element `index`.
    pub fn raw_device_value(&self, index: usize) -> Result<i32> {
        self.check_scaled()?;
        Ok(decode_raw(self.core.read_backup(index)?))
    }

    fn decode(&self, bytes: &[u8]) -> f32 {
        if self.scale == 0 {
            f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        } else {
            to_f32(f64::from(decode_raw(bytes)) / f64::from(self.scale))
        }
    }

    fn encode(&self, value: f32) -> [u8; 4] {
        if self.scale == 0 {
            value.to_le_bytes()
        } else {
            self.scaled(value).to_le_bytes()
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "callers bound the value to the i32 range; `as` saturates otherwise"
    )]
    fn scaled(&self, value: f32) -> i32 {
        (f64::from(value) * f64::from(self.scale)).round() as i32
    }

    /// Writes element `index`, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, value: f32) -> Result<()> {
        self.write(index, value, Access::Checked)
    }

    /// Writes element `index`, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, value: f32) -> Result<()> {
        self.write(index, value, Access::Forced)
    }

    pub(crate) fn write(&mut self, index: usize, value: f32, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        if value.is_nan() {
            return Err(PropertyError::InvalidArgument {
                id: self.core.id(),
                reason: "value is NaN".into(),
            });
        }
        if value < self.min || value > self.max {
            return Err(self.out_of_range(value.to_string()));
        }
        if self.scale != 0 {
            let raw = (f64::from(value) * f64::from(self.scale)).round();
            if raw < f64::from(i32::MIN) || raw > f64::from(i32::MAX) {
                return Err(self.out_of_range(value.to_string()));
            }
        }
        let bytes = self.encode(value);
        self.core.commit(index, &bytes);
        Ok(())
    }

    /// Writes the fixed-point integer of element `index`, honoring the edit gate.
    pub fn set_raw_value(&mut self, index: usize, raw: i32) -> Result<()> {
        self.write_raw(index, raw, Access::Checked)
    }

    /// Writes the fixed-point integer of element `index`, bypassing the edit gate.
    pub fn force_raw_value(&mut self, index: usize, raw: i32) -> Result<()> {
        self.write_raw(index, raw, Access::Forced)
    }

    fn write_raw(&mut self, index: usize, raw: i32, access: Access) -> Result<()> {
        self.check_scaled()?;
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        let scale = f64::from(self.scale);
        let raw_f = f64::from(raw);
        if raw_f < f64::from(self.min) * scale || raw_f > f64::from(self.max) * scale {
            return Err(self.out_of_range(raw.to_string()));
        }
        self.core.commit(index, &raw.to_le_bytes());
        Ok(())
    }

    /// Replaces the limits. Stored values outside them are clipped.
    ///
    /// Emits `LimitsChanged`, then one `ValueChanged` if anything was clipped.
    pub fn set_limits(&mut self, min: f32, max: f32) -> Result<()> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(PropertyError::InvalidArgument {
                id: self.core.id(),
                reason: format!("invalid limits [{min}, {max}]"),
            });
        }
        self.min = min;
        self.max = max;
        self.core.emit(SignalKind::LimitsChanged);
        self.clip_to_limits();
        Ok(())
    }

    /// Replaces the limits with fixed-point integers of a scaled property.
    pub fn set_raw_limits(&mut self, min: i32, max: i32) -> Result<()> {
        self.check_scaled()?;
        let scale = f64::from(self.scale);
        self.set_limits(
            to_f32(f64::from(min) / scale),
            to_f32(f64::from(max) / scale),
        )
    }

    /// Restores the widest limits the unit size and scale allow.
    pub fn reset_limits(&mut self) -> Result<()> {
        let (min, max) = natural_limits(self.core.unit_size(), self.scale, self.decimals);
        self.set_limits(min, max)
    }

    fn clip_to_limits(&mut self) {
        if !self.core.is_initialized() {
            return;
        }
        let clipped: Vec<(usize, [u8; 4])> = (0..self.core.storage().count())
            .filter_map(|index| {
                let value = self.decode(self.core.storage().element(index)?);
                let clamped = value.clamp(self.min, self.max);
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
    }

    fn format(&self, value: f32) -> String {
        format!("{:.*}", usize::from(self.decimals), value)
    }

    fn check_scaled(&self) -> Result<()> {
        if self.scale == 0 {
            Err(PropertyError::Logic {
                id: self.core.id(),
                reason: "raw access to an unscaled float property",
            })
        } else {
            Ok(())
        }
    }

    fn out_of_range(&self, value: String) -> PropertyError {
        PropertyError::ValueOutOfRange {
            id: self.core.id(),
            value,
            min: self.format(self.min),
            max: self.format(self.max),
        }
    }
}

fn decode_raw(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn natural_limits(unit_size: usize, scale: u32, decimals: u8) -> (f32, f32) {
    if scale == 0 {
        return (f32::MIN, f32::MAX);
    }
    let (lo, hi) = storage::signed_range(unit_size);
    // Unit sizes are at most 4 bytes, exact in f64.
    let (lo, hi) = (lo as f64, hi as f64);
    let scale = f64::from(scale);
    (
        truncate_decimals(lo / scale, decimals),
        truncate_decimals(hi / scale, decimals),
    )
}

impl PropertyKind for FloatProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::Float
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn string_value(&self, index: usize) -> Result<String> {
        Ok(self.format(self.value(index)?))
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        let value: f32 = text.trim().parse().map_err(|_| PropertyError::InvalidText {
            id: self.core.id(),
            text: text.to_owned(),
            reason: "not a decimal number",
        })?;
        self.core.check_edit(access)?;
        if let Some(current) = self.core.pending_element(index)
            && self.format(self.decode(current)) == self.format(value)
        {
            return Ok(());
        }
        self.write(index, value, access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{descriptor, signal_counter, signal_log};

    fn scaled() -> FloatProperty {
        FloatProperty::new(descriptor(1), 2, 100, 2).unwrap()
    }

    fn native() -> FloatProperty {
        FloatProperty::new(descriptor(1), 4, 0, 3).unwrap()
    }

    #[test]
    fn scaled_text_round_trip() {
        let mut prop = scaled();
        prop.set_string_value(0, "3.14").unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "3.14");
        assert_eq!(prop.raw_value(0).unwrap(), 314);
        assert_eq!(prop.storage(), &314_i32.to_le_bytes());
        assert_eq!(prop.stride(), 4);
        assert_eq!(prop.unit_size(), 2);
    }

    #[test]
    fn scaled_limits_come_from_unit_range() {
        let prop = scaled();
        assert_eq!(prop.min_value(), -327.68);
        assert_eq!(prop.max_value(), 327.67);

        let coarse = FloatProperty::new(descriptor(1), 1, 3, 1).unwrap();
        // 127 / 3 = 42.333.. truncated to one decimal.
        assert_eq!(coarse.max_value(), 42.3);
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        let mut prop = scaled();
        assert_eq!(prop.set_value(0, 400.0).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(
            prop.set_value(0, f32::NAN).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            prop.set_string_value(0, "pi").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(!prop.is_initialized());
    }

    #[test]
    fn insignificant_text_change_is_ignored() {
        let mut prop = native();
        let hits = signal_counter(&prop);
        prop.set_string_value(0, "1.5").unwrap();
        prop.set_string_value(0, "1.5000001").unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(prop.value(0).unwrap(), 1.5);
        prop.set_string_value(0, "1.501").unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn raw_access_requires_scale() {
        let mut prop = native();
        prop.set_value(0, 2.5).unwrap();
        assert_eq!(prop.raw_value(0).unwrap_err().kind(), ErrorKind::Logic);
        assert_eq!(prop.set_raw_value(0, 1).unwrap_err().kind(), ErrorKind::Logic);
        assert_eq!(prop.string_value(0).unwrap(), "2.500");
    }

    #[test]
    fn raw_value_respects_scaled_limits() {
        let mut prop = scaled();
        prop.set_limits(-1.0, 1.0).unwrap();
        prop.set_raw_value(0, 100).unwrap();
        assert_eq!(prop.value(0).unwrap(), 1.0);
        assert_eq!(prop.set_raw_value(0, 101).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn limits_clip_and_reset() {
        let mut prop = scaled();
        prop.set_value(0, 10.0).unwrap();
        let log = signal_log(&prop);
        prop.set_raw_limits(-500, 500).unwrap();
        assert_eq!(prop.value(0).unwrap(), 5.0);
        assert_eq!(
            *log.borrow(),
            [SignalKind::LimitsChanged, SignalKind::ValueChanged]
        );

        prop.reset_limits().unwrap();
        assert_eq!(prop.max_value(), 327.67);
        assert_eq!(
            prop.set_limits(2.0, 1.0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn device_value_reads_backup() {
        let mut prop = scaled();
        prop.set_value(0, 1.25).unwrap();
        prop.set_clean();
        prop.set_value(0, 2.5).unwrap();
        assert_eq!(prop.device_value(0).unwrap(), 1.25);
        assert_eq!(prop.raw_device_value(0).unwrap(), 125);
        prop.restore();
        assert_eq!(prop.value(0).unwrap(), 1.25);
    }

    #[test]
    fn decimals_change_rendering() {
        let mut prop = native();
        prop.set_value(0, 0.3125).unwrap();
        prop.set_decimals(1);
        assert_eq!(prop.string_value(0).unwrap(), "0.3");
    }
}
