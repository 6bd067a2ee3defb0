// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata: category, feature flags, type tag and descriptor.
//!
//! This module provides [`PropertyDescriptor`] for the identity and metadata
//! shared by every property, and [`PropertyDescriptorBuilder`] for ergonomic
//! construction.

use core::fmt;

use crate::id::{DeviceId, PropertyId};

bitflags::bitflags! {
    /// The functional category a property belongs to.
    ///
    /// Containers filter and aggregate dirty state by category masks, so a
    /// protocol layer can push only configuration changes, only calibration
    /// changes, and so on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        /// Anything that fits no other category.
        const OTHER         = 1;
        /// Read-only device information (serial number, firmware version).
        const INFO          = 1 << 1;
        /// Factory calibration data.
        const CALIBRATION   = 1 << 2;
        /// User-facing device configuration.
        const CONFIGURATION = 1 << 3;
        /// Values fixed for the device model.
        const CONSTANT      = 1 << 4;
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::OTHER
    }
}

bitflags::bitflags! {
    /// Behavioral feature flags of a property.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// `set_*` writes are allowed. Without it only `force_*` writes succeed.
        const EDITABLE            = 1 << 1;
        /// The value is persisted on the device.
        const PERSISTED           = 1 << 2;
        /// Front ends should not warn about unsaved modifications.
        const NO_MODIFIED_WARNING = 1 << 3;
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::EDITABLE
    }
}

/// The value encoding of a property.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PropertyType {
    /// Raw bit field with exclusivity and ceiling.
    BitField = 0,
    /// Single-byte boolean.
    Bool = 1,
    /// Value from a (value, label) table.
    Enum = 2,
    /// Native or fixed-point scaled float.
    Float = 3,
    /// Signed or unsigned integer of 1, 2, 4 or 8 bytes.
    Integer = 4,
    /// Fixed-length text block.
    Text = 5,
    /// Fixed-length raw byte block.
    Buffer = 6,
}

impl PropertyType {
    /// Returns the lowercase name of this type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BitField => "bitfield",
            Self::Bool => "bool",
            Self::Enum => "enum",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Buffer => "buffer",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity and metadata shared by every property.
///
/// # Example
///
/// ```rust
/// use rangekit_property::{Category, DeviceId, Features, PropertyDescriptor, PropertyId};
///
/// let descriptor = PropertyDescriptor::builder(PropertyId::new(0x20))
///     .device_id(DeviceId::new(0x51))
///     .category(Category::CONFIGURATION)
///     .features(Features::EDITABLE | Features::PERSISTED)
///     .description("Accumulation exponent")
///     .build();
///
/// assert_eq!(descriptor.id(), PropertyId::new(0x20));
/// assert!(descriptor.is_editable());
/// assert_eq!(descriptor.description(), "Accumulation exponent");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDescriptor {
    id: PropertyId,
    device_id: DeviceId,
    category: Category,
    features: Features,
    description: String,
}

impl PropertyDescriptor {
    /// Starts building a descriptor for `id`.
    #[must_use]
    pub fn builder(id: PropertyId) -> PropertyDescriptorBuilder {
        PropertyDescriptorBuilder::new(id)
    }

    /// Returns the stable id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Returns the device-protocol id.
    #[must_use]
    #[inline]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Returns the category.
    #[must_use]
    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the feature flags.
    #[must_use]
    #[inline]
    pub fn features(&self) -> Features {
        self.features
    }

    /// Returns the human-readable description.
    #[must_use]
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns `true` if `set_*` writes are allowed.
    #[must_use]
    #[inline]
    pub fn is_editable(&self) -> bool {
        self.features.contains(Features::EDITABLE)
    }

    pub(crate) fn set_device_id(&mut self, device_id: DeviceId) {
        self.device_id = device_id;
    }

    pub(crate) fn set_id(&mut self, id: PropertyId) {
        self.id = id;
    }
}

/// Builder for [`PropertyDescriptor`].
///
/// Unset fields default to an unmapped device id, [`Category::OTHER`],
/// [`Features::EDITABLE`] and an empty description.
#[derive(Clone, Debug)]
pub struct PropertyDescriptorBuilder {
    id: PropertyId,
    device_id: DeviceId,
    category: Category,
    features: Features,
    description: String,
}

impl PropertyDescriptorBuilder {
    /// Creates a builder for `id` with every other field at its default.
    #[must_use]
    pub fn new(id: PropertyId) -> Self {
        Self {
            id,
            device_id: DeviceId::UNMAPPED,
            category: Category::default(),
            features: Features::default(),
            description: String::new(),
        }
    }

    /// Sets the device-protocol id.
    #[must_use]
    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = device_id;
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Replaces the feature flags.
    #[must_use]
    pub fn features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Adds or removes [`Features::EDITABLE`].
    #[must_use]
    pub fn editable(mut self, editable: bool) -> Self {
        self.features.set(Features::EDITABLE, editable);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn build(self) -> PropertyDescriptor {
        PropertyDescriptor {
            id: self.id,
            device_id: self.device_id,
            category: self.category,
            features: self.features,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let descriptor = PropertyDescriptor::builder(PropertyId::new(1)).build();
        assert_eq!(descriptor.device_id(), DeviceId::UNMAPPED);
        assert_eq!(descriptor.category(), Category::OTHER);
        assert_eq!(descriptor.features(), Features::EDITABLE);
        assert!(descriptor.description().is_empty());
    }

    #[test]
    fn builder_editable_toggle() {
        let descriptor = PropertyDescriptor::builder(PropertyId::new(1))
            .features(Features::PERSISTED | Features::EDITABLE)
            .editable(false)
            .build();
        assert!(!descriptor.is_editable());
        assert_eq!(descriptor.features(), Features::PERSISTED);
    }

    #[test]
    fn flag_values_match_device_tables() {
        assert_eq!(Category::CONFIGURATION.bits(), 8);
        assert_eq!(Category::CONSTANT.bits(), 16);
        assert_eq!(Features::EDITABLE.bits(), 2);
        assert_eq!(Features::NO_MODIFIED_WARNING.bits(), 8);
        assert_eq!(PropertyType::Buffer as u8, 6);
    }

    #[test]
    fn type_names() {
        assert_eq!(PropertyType::BitField.to_string(), "bitfield");
        assert_eq!(PropertyType::Integer.name(), "integer");
    }
}
