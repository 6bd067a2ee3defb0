// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property identification types.
//!
//! This module provides [`PropertyId`], the process-stable identity of a
//! property, and [`DeviceId`], the identifier a property is known by on the
//! device protocol.

use core::fmt;

/// A process-stable property identifier.
///
/// Identifiers are assigned by the driver that builds the property and must
/// be non-zero; property constructors reject [`PropertyId::new(0)`](Self::new).
///
/// # Example
///
/// ```rust
/// use rangekit_property::PropertyId;
///
/// let id = PropertyId::new(0x1001);
/// assert_eq!(id.get(), 0x1001);
/// assert!(id.is_valid());
/// assert_eq!(format!("{id}"), "0x1001");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u32);

impl PropertyId {
    /// Creates a property ID from its raw value.
    #[must_use]
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this property ID.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` if this ID may identify a property (it is non-zero).
    #[must_use]
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({:#x})", self.0)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The identifier a property is addressed by on the device protocol.
///
/// [`DeviceId::UNMAPPED`] (zero) marks a property that has no wire mapping.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceId(u16);

impl DeviceId {
    /// The device ID of a property that is not mapped onto the wire.
    pub const UNMAPPED: Self = Self(0);

    /// Creates a device ID from its raw value.
    #[must_use]
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this device ID.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Returns `true` if the property is addressed on the wire.
    #[must_use]
    #[inline]
    pub const fn is_mapped(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({:#x})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_id_basics() {
        let id = PropertyId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(id, PropertyId::new(42));
        assert_ne!(id, PropertyId::new(43));
        assert!(!PropertyId::new(0).is_valid());
    }

    #[test]
    fn property_id_formatting() {
        let id = PropertyId::new(0x2a);
        assert_eq!(format!("{id:?}"), "PropertyId(0x2a)");
        assert_eq!(format!("{id}"), "0x2a");
    }

    #[test]
    fn device_id_unmapped() {
        assert_eq!(DeviceId::default(), DeviceId::UNMAPPED);
        assert!(!DeviceId::UNMAPPED.is_mapped());
        assert!(DeviceId::new(0x10).is_mapped());
        assert_eq!(format!("{:?}", DeviceId::new(0x10)), "DeviceId(0x10)");
    }

    #[test]
    fn ids_order_by_raw_value() {
        let mut ids = [PropertyId::new(3), PropertyId::new(1), PropertyId::new(2)];
        ids.sort();
        assert_eq!(ids.map(PropertyId::get), [1, 2, 3]);
    }
}
