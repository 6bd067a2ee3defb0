// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for property storage operations.

use thiserror::Error;

use crate::descriptor::PropertyType;
use crate::id::{DeviceId, PropertyId};

/// Result alias used throughout this crate.
pub type Result<T, E = PropertyError> = core::result::Result<T, E>;

/// Broad classification of a [`PropertyError`].
///
/// Callers that only need to branch on the class of failure (for example a
/// protocol layer deciding whether to report a device-side range error)
/// can match on this instead of on individual variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed construction parameters or malformed text input.
    InvalidArgument,
    /// An index, value, size or narrowing conversion exceeds a bound.
    OutOfRange,
    /// The operation does not apply to this property (type, sign or
    /// exclusivity mismatch).
    Logic,
    /// The property refuses the operation in its current state.
    PolicyViolation,
    /// A throwing lookup did not find the requested property.
    NotFound,
}

/// Errors produced by properties and containers.
///
/// Every failed operation leaves the current and backup storage of the
/// property it was applied to unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PropertyError {
    // === Policy ===
    /// The property lacks the `EDITABLE` feature and the write was not forced.
    #[error("property {id} is not editable")]
    NotEditable { id: PropertyId },

    /// The property was read before any value was written.
    #[error("property {id} is not initialized")]
    NotInitialized { id: PropertyId },

    // === Range ===
    /// Element index beyond the current count.
    #[error("property {id}: index {index} out of range (count {count})")]
    IndexOutOfRange {
        id: PropertyId,
        index: usize,
        count: usize,
    },

    /// Value outside the admissible range of the property.
    #[error("property {id}: value {value} outside [{min}, {max}]")]
    ValueOutOfRange {
        id: PropertyId,
        value: String,
        min: String,
        max: String,
    },

    /// Text or byte input longer than the element can hold.
    #[error("property {id}: length {len} exceeds maximum {max}")]
    TooLong { id: PropertyId, len: usize, max: usize },

    /// The stored value cannot be represented in the requested type.
    #[error("property {id}: stored value {value} does not fit in {target}")]
    Narrowing {
        id: PropertyId,
        value: String,
        target: &'static str,
    },

    /// Any other bound violation.
    #[error("property {id}: {reason}")]
    OutOfRange { id: PropertyId, reason: String },

    // === Malformed input ===
    /// Text that does not parse in the property's text format.
    #[error("property {id}: cannot parse {text:?}: {reason}")]
    InvalidText {
        id: PropertyId,
        text: String,
        reason: &'static str,
    },

    /// Malformed construction parameters or arguments.
    #[error("property {id}: {reason}")]
    InvalidArgument { id: PropertyId, reason: String },

    // === Logic ===
    /// More than one bit covered by the exclusivity mask would be set.
    #[error("property {id}: value {value:#x} sets more than one bit of exclusivity mask {mask:#x}")]
    Exclusivity { id: PropertyId, value: u64, mask: u64 },

    /// The operation does not apply to this property.
    #[error("property {id}: {reason}")]
    Logic { id: PropertyId, reason: &'static str },

    /// A typed lookup found a property of another type.
    #[error("property {id} is a {actual} property, not {expected}")]
    TypeMismatch {
        id: PropertyId,
        expected: PropertyType,
        actual: PropertyType,
    },

    // === Container ===
    /// No property with this id.
    #[error("property {id} not found")]
    NotFound { id: PropertyId },

    /// No property with this device id.
    #[error("no property with device id {device_id}")]
    DeviceIdNotFound { device_id: DeviceId },

    /// A property with this id is already registered.
    #[error("property {id} is already registered")]
    DuplicateId { id: PropertyId },

    /// Another property already uses this device id.
    #[error("device id {device_id} of property {id} is already used by property {existing}")]
    DuplicateDeviceId {
        id: PropertyId,
        device_id: DeviceId,
        existing: PropertyId,
    },
}

impl PropertyError {
    /// Returns the broad classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotEditable { .. } | Self::NotInitialized { .. } => ErrorKind::PolicyViolation,
            Self::IndexOutOfRange { .. }
            | Self::ValueOutOfRange { .. }
            | Self::TooLong { .. }
            | Self::Narrowing { .. }
            | Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidText { .. }
            | Self::InvalidArgument { .. }
            | Self::DuplicateId { .. }
            | Self::DuplicateDeviceId { .. } => ErrorKind::InvalidArgument,
            Self::Exclusivity { .. } | Self::Logic { .. } | Self::TypeMismatch { .. } => {
                ErrorKind::Logic
            }
            Self::NotFound { .. } | Self::DeviceIdNotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Returns the id of the property the error concerns, if any.
    #[must_use]
    pub fn property_id(&self) -> Option<PropertyId> {
        match self {
            Self::NotEditable { id }
            | Self::NotInitialized { id }
            | Self::IndexOutOfRange { id, .. }
            | Self::ValueOutOfRange { id, .. }
            | Self::TooLong { id, .. }
            | Self::Narrowing { id, .. }
            | Self::OutOfRange { id, .. }
            | Self::InvalidText { id, .. }
            | Self::InvalidArgument { id, .. }
            | Self::Exclusivity { id, .. }
            | Self::Logic { id, .. }
            | Self::TypeMismatch { id, .. }
            | Self::NotFound { id }
            | Self::DuplicateId { id }
            | Self::DuplicateDeviceId { id, .. } => Some(*id),
            Self::DeviceIdNotFound { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let id = PropertyId::new(1);
        assert_eq!(
            PropertyError::NotEditable { id }.kind(),
            ErrorKind::PolicyViolation
        );
        assert_eq!(
            PropertyError::Narrowing {
                id,
                value: "-1".into(),
                target: "u8",
            }
            .kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            PropertyError::Exclusivity {
                id,
                value: 3,
                mask: 3,
            }
            .kind(),
            ErrorKind::Logic
        );
        assert_eq!(
            PropertyError::DeviceIdNotFound {
                device_id: DeviceId::new(9),
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn messages_name_the_property() {
        let err = PropertyError::IndexOutOfRange {
            id: PropertyId::new(0x10),
            index: 4,
            count: 2,
        };
        assert_eq!(err.to_string(), "property 0x10: index 4 out of range (count 2)");
        assert_eq!(err.property_id(), Some(PropertyId::new(0x10)));
    }
}
