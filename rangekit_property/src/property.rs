// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed set of property types.
//!
//! [`Property`] is the value a container stores: one variant per typed
//! property. [`PropertyVariant`] connects each typed property to its variant
//! so lookups can be written as `container.get::<IntegerProperty>(id)`.

use crate::base::{Access, PropertyCore, PropertyKind};
use crate::bitfield::BitFieldProperty;
use crate::boolean::BoolProperty;
use crate::buffer::BufferProperty;
use crate::descriptor::PropertyType;
use crate::enumeration::EnumProperty;
use crate::error::{PropertyError, Result};
use crate::float::FloatProperty;
use crate::integer::IntegerProperty;
use crate::text::TextProperty;
use crate::value::PropertyValue;

/// Any property.
#[derive(Clone, Debug)]
pub enum Property {
    /// A [`BitFieldProperty`].
    BitField(BitFieldProperty),
    /// A [`BoolProperty`].
    Bool(BoolProperty),
    /// An [`EnumProperty`].
    Enum(EnumProperty),
    /// A [`FloatProperty`].
    Float(FloatProperty),
    /// An [`IntegerProperty`].
    Integer(IntegerProperty),
    /// A [`TextProperty`].
    Text(TextProperty),
    /// A [`BufferProperty`].
    Buffer(BufferProperty),
}

macro_rules! dispatch {
    ($property:expr, $inner:ident => $body:expr) => {
        match $property {
            Property::BitField($inner) => $body,
            Property::Bool($inner) => $body,
            Property::Enum($inner) => $body,
            Property::Float($inner) => $body,
            Property::Integer($inner) => $body,
            Property::Text($inner) => $body,
            Property::Buffer($inner) => $body,
        }
    };
}

/// A typed property that is one variant of [`Property`].
pub trait PropertyVariant: PropertyKind + Sized + 'static {
    /// The type tag of this variant.
    const TYPE: PropertyType;

    /// Borrows the typed property if `property` is this variant.
    fn from_property(property: &Property) -> Option<&Self>;

    /// Mutably borrows the typed property if `property` is this variant.
    fn from_property_mut(property: &mut Property) -> Option<&mut Self>;

    /// Wraps the typed property.
    fn into_property(self) -> Property;
}

macro_rules! variant {
    ($ty:ident, $variant:ident) => {
        impl PropertyVariant for $ty {
            const TYPE: PropertyType = PropertyType::$variant;

            fn from_property(property: &Property) -> Option<&Self> {
                match property {
                    Property::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_property_mut(property: &mut Property) -> Option<&mut Self> {
                match property {
                    Property::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_property(self) -> Property {
                Property::$variant(self)
            }
        }

        impl From<$ty> for Property {
            fn from(property: $ty) -> Self {
                Self::$variant(property)
            }
        }
    };
}

variant!(BitFieldProperty, BitField);
variant!(BoolProperty, Bool);
variant!(EnumProperty, Enum);
variant!(FloatProperty, Float);
variant!(IntegerProperty, Integer);
variant!(TextProperty, Text);
variant!(BufferProperty, Buffer);

impl Property {
    /// Returns `true` if this is a `T`.
    #[must_use]
    pub fn is<T: PropertyVariant>(&self) -> bool {
        T::from_property(self).is_some()
    }

    /// Borrows this property as a `T`.
    #[must_use]
    pub fn downcast_ref<T: PropertyVariant>(&self) -> Option<&T> {
        T::from_property(self)
    }

    /// Mutably borrows this property as a `T`.
    #[must_use]
    pub fn downcast_mut<T: PropertyVariant>(&mut self) -> Option<&mut T> {
        T::from_property_mut(self)
    }

    /// Borrows this property as a `T`, failing with a logic error otherwise.
    pub fn expect_ref<T: PropertyVariant>(&self) -> Result<&T> {
        let actual = self.property_type();
        let id = self.id();
        T::from_property(self).ok_or(PropertyError::TypeMismatch {
            id,
            expected: T::TYPE,
            actual,
        })
    }

    /// Mutably borrows this property as a `T`, failing with a logic error otherwise.
    pub fn expect_mut<T: PropertyVariant>(&mut self) -> Result<&mut T> {
        let actual = self.property_type();
        let id = self.id();
        T::from_property_mut(self).ok_or(PropertyError::TypeMismatch {
            id,
            expected: T::TYPE,
            actual,
        })
    }

    /// Element `index` as a type-erased value.
    pub fn any_value(&self, index: usize) -> Result<PropertyValue> {
        Ok(match self {
            Self::Bool(p) => PropertyValue::Bool(p.value(index)?),
            Self::Integer(p) if p.is_signed() => PropertyValue::Signed(p.value(index)?),
            Self::Integer(p) => PropertyValue::Unsigned(p.value_unsigned(index)?),
            Self::Float(p) => PropertyValue::Float(p.value(index)?),
            Self::Enum(p) => PropertyValue::Unsigned(p.value(index)?),
            Self::BitField(p) => PropertyValue::Unsigned(p.value(index)?),
            Self::Text(p) => PropertyValue::Text(p.value(index)?),
            Self::Buffer(p) => PropertyValue::Bytes(p.value(index)?.to_vec()),
        })
    }

    /// Writes a type-erased value through the matching typed setter,
    /// honoring the edit gate.
    ///
    /// Integers, enums and bit fields accept signed or unsigned values,
    /// enums also accept a label. Any other mismatch fails with
    /// `InvalidArgument`.
    pub fn set_any_value(&mut self, index: usize, value: impl Into<PropertyValue>) -> Result<()> {
        self.write_any(index, value.into(), Access::Checked)
    }

    /// Writes a type-erased value through the matching typed setter,
    /// bypassing the edit gate.
    pub fn force_any_value(&mut self, index: usize, value: impl Into<PropertyValue>) -> Result<()> {
        self.write_any(index, value.into(), Access::Forced)
    }

    fn write_any(&mut self, index: usize, value: PropertyValue, access: Access) -> Result<()> {
        let id = self.id();
        let property_type = self.property_type();
        let mismatch = |value: &PropertyValue| PropertyError::InvalidArgument {
            id,
            reason: format!(
                "cannot assign a {} value to a {property_type} property",
                value.kind_name()
            ),
        };
        match self {
            Self::Bool(p) => match value {
                PropertyValue::Bool(v) => p.write(index, v, access),
                other => Err(mismatch(&other)),
            },
            Self::Integer(p) => match value {
                PropertyValue::Signed(v) => p.write(index, i128::from(v), access),
                PropertyValue::Unsigned(v) => p.write(index, i128::from(v), access),
                other => Err(mismatch(&other)),
            },
            Self::Float(p) => match value {
                PropertyValue::Float(v) => p.write(index, v, access),
                other => Err(mismatch(&other)),
            },
            Self::Enum(p) => match value {
                PropertyValue::Text(label) => {
                    p.core().check_edit(access)?;
                    let key = p.key_from_label(&label)?;
                    p.write(index, key, access)
                }
                other => match other.as_unsigned() {
                    Some(v) => p.write(index, v, access),
                    None => Err(mismatch(&other)),
                },
            },
            Self::BitField(p) => match value.as_unsigned() {
                Some(v) => p.write(index, v, access),
                None => Err(mismatch(&value)),
            },
            Self::Text(p) => match value {
                PropertyValue::Text(v) => p.write(index, &v, access),
                other => Err(mismatch(&other)),
            },
            Self::Buffer(p) => match value {
                PropertyValue::Bytes(v) => p.write(index, &v, access),
                other => Err(mismatch(&other)),
            },
        }
    }
}

impl PropertyKind for Property {
    fn property_type(&self) -> PropertyType {
        dispatch!(self, p => p.property_type())
    }

    fn core(&self) -> &PropertyCore {
        dispatch!(self, p => p.core())
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        dispatch!(self, p => p.core_mut())
    }

    fn string_value(&self, index: usize) -> Result<String> {
        dispatch!(self, p => p.string_value(index))
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        dispatch!(self, p => p.write_string_value(index, text, access))
    }

    fn write_raw_storage(&mut self, bytes: &[u8], element_size: usize, access: Access) -> Result<()> {
        dispatch!(self, p => p.write_raw_storage(bytes, element_size, access))
    }
}
