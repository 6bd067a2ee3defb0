// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased property values.
//!
//! [`PropertyValue`] carries a value of any property type across code that
//! does not know the concrete property, such as a generic configuration
//! loader or a protocol decoder working from a table of ids.

use core::fmt;

/// A property value of any supported kind.
///
/// # Example
///
/// ```rust
/// use rangekit_property::PropertyValue;
///
/// assert_eq!(PropertyValue::from(-3_i16), PropertyValue::Signed(-3));
/// assert_eq!(PropertyValue::from("ab"), PropertyValue::Text("ab".to_owned()));
/// assert_eq!(PropertyValue::from(true).kind_name(), "bool");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Signed(i64),
    /// An unsigned integer.
    Unsigned(u64),
    /// A float.
    Float(f32),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl PropertyValue {
    /// Short name of the value kind, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Signed(_) => "signed",
            Self::Unsigned(_) => "unsigned",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// The value as an unsigned integer, if it is a non-negative integer.
    #[must_use]
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Unsigned(value) => Some(*value),
            Self::Signed(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Bytes(value) => {
                for byte in value {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! impl_from {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from!(Bool: bool);
impl_from!(Signed: i8, i16, i32, i64);
impl_from!(Unsigned: u8, u16, u32, u64);
impl_from!(Float: f32);
impl_from!(Text: String, &str);
impl_from!(Bytes: Vec<u8>, &[u8]);
