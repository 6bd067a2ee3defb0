// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property definition documents.
//!
//! A definition document describes a set of properties in JSON so that a
//! device's property table can be shipped as data:
//!
//! ```json
//! {
//!   "properties": [
//!     { "id": "0x10", "deviceid": "0x10", "type": "int", "size": 2,
//!       "count": 1, "category": "CAT_CONFIGURATION", "signed": true,
//!       "limits": [-100, 100], "value": "5" },
//!     { "deviceid": "0x11", "type": "enum", "size": 4, "count": 1,
//!       "category": "CAT_CONFIGURATION",
//!       "values": { "9600": 9600, "115200": 115200 }, "value": "9600" }
//!   ]
//! }
//! ```
//!
//! Entries that are not objects, or that lack one of `deviceid`, `type`,
//! `size`, `count` or `category`, are skipped. Every loaded property starts
//! clean: its initial values are written with the edit gate bypassed and
//! then accepted as the device state.

use serde::Deserialize;
use thiserror::Error;

use crate::base::PropertyKind;
use crate::bitfield::BitFieldProperty;
use crate::boolean::BoolProperty;
use crate::buffer::BufferProperty;
use crate::container::PropertyContainer;
use crate::descriptor::{Category, PropertyDescriptor};
use crate::enumeration::{EnumProperty, EnumStorage};
use crate::error::PropertyError;
use crate::float::FloatProperty;
use crate::id::{DeviceId, PropertyId};
use crate::integer::IntegerProperty;
use crate::property::Property;
use crate::text::{TextEncoding, TextProperty};

/// How the ids of a definition entry are chosen.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum IdMapping {
    /// The `deviceid` member is used as both the property id and the
    /// device id. `id` is ignored.
    #[default]
    DeviceIdOnly,
    /// `id` and `deviceid` are read separately. Entries without `id` are
    /// skipped.
    Both,
}

/// Errors produced while loading a definition document.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("malformed property definition document")]
    Json(#[from] serde_json::Error),
    /// An id member is not a hexadecimal number of the right width.
    #[error("invalid hexadecimal id `{text}`")]
    InvalidId {
        /// The offending text.
        text: String,
    },
    /// An entry maps onto device id 0.
    #[error("property definition {index} has device id 0")]
    UnmappedDeviceId {
        /// Position of the entry in the `properties` array.
        index: usize,
    },
    /// The `category` member is not one of the `CAT_*` names.
    #[error("property {id}: unknown category `{category}`")]
    InvalidCategory {
        /// The property being defined.
        id: PropertyId,
        /// The offending category name.
        category: String,
    },
    /// The `type` member is not a known property type.
    #[error("property {id}: unknown property type `{kind}`")]
    InvalidType {
        /// The property being defined.
        id: PropertyId,
        /// The offending type name.
        kind: String,
    },
    /// A member required by the property type is missing or malformed.
    #[error("property {id}: missing or invalid `{member}`")]
    InvalidMember {
        /// The property being defined.
        id: PropertyId,
        /// Name of the member.
        member: &'static str,
    },
    /// Building, initializing or registering the property failed.
    #[error("property {id} rejected")]
    Property {
        /// The property being defined.
        id: PropertyId,
        /// The underlying failure.
        #[source]
        source: PropertyError,
    },
}

#[derive(Debug, Deserialize)]
struct Document {
    properties: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    #[serde(rename = "deviceid")]
    device_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    size: Option<usize>,
    count: Option<usize>,
    category: Option<String>,
    #[serde(default = "default_editable")]
    editable: bool,
    values: Option<serde_json::Map<String, serde_json::Value>>,
    scale: Option<u32>,
    #[serde(default = "default_decimals")]
    decimals: u8,
    #[serde(default)]
    signed: bool,
    limits: Option<[i64; 2]>,
    value: Option<InitialValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InitialValue {
    All(String),
    PerElement(Vec<String>),
}

fn default_editable() -> bool {
    true
}

fn default_decimals() -> u8 {
    3
}

fn parse_hex(text: &str) -> Result<u32, DefinitionError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|_| DefinitionError::InvalidId {
        text: text.to_owned(),
    })
}

fn parse_category(id: PropertyId, name: &str) -> Result<Category, DefinitionError> {
    Ok(match name {
        "CAT_OTHER" => Category::OTHER,
        "CAT_INFO" => Category::INFO,
        "CAT_CALIBRATION" => Category::CALIBRATION,
        "CAT_CONFIGURATION" => Category::CONFIGURATION,
        "CAT_CONSTANT" => Category::CONSTANT,
        _ => {
            return Err(DefinitionError::InvalidCategory {
                id,
                category: name.to_owned(),
            });
        }
    })
}

/// Entry members every property type needs.
struct Required<'a> {
    id: PropertyId,
    device_id: DeviceId,
    kind: &'a str,
    size: usize,
    count: usize,
    category: Category,
}

impl Entry {
    /// Resolves the required members, or `None` if the entry is skipped.
    fn required(
        &self,
        index: usize,
        mapping: IdMapping,
    ) -> Result<Option<Required<'_>>, DefinitionError> {
        let (Some(device_text), Some(kind), Some(size), Some(count), Some(category)) = (
            self.device_id.as_deref(),
            self.kind.as_deref(),
            self.size,
            self.count,
            self.category.as_deref(),
        ) else {
            return Ok(None);
        };
        let raw_device_id = parse_hex(device_text)?;
        if raw_device_id == 0 {
            return Err(DefinitionError::UnmappedDeviceId { index });
        }
        let device_id =
            u16::try_from(raw_device_id).map_err(|_| DefinitionError::InvalidId {
                text: device_text.to_owned(),
            })?;
        let id = match mapping {
            IdMapping::DeviceIdOnly => raw_device_id,
            IdMapping::Both => match self.id.as_deref() {
                Some(text) => parse_hex(text)?,
                None => return Ok(None),
            },
        };
        let id = PropertyId::new(id);
        Ok(Some(Required {
            id,
            device_id: DeviceId::new(device_id),
            kind,
            size,
            count,
            category: parse_category(id, category)?,
        }))
    }

    fn build(&self, required: &Required<'_>) -> Result<Property, DefinitionError> {
        let id = required.id;
        let rejected = |source| DefinitionError::Property { id, source };
        let descriptor = PropertyDescriptor::builder(id)
            .device_id(required.device_id)
            .category(required.category)
            .editable(self.editable)
            .build();
        let size = required.size;

        let property: Property = match required.kind {
            "bit" => BitFieldProperty::new(descriptor, size).map_err(rejected)?.into(),
            "bool" => BoolProperty::new(descriptor).map_err(rejected)?.into(),
            "buffer" => BufferProperty::new(descriptor, size).map_err(rejected)?.into(),
            "text" => TextProperty::new(descriptor, size, TextEncoding::Ascii)
                .map_err(rejected)?
                .into(),
            "enum" => {
                let values = self.values.as_ref().ok_or(DefinitionError::InvalidMember {
                    id,
                    member: "values",
                })?;
                let mut property =
                    EnumProperty::new(descriptor, size, EnumStorage::Value).map_err(rejected)?;
                for (label, value) in values {
                    let value = value.as_u64().ok_or(DefinitionError::InvalidMember {
                        id,
                        member: "values",
                    })?;
                    property
                        .add_enum_pair(value, label.as_str())
                        .map_err(rejected)?;
                }
                property.into()
            }
            "float" => {
                let scale = self.scale.ok_or(DefinitionError::InvalidMember {
                    id,
                    member: "scale",
                })?;
                FloatProperty::new(descriptor, size, scale, self.decimals)
                    .map_err(rejected)?
                    .into()
            }
            "int" => {
                let mut property =
                    IntegerProperty::new(descriptor, size, self.signed).map_err(rejected)?;
                if let Some([min, max]) = self.limits {
                    property.set_limits(min, max).map_err(rejected)?;
                }
                property.into()
            }
            other => {
                return Err(DefinitionError::InvalidType {
                    id,
                    kind: other.to_owned(),
                });
            }
        };
        Ok(property)
    }

    fn apply_values(&self, property: &mut Property, required: &Required<'_>) -> Result<(), PropertyError> {
        if required.count != 0 {
            property.set_count(required.count)?;
        }
        match &self.value {
            None => {}
            Some(InitialValue::All(text)) => {
                let text = if text.is_empty() && matches!(required.kind, "int" | "float") {
                    "0"
                } else {
                    text.as_str()
                };
                for index in 0..property.count() {
                    property.force_string_value(index, text)?;
                }
            }
            Some(InitialValue::PerElement(texts)) => {
                for (index, text) in texts.iter().enumerate() {
                    property.force_string_value(index, text)?;
                }
            }
        }
        property.set_clean();
        Ok(())
    }
}

impl PropertyContainer {
    /// Builds and adds every property described by a definition document.
    ///
    /// Returns the number of properties added. On failure the container is
    /// left as it was before the call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rangekit_property::{IdMapping, IntegerProperty, PropertyContainer, PropertyId};
    ///
    /// let mut container = PropertyContainer::new();
    /// let added = container.load_definitions(
    ///     r#"{ "properties": [
    ///         { "deviceid": "0x20", "type": "int", "size": 2, "count": 1,
    ///           "category": "CAT_CONFIGURATION", "value": "12" }
    ///     ] }"#,
    ///     IdMapping::DeviceIdOnly,
    /// )?;
    /// assert_eq!(added, 1);
    /// let gain = container.get::<IntegerProperty>(PropertyId::new(0x20))?;
    /// assert_eq!(gain.value(0)?, 12);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_definitions(
        &mut self,
        json: &str,
        mapping: IdMapping,
    ) -> Result<usize, DefinitionError> {
        let document: Document = serde_json::from_str(json)?;
        let mut added = Vec::new();
        let result = self.load_entries(&document, mapping, &mut added);
        if result.is_err() {
            for id in added.drain(..) {
                self.remove(id);
            }
        }
        result?;
        tracing::debug!(added = added.len(), total = self.len(), "loaded property definitions");
        Ok(added.len())
    }

    fn load_entries(
        &mut self,
        document: &Document,
        mapping: IdMapping,
        added: &mut Vec<PropertyId>,
    ) -> Result<(), DefinitionError> {
        for (index, value) in document.properties.iter().enumerate() {
            if !value.is_object() {
                tracing::debug!(index, "skipping non-object property definition");
                continue;
            }
            let entry = Entry::deserialize(value)?;
            let Some(required) = entry.required(index, mapping)? else {
                tracing::debug!(index, "skipping incomplete property definition");
                continue;
            };
            let id = required.id;
            let mut property = entry.build(&required)?;
            entry
                .apply_values(&mut property, &required)
                .map_err(|source| DefinitionError::Property { id, source })?;
            self.add(property)
                .map_err(|source| DefinitionError::Property { id, source })?;
            added.push(id);
        }
        Ok(())
    }
}
