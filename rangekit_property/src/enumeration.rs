// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enumerated properties backed by a (value, label) table.

use rangekit_signal::SignalKind;

use crate::base::{Access, PropertyCore, PropertyKind};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};
use crate::storage;

/// What an [`EnumProperty`] writes into its storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum EnumStorage {
    /// The raw value of the selected entry.
    #[default]
    Value,
    /// The position of the selected entry in the table.
    Index,
}

/// A property whose values must come from a table of labelled entries.
///
/// Entries keep insertion order; an entry's position in that order is its
/// index.
///
/// # Example
///
/// ```rust
/// use rangekit_property::{EnumProperty, EnumStorage, PropertyDescriptor, PropertyId, PropertyKind};
///
/// let mut baud = EnumProperty::new(
///     PropertyDescriptor::builder(PropertyId::new(0x70)).build(),
///     4,
///     EnumStorage::Value,
/// )?;
/// baud.add_enum_pair(9600, "9600")?;
/// baud.add_enum_pair(115_200, "115200")?;
///
/// baud.set_string_value(0, "115200")?;
/// assert_eq!(baud.value(0)?, 115_200);
/// assert_eq!(baud.value_index(0)?, 1);
/// assert!(baud.set_string_value(0, "4800").is_err());
/// # Ok::<(), rangekit_property::PropertyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct EnumProperty {
    core: PropertyCore,
    mode: EnumStorage,
    entries: Vec<(u64, String)>,
}

impl EnumProperty {
    /// Creates an uninitialized enum property of `unit_size` bytes
    /// (1, 2, 4 or 8) with an empty table.
    pub fn new(descriptor: PropertyDescriptor, unit_size: usize, mode: EnumStorage) -> Result<Self> {
        let core = PropertyCore::new(descriptor, unit_size, unit_size)?;
        if !storage::is_integer_width(unit_size) {
            return Err(PropertyError::InvalidArgument {
                id: core.id(),
                reason: format!("enum unit size must be 1, 2, 4 or 8, not {unit_size}"),
            });
        }
        Ok(Self {
            core,
            mode,
            entries: Vec::new(),
        })
    }

    /// What the storage holds for the selected entry.
    #[must_use]
    pub fn storage_mode(&self) -> EnumStorage {
        self.mode
    }

    /// Appends an entry to the table. Emits `LimitsChanged`.
    pub fn add_enum_pair(&mut self, value: u64, label: impl Into<String>) -> Result<()> {
        let id = self.core.id();
        let max = storage::unsigned_max(self.core.unit_size());
        if value > max {
            return Err(PropertyError::InvalidArgument {
                id,
                reason: format!("enum value {value} exceeds the unit maximum {max}"),
            });
        }
        if self.mode == EnumStorage::Index && self.entries.len() as u64 > max {
            return Err(PropertyError::InvalidArgument {
                id,
                reason: format!("enum index {} exceeds the unit maximum {max}", self.entries.len()),
            });
        }
        if self.entries.iter().any(|(existing, _)| *existing == value) {
            return Err(PropertyError::InvalidArgument {
                id,
                reason: format!("enum value {value} is already in the table"),
            });
        }
        self.entries.push((value, label.into()));
        self.core.emit(SignalKind::LimitsChanged);
        Ok(())
    }

    /// Removes every entry. Emits `LimitsChanged`.
    pub fn clear_enum(&mut self) {
        self.entries.clear();
        self.core.emit(SignalKind::LimitsChanged);
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn enum_size(&self) -> usize {
        self.entries.len()
    }

    /// The (value, label) entries in index order.
    #[must_use]
    pub fn entries(&self) -> &[(u64, String)] {
        &self.entries
    }

    /// Label of the entry at `enum_index`.
    pub fn enum_text(&self, enum_index: usize) -> Result<&str> {
        self.entries
            .get(enum_index)
            .map(|(_, label)| label.as_str())
            .ok_or_else(|| self.no_entry(format!("no enum entry at index {enum_index}")))
    }

    /// Raw value of the entry at `enum_index`.
    pub fn enum_value(&self, enum_index: usize) -> Result<u64> {
        self.entries
            .get(enum_index)
            .map(|(value, _)| *value)
            .ok_or_else(|| self.no_entry(format!("no enum entry at index {enum_index}")))
    }

    /// Index of the entry whose raw value is `value`.
    pub fn enum_index_from_value(&self, value: u64) -> Result<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| *existing == value)
            .ok_or_else(|| self.no_entry(format!("no enum entry with value {value}")))
    }

    /// Raw value of the entry labelled `label`.
    pub fn key_from_label(&self, label: &str) -> Result<u64> {
        self.entries
            .iter()
            .find(|(_, existing)| existing == label)
            .map(|(value, _)| *value)
            .ok_or_else(|| self.no_entry(format!("no enum entry labelled {label:?}")))
    }

    /// Raw value selected by element `index`.
    pub fn value(&self, index: usize) -> Result<u64> {
        let stored = storage::decode_unsigned(self.core.read(index)?);
        self.resolve(stored)
    }

    /// Raw value last confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<u64> {
        let stored = storage::decode_unsigned(self.core.read_backup(index)?);
        self.resolve(stored)
    }

    /// Table index selected by element `index`.
    pub fn value_index(&self, index: usize) -> Result<usize> {
        let stored = storage::decode_unsigned(self.core.read(index)?);
        match self.mode {
            EnumStorage::Value => self.enum_index_from_value(stored),
            EnumStorage::Index => self.stored_index(stored),
        }
    }

    fn resolve(&self, stored: u64) -> Result<u64> {
        match self.mode {
            EnumStorage::Value => Ok(stored),
            EnumStorage::Index => self.enum_value(self.stored_index(stored)?),
        }
    }

    fn stored_index(&self, stored: u64) -> Result<usize> {
        usize::try_from(stored)
            .ok()
            .filter(|index| *index < self.entries.len())
            .ok_or_else(|| self.no_entry(format!("stored enum index {stored} has no entry")))
    }

    /// Selects the entry with raw value `value`, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, value: u64) -> Result<()> {
        self.write(index, value, Access::Checked)
    }

    /// Selects the entry with raw value `value`, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, value: u64) -> Result<()> {
        self.write(index, value, Access::Forced)
    }

    /// Selects the entry at `enum_index`, honoring the edit gate.
    pub fn set_value_index(&mut self, index: usize, enum_index: usize) -> Result<()> {
        self.write_index(index, enum_index, Access::Checked)
    }

    /// Selects the entry at `enum_index`, bypassing the edit gate.
    pub fn force_value_index(&mut self, index: usize, enum_index: usize) -> Result<()> {
        self.write_index(index, enum_index, Access::Forced)
    }

    pub(crate) fn write(&mut self, index: usize, value: u64, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        let enum_index = self.enum_index_from_value(value)?;
        self.commit(index, enum_index);
        Ok(())
    }

    fn write_index(&mut self, index: usize, enum_index: usize, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        self.enum_value(enum_index)?;
        self.commit(index, enum_index);
        Ok(())
    }

    fn commit(&mut self, index: usize, enum_index: usize) {
        let stored = match self.mode {
            EnumStorage::Value => self.entries[enum_index].0,
            EnumStorage::Index => enum_index as u64,
        };
        let bytes = storage::encode_unsigned(stored, self.core.unit_size());
        self.core.commit(index, &bytes);
    }

    fn no_entry(&self, reason: String) -> PropertyError {
        PropertyError::OutOfRange {
            id: self.core.id(),
            reason,
        }
    }
}

impl PropertyKind for EnumProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::Enum
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    /// The label of the selected entry, or the stored number when it
    /// matches no entry.
    fn string_value(&self, index: usize) -> Result<String> {
        let stored = storage::decode_unsigned(self.core.read(index)?);
        let label = match self.mode {
            EnumStorage::Value => self
                .entries
                .iter()
                .find(|(value, _)| *value == stored)
                .map(|(_, label)| label),
            EnumStorage::Index => usize::try_from(stored)
                .ok()
                .and_then(|i| self.entries.get(i))
                .map(|(_, label)| label),
        };
        Ok(label.cloned().unwrap_or_else(|| stored.to_string()))
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        let value = self.key_from_label(text)?;
        self.write(index, value, access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{descriptor, signal_log};

    fn baud(mode: EnumStorage) -> EnumProperty {
        let mut prop = EnumProperty::new(descriptor(1), 4, mode).unwrap();
        prop.add_enum_pair(9600, "9600").unwrap();
        prop.add_enum_pair(57_600, "57600").unwrap();
        prop
    }

    #[test]
    fn label_lookup() {
        let mut prop = baud(EnumStorage::Value);
        prop.set_string_value(0, "9600").unwrap();
        assert_eq!(prop.value(0).unwrap(), 9600);
        assert_eq!(prop.value_index(0).unwrap(), 0);
        assert_eq!(prop.string_value(0).unwrap(), "9600");

        let err = prop.set_string_value(0, "4800").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(prop.value(0).unwrap(), 9600);
    }

    #[test]
    fn index_mode_stores_position() {
        let mut prop = baud(EnumStorage::Index);
        prop.set_value(0, 57_600).unwrap();
        assert_eq!(prop.storage(), &[1, 0, 0, 0]);
        assert_eq!(prop.value(0).unwrap(), 57_600);
        assert_eq!(prop.value_index(0).unwrap(), 1);
        assert_eq!(prop.string_value(0).unwrap(), "57600");
    }

    #[test]
    fn value_mode_stores_value() {
        let mut prop = baud(EnumStorage::Value);
        prop.set_value_index(0, 1).unwrap();
        assert_eq!(prop.storage(), &57_600_u32.to_le_bytes());
        assert_eq!(
            prop.set_value_index(0, 2).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn unknown_stored_value_renders_as_number() {
        let mut prop = baud(EnumStorage::Value);
        prop.set_raw_storage(&1200_u32.to_le_bytes(), 4).unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "1200");
        assert_eq!(prop.value(0).unwrap(), 1200);
        assert_eq!(prop.value_index(0).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn table_validation() {
        let mut prop = EnumProperty::new(descriptor(1), 1, EnumStorage::Value).unwrap();
        assert_eq!(
            prop.add_enum_pair(256, "too big").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        prop.add_enum_pair(1, "one").unwrap();
        assert_eq!(
            prop.add_enum_pair(1, "uno").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(prop.key_from_label("one").unwrap(), 1);
        assert_eq!(prop.enum_text(0).unwrap(), "one");
        assert!(prop.enum_text(1).is_err());
    }

    #[test]
    fn table_changes_emit_limits_changed() {
        let mut prop = baud(EnumStorage::Value);
        let log = signal_log(&prop);
        prop.add_enum_pair(115_200, "115200").unwrap();
        prop.clear_enum();
        assert_eq!(
            *log.borrow(),
            [SignalKind::LimitsChanged, SignalKind::LimitsChanged]
        );
        assert_eq!(prop.enum_size(), 0);
    }
}
