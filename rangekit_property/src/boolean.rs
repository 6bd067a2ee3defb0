// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boolean properties.

use crate::base::{Access, PropertyCore, PropertyKind};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};

/// A property holding one byte per element, rendered as `"true"`/`"false"`.
#[derive(Clone, Debug)]
pub struct BoolProperty {
    core: PropertyCore,
}

impl BoolProperty {
    /// Creates an uninitialized boolean property.
    pub fn new(descriptor: PropertyDescriptor) -> Result<Self> {
        Ok(Self {
            core: PropertyCore::new(descriptor, 1, 1)?,
        })
    }

    /// Value of element `index`.
    pub fn value(&self, index: usize) -> Result<bool> {
        Ok(self.core.read(index)?[0] != 0)
    }

    /// Last value confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<bool> {
        Ok(self.core.read_backup(index)?[0] != 0)
    }

    /// Writes element `index`, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, value: bool) -> Result<()> {
        self.write(index, value, Access::Checked)
    }

    /// Writes element `index`, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, value: bool) -> Result<()> {
        self.write(index, value, Access::Forced)
    }

    pub(crate) fn write(&mut self, index: usize, value: bool, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        self.core.commit(index, &[u8::from(value)]);
        Ok(())
    }
}

impl PropertyKind for BoolProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::Bool
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn string_value(&self, index: usize) -> Result<String> {
        Ok(if self.value(index)? { "true" } else { "false" }.to_owned())
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        let value = match text {
            "true" => true,
            "false" => false,
            _ => {
                return Err(PropertyError::InvalidText {
                    id: self.core.id(),
                    text: text.to_owned(),
                    reason: "expected \"true\" or \"false\"",
                });
            }
        };
        self.write(index, value, access)
    }
}
