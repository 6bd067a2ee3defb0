// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw byte buffer properties.

use crate::base::{Access, PropertyCore, PropertyKind, RawConversion};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// A property whose elements are opaque byte blocks.
///
/// A buffer created with size zero adopts the length of its first write.
/// The text form is uppercase hexadecimal, two characters per byte, with
/// trailing zero bytes omitted.
#[derive(Clone, Debug)]
pub struct BufferProperty {
    core: PropertyCore,
}

impl BufferProperty {
    /// Creates an uninitialized buffer property of `size` bytes per element.
    pub fn new(descriptor: PropertyDescriptor, size: usize) -> Result<Self> {
        Ok(Self {
            core: PropertyCore::new(descriptor, size, size)?,
        })
    }

    /// Element length in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.core.storage().stride()
    }

    /// Bytes of element `index`.
    pub fn value(&self, index: usize) -> Result<&[u8]> {
        self.core.read(index)
    }

    /// Bytes last confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<&[u8]> {
        self.core.read_backup(index)
    }

    /// Writes element `index`, zero-padding short input, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        self.write(index, bytes, Access::Checked)
    }

    /// Writes element `index`, zero-padding short input, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        self.write(index, bytes, Access::Forced)
    }

    pub(crate) fn write(&mut self, index: usize, bytes: &[u8], access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        self.adopt_or_check_len(bytes.len())?;
        let mut element = vec![0_u8; self.size()];
        element[..bytes.len()].copy_from_slice(bytes);
        self.core.commit(index, &element);
        Ok(())
    }

    fn adopt_or_check_len(&mut self, len: usize) -> Result<()> {
        let id = self.core.id();
        let size = self.size();
        if size == 0 && self.core.storage().is_empty() {
            if len == 0 {
                return Err(PropertyError::InvalidArgument {
                    id,
                    reason: "cannot size a buffer from empty input".into(),
                });
            }
            tracing::debug!(%id, size = len, "buffer adopts size of first write");
            self.core.adopt_size(len);
        } else if len > size {
            return Err(PropertyError::TooLong { id, len, max: size });
        }
        Ok(())
    }

    /// Overwrites bytes starting at `offset` of the whole storage,
    /// honoring the edit gate.
    pub fn set_raw_storage_offset(&mut self, bytes: &[u8], offset: usize) -> Result<()> {
        self.write_at(bytes, offset, Access::Checked)
    }

    /// Overwrites bytes starting at `offset` of the whole storage,
    /// bypassing the edit gate.
    pub fn force_raw_storage_offset(&mut self, bytes: &[u8], offset: usize) -> Result<()> {
        self.write_at(bytes, offset, Access::Forced)
    }

    fn write_at(&mut self, bytes: &[u8], offset: usize, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_initialized()?;
        let len = self.core.storage().len();
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= len => {
                self.core.commit_at(offset, bytes);
                Ok(())
            }
            _ => Err(PropertyError::OutOfRange {
                id: self.core.id(),
                reason: format!(
                    "{} bytes at offset {offset} exceed the {len}-byte storage",
                    bytes.len()
                ),
            }),
        }
    }
}

fn hex_digit(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

impl PropertyKind for BufferProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::Buffer
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    /// Uppercase hex of element `index`, with trailing zero bytes omitted.
    ///
    /// The text is not padded to the element size: a 4-byte element holding
    /// `0A 00 00 00` renders as `"0A"`, not `"0A000000"`. An all-zero
    /// element renders as `"00"`. Parsing zero-pads short input, so the
    /// shortened text writes back the same bytes.
    fn string_value(&self, index: usize) -> Result<String> {
        let bytes = self.value(index)?;
        let used = bytes.iter().rposition(|b| *b != 0).map_or(1, |last| last + 1);
        let mut text = String::with_capacity(used * 2);
        for byte in bytes.iter().take(used) {
            text.push(char::from(HEX[usize::from(byte >> 4)]));
            text.push(char::from(HEX[usize::from(byte & 0x0F)]));
        }
        Ok(text)
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        let id = self.core.id();
        let size = self.size();
        let adopting = size == 0 && self.core.storage().is_empty();
        if !adopting && text.len() > size * 2 {
            return Err(PropertyError::TooLong {
                id,
                len: text.len().div_ceil(2),
                max: size,
            });
        }
        let invalid = |reason| PropertyError::InvalidText {
            id,
            text: text.to_owned(),
            reason,
        };
        if text.len() % 2 != 0 {
            return Err(invalid("odd number of hex digits"));
        }
        let bytes = text
            .as_bytes()
            .chunks_exact(2)
            .map(|pair| Some((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| invalid("not a hex digit"))?;
        self.write(index, &bytes, access)
    }

    fn write_raw_storage(&mut self, bytes: &[u8], element_size: usize, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        if self.size() == 0
            && self.core.storage().is_empty()
            && element_size > 0
            && bytes.len() % element_size == 0
        {
            self.core.adopt_size(element_size);
        }
        self.core
            .write_raw(bytes, element_size, RawConversion::Pad, access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{descriptor, read_only, signal_counter};

    #[test]
    fn hex_round_trip() {
        let mut prop = BufferProperty::new(descriptor(1), 4).unwrap();
        prop.set_string_value(0, "0A1B").unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "0A1B");
        assert_eq!(prop.value(0).unwrap(), &[0x0A, 0x1B, 0, 0]);

        prop.set_string_value(0, "deadbeef").unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "DEADBEEF");
    }

    #[test]
    fn zero_buffer_renders_one_byte() {
        let mut prop = BufferProperty::new(descriptor(1), 3).unwrap();
        prop.set_value(0, &[]).unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "00");
    }

    #[test]
    fn trailing_zero_bytes_are_not_rendered() {
        let mut prop = BufferProperty::new(descriptor(1), 4).unwrap();
        prop.set_value(0, &[0x0A, 0, 0, 0]).unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "0A");
        prop.set_value(0, &[0, 0, 0x0C, 0]).unwrap();
        assert_eq!(prop.string_value(0).unwrap(), "00000C");
        let hits = signal_counter(&prop);
        prop.set_string_value(0, "00000C").unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn hex_validation() {
        let mut prop = BufferProperty::new(descriptor(1), 4).unwrap();
        prop.set_string_value(0, "01").unwrap();
        assert_eq!(
            prop.set_string_value(0, "0102030405").unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            prop.set_string_value(0, "010203040").unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            prop.set_string_value(0, "0G").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            prop.set_string_value(0, "012").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(prop.value(0).unwrap(), &[1, 0, 0, 0]);
    }

    #[test]
    fn zero_size_adopts_first_write() {
        let mut prop = BufferProperty::new(descriptor(1), 0).unwrap();
        prop.set_value(0, &[1, 2, 3]).unwrap();
        assert_eq!(prop.size(), 3);
        assert_eq!(prop.unit_size(), 3);
        assert_eq!(prop.count(), 1);
        assert_eq!(
            prop.set_value(0, &[1, 2, 3, 4]).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn offset_writes_are_bounded() {
        let mut prop = BufferProperty::new(descriptor(1), 4).unwrap();
        assert_eq!(
            prop.set_raw_storage_offset(&[1], 0).unwrap_err().kind(),
            ErrorKind::PolicyViolation
        );
        prop.set_count(2).unwrap();
        prop.set_value(1, &[0xFF]).unwrap();
        let hits = signal_counter(&prop);
        prop.set_raw_storage_offset(&[9, 9], 3).unwrap();
        assert_eq!(prop.storage(), &[0, 0, 0, 9, 9, 0, 0, 0]);
        assert_eq!(hits.get(), 1);
        assert_eq!(
            prop.set_raw_storage_offset(&[1, 2], 7).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn read_only_offset_write_requires_force() {
        let mut prop = BufferProperty::new(read_only(1), 2).unwrap();
        prop.force_value(0, &[1, 2]).unwrap();
        assert!(prop.set_raw_storage_offset(&[3], 0).is_err());
        prop.force_raw_storage_offset(&[3], 0).unwrap();
        assert_eq!(prop.value(0).unwrap(), &[3, 2]);
    }
}
