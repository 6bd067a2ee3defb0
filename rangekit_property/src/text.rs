// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-length text properties.

use crate::base::{Access, PropertyCore, PropertyKind, RawConversion};
use crate::descriptor::{PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};

/// Character encoding of a [`TextProperty`] element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    /// One byte per character, 7-bit ASCII only.
    #[default]
    Ascii,
    /// UTF-16 code units, little-endian.
    Utf16,
    /// UTF-8 bytes.
    Utf8,
}

/// A text property stored as zero-padded blocks of `max_length` bytes.
///
/// Reads stop at the first NUL character.
///
/// ```rust
/// use rangekit_property::{PropertyDescriptor, PropertyId, PropertyKind, TextEncoding, TextProperty};
///
/// let mut name = TextProperty::new(
///     PropertyDescriptor::builder(PropertyId::new(0x11)).build(),
///     8,
///     TextEncoding::Utf16,
/// )?;
/// name.set_value(0, "LCA2")?;
/// assert_eq!(name.storage(), b"L\0C\0A\x002\0");
/// assert!(name.set_value(0, "TOO LONG").is_err());
/// # Ok::<(), rangekit_property::PropertyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct TextProperty {
    core: PropertyCore,
    encoding: TextEncoding,
    force_uppercase: bool,
}

impl TextProperty {
    /// Creates an uninitialized text property whose elements are
    /// `max_length` bytes long.
    pub fn new(descriptor: PropertyDescriptor, max_length: usize, encoding: TextEncoding) -> Result<Self> {
        let core = PropertyCore::new(descriptor, max_length, max_length)?;
        if max_length == 0 {
            return Err(PropertyError::InvalidArgument {
                id: core.id(),
                reason: "text maximum length must be positive".into(),
            });
        }
        Ok(Self {
            core,
            encoding,
            force_uppercase: false,
        })
    }

    /// The element encoding.
    #[must_use]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Element length in bytes.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.core.unit_size()
    }

    /// Returns `true` if written text is converted to uppercase.
    #[must_use]
    pub fn forces_uppercase(&self) -> bool {
        self.force_uppercase
    }

    /// Converts text to uppercase on every subsequent write.
    pub fn set_force_uppercase(&mut self, force_uppercase: bool) {
        self.force_uppercase = force_uppercase;
    }

    /// Text of element `index`.
    pub fn value(&self, index: usize) -> Result<String> {
        Ok(self.decode(self.core.read(index)?))
    }

    /// Text last confirmed by the device for element `index`.
    pub fn device_value(&self, index: usize) -> Result<String> {
        Ok(self.decode(self.core.read_backup(index)?))
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self.encoding {
            TextEncoding::Ascii | TextEncoding::Utf8 => {
                let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                String::from_utf8_lossy(&bytes[..end]).into_owned()
            }
            TextEncoding::Utf16 => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .take_while(|unit| *unit != 0)
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }

    /// Writes element `index`, honoring the edit gate.
    pub fn set_value(&mut self, index: usize, text: &str) -> Result<()> {
        self.write(index, text, Access::Checked)
    }

    /// Writes element `index`, bypassing the edit gate.
    pub fn force_value(&mut self, index: usize, text: &str) -> Result<()> {
        self.write(index, text, Access::Forced)
    }

    pub(crate) fn write(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        self.core.check_edit(access)?;
        self.core.check_write_index(index)?;
        let id = self.core.id();
        let text = if self.force_uppercase {
            text.to_uppercase()
        } else {
            text.to_owned()
        };

        let encoded: Vec<u8> = match self.encoding {
            TextEncoding::Ascii => {
                if !text.is_ascii() {
                    return Err(PropertyError::InvalidText {
                        id,
                        text,
                        reason: "not ASCII",
                    });
                }
                text.into_bytes()
            }
            TextEncoding::Utf8 => text.into_bytes(),
            TextEncoding::Utf16 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        };
        let max = self.max_length();
        if encoded.len() > max {
            return Err(PropertyError::TooLong {
                id,
                len: encoded.len(),
                max,
            });
        }

        let mut element = vec![0_u8; max];
        element[..encoded.len()].copy_from_slice(&encoded);
        self.core.commit(index, &element);
        Ok(())
    }
}

impl PropertyKind for TextProperty {
    fn property_type(&self) -> PropertyType {
        PropertyType::Text
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn string_value(&self, index: usize) -> Result<String> {
        self.value(index)
    }

    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()> {
        self.write(index, text, access)
    }

    fn write_raw_storage(&mut self, bytes: &[u8], element_size: usize, access: Access) -> Result<()> {
        self.core
            .write_raw(bytes, element_size, RawConversion::Pad, access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{descriptor, signal_counter};

    #[test]
    fn ascii_round_trip_with_padding() {
        let mut prop = TextProperty::new(descriptor(1), 6, TextEncoding::Ascii).unwrap();
        prop.set_value(0, "abc").unwrap();
        assert_eq!(prop.storage(), b"abc\0\0\0");
        assert_eq!(prop.value(0).unwrap(), "abc");
        assert_eq!(prop.string_value(0).unwrap(), "abc");
        assert_eq!(
            prop.set_value(0, "é").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn length_is_bounded() {
        let mut prop = TextProperty::new(descriptor(1), 4, TextEncoding::Utf8).unwrap();
        prop.set_value(0, "abcd").unwrap();
        let err = prop.set_value(0, "abcde").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        // Two bytes per character in UTF-8.
        assert!(prop.set_value(0, "ééé").is_err());
        prop.set_value(0, "éé").unwrap();
        assert_eq!(prop.value(0).unwrap(), "éé");
    }

    #[test]
    fn utf16_uses_two_bytes_per_unit() {
        let mut prop = TextProperty::new(descriptor(1), 6, TextEncoding::Utf16).unwrap();
        prop.set_value(0, "abc").unwrap();
        assert_eq!(prop.value(0).unwrap(), "abc");
        assert!(prop.set_value(0, "abcd").is_err());
    }

    #[test]
    fn uppercase_is_forced() {
        let mut prop = TextProperty::new(descriptor(1), 8, TextEncoding::Ascii).unwrap();
        prop.set_force_uppercase(true);
        prop.set_string_value(0, "lidar").unwrap();
        assert_eq!(prop.value(0).unwrap(), "LIDAR");
    }

    #[test]
    fn shorter_text_clears_tail() {
        let mut prop = TextProperty::new(descriptor(1), 4, TextEncoding::Ascii).unwrap();
        let hits = signal_counter(&prop);
        prop.set_value(0, "abcd").unwrap();
        prop.set_value(0, "ab").unwrap();
        prop.set_value(0, "ab").unwrap();
        assert_eq!(prop.storage(), b"ab\0\0");
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn raw_storage_pads_short_elements() {
        let mut prop = TextProperty::new(descriptor(1), 4, TextEncoding::Ascii).unwrap();
        prop.set_raw_storage(b"abxy", 2).unwrap();
        assert_eq!(prop.count(), 2);
        assert_eq!(prop.value(0).unwrap(), "ab");
        assert_eq!(prop.value(1).unwrap(), "xy");
        assert_eq!(
            prop.set_raw_storage(b"abcdef", 6).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }
}
