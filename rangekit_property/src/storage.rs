// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dual-buffer raw byte storage.
//!
//! [`RawStorage`] owns the two byte buffers behind every property: the
//! current value and the backup, which shadows the last value confirmed
//! synchronized with the device. Both buffers always have the same length,
//! and that length is always `count * stride`.
//!
//! Typed access goes through explicit little-endian encode/decode helpers
//! for the fixed widths 1, 2, 4 and 8. No typed view ever aliases the bytes.

use smallvec::SmallVec;

/// Current and backup byte buffers of a property.
#[derive(Clone, PartialEq, Eq)]
pub struct RawStorage {
    current: Vec<u8>,
    backup: Vec<u8>,
    stride: usize,
}

impl RawStorage {
    pub(crate) fn new(stride: usize) -> Self {
        Self {
            current: Vec::new(),
            backup: Vec::new(),
            stride,
        }
    }

    /// Bytes per stored element.
    #[must_use]
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of stored elements.
    #[must_use]
    #[inline]
    pub fn count(&self) -> usize {
        self.current.len().checked_div(self.stride).unwrap_or(0)
    }

    /// Length of each buffer in bytes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` if no element is stored.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// The current value bytes.
    #[must_use]
    #[inline]
    pub fn current(&self) -> &[u8] {
        &self.current
    }

    /// The backup (device shadow) bytes.
    #[must_use]
    #[inline]
    pub fn backup(&self) -> &[u8] {
        &self.backup
    }

    /// Returns `true` if the current bytes differ from the backup bytes.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.current != self.backup
    }

    /// Current bytes of element `index`.
    #[must_use]
    pub fn element(&self, index: usize) -> Option<&[u8]> {
        Self::slice(&self.current, index, self.stride)
    }

    /// Backup bytes of element `index`.
    #[must_use]
    pub fn backup_element(&self, index: usize) -> Option<&[u8]> {
        Self::slice(&self.backup, index, self.stride)
    }

    fn slice(bytes: &[u8], index: usize, stride: usize) -> Option<&[u8]> {
        let start = index.checked_mul(stride)?;
        bytes.get(start..start.checked_add(stride)?)
    }

    /// Changes the stride of an empty storage.
    pub(crate) fn set_stride(&mut self, stride: usize) {
        debug_assert!(self.is_empty(), "stride may only change while empty");
        self.stride = stride;
    }

    /// Resizes both buffers to `count` elements, zero-filling growth.
    ///
    /// Returns `false` and leaves both buffers untouched if the byte length
    /// overflows or cannot be allocated.
    pub(crate) fn resize(&mut self, count: usize) -> bool {
        let Some(len) = count.checked_mul(self.stride) else {
            return false;
        };
        let growth = len.saturating_sub(self.current.len());
        if self.current.try_reserve_exact(growth).is_err()
            || self.backup.try_reserve_exact(growth).is_err()
        {
            return false;
        }
        self.current.resize(len, 0);
        self.backup.resize(len, 0);
        true
    }

    /// Copies the current bytes into the backup.
    pub(crate) fn set_clean(&mut self) {
        self.backup.clone_from(&self.current);
    }

    /// Copies the backup bytes into the current buffer. Returns `true` if
    /// any byte changed.
    pub(crate) fn restore(&mut self) -> bool {
        if !self.is_modified() {
            return false;
        }
        self.current.clone_from(&self.backup);
        true
    }

    /// Overwrites element `index` with `bytes` (exactly `stride` long).
    /// Returns `true` if any byte changed.
    pub(crate) fn write_element(&mut self, index: usize, bytes: &[u8]) -> bool {
        debug_assert_eq!(bytes.len(), self.stride, "element length must equal stride");
        self.write_at(index * self.stride, bytes)
    }

    /// Overwrites `bytes.len()` bytes starting at `offset`.
    /// Returns `true` if any byte changed.
    pub(crate) fn write_at(&mut self, offset: usize, bytes: &[u8]) -> bool {
        let target = &mut self.current[offset..offset + bytes.len()];
        if target == bytes {
            return false;
        }
        target.copy_from_slice(bytes);
        true
    }

    /// Replaces the current buffer. The backup is resized to match,
    /// keeping its leading bytes. Returns `true` if the current bytes changed.
    pub(crate) fn replace(&mut self, bytes: Vec<u8>) -> bool {
        debug_assert!(
            self.stride == 0 || bytes.len() % self.stride == 0,
            "replacement must hold whole elements"
        );
        if self.current == bytes {
            return false;
        }
        self.backup.resize(bytes.len(), 0);
        self.current = bytes;
        true
    }
}

impl core::fmt::Debug for RawStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawStorage")
            .field("stride", &self.stride)
            .field("count", &self.count())
            .field("modified", &self.is_modified())
            .finish_non_exhaustive()
    }
}

/// Returns `true` for the integer widths the codec supports.
#[inline]
pub(crate) fn is_integer_width(width: usize) -> bool {
    matches!(width, 1 | 2 | 4 | 8)
}

/// Decodes a little-endian unsigned integer of up to eight bytes.
pub(crate) fn decode_unsigned(bytes: &[u8]) -> u64 {
    let mut buf = [0_u8; 8];
    let width = bytes.len().min(8);
    buf[..width].copy_from_slice(&bytes[..width]);
    u64::from_le_bytes(buf)
}

/// Decodes a little-endian two's complement integer of up to eight bytes.
pub(crate) fn decode_signed(bytes: &[u8]) -> i64 {
    let width = bytes.len().min(8);
    let negative = width > 0 && bytes[width - 1] & 0x80 != 0;
    let mut buf = if negative { [0xFF_u8; 8] } else { [0_u8; 8] };
    buf[..width].copy_from_slice(&bytes[..width]);
    i64::from_le_bytes(buf)
}

/// Encodes the low `width` bytes of `value` in little-endian order.
pub(crate) fn encode_unsigned(value: u64, width: usize) -> SmallVec<[u8; 8]> {
    SmallVec::from_slice(&value.to_le_bytes()[..width.min(8)])
}

/// Encodes the low `width` bytes of a two's complement `value`.
pub(crate) fn encode_signed(value: i64, width: usize) -> SmallVec<[u8; 8]> {
    SmallVec::from_slice(&value.to_le_bytes()[..width.min(8)])
}

/// Largest unsigned value representable in `width` bytes.
pub(crate) fn unsigned_max(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1_u64 << (width * 8)) - 1
    }
}

/// Signed range representable in `width` bytes.
pub(crate) fn signed_range(width: usize) -> (i64, i64) {
    if width >= 8 {
        (i64::MIN, i64::MAX)
    } else {
        let half = 1_i64 << (width * 8 - 1);
        (-half, half - 1)
    }
}
