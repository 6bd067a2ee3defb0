// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The state and contract shared by every property.
//!
//! [`PropertyCore`] bundles a descriptor, the unit size, the dual-buffer
//! [`RawStorage`], the initialized flag and a signal emitter. Every typed
//! property embeds one and exposes it through [`PropertyKind`], whose
//! provided methods implement count bookkeeping, dirty tracking, raw bulk
//! writes and the text entry points once for all seven types.
//!
//! ## Edit gate
//!
//! Mutating paths take an [`Access`] argument. `set_*` methods pass
//! [`Access::Checked`], which fails with
//! [`NotEditable`](crate::PropertyError::NotEditable) when the property
//! lacks [`Features::EDITABLE`]. `force_*` methods pass [`Access::Forced`],
//! which skips only that check. Nothing is toggled on the property, so a
//! failing forced write cannot leave the gate disabled.

use rangekit_signal::{Emitter, Signal, SignalKind, SignalSet, SubscriptionId};

use crate::descriptor::{Category, Features, PropertyDescriptor, PropertyType};
use crate::error::{PropertyError, Result};
use crate::id::{DeviceId, PropertyId};
use crate::storage::{self, RawStorage};

/// Whether a write honors the edit gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    /// Fail with `NotEditable` unless the property is editable.
    Checked,
    /// Skip the editability check. All other validation still applies.
    Forced,
}

/// How a raw bulk write converts elements whose size differs from the stride.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RawConversion {
    /// Zero-extend or truncate each element as a little-endian integer.
    Numeric,
    /// Copy each element into a zero-filled stride-sized slot.
    Pad,
}

/// Identity, metadata, storage and signal state of one property.
pub struct PropertyCore {
    descriptor: PropertyDescriptor,
    unit_size: usize,
    storage: RawStorage,
    initialized: bool,
    emitter: Emitter<PropertyId>,
}

impl PropertyCore {
    pub(crate) fn new(descriptor: PropertyDescriptor, unit_size: usize, stride: usize) -> Result<Self> {
        let id = descriptor.id();
        if !id.is_valid() {
            return Err(PropertyError::InvalidArgument {
                id,
                reason: "property id must be non-zero".into(),
            });
        }
        if stride < unit_size {
            return Err(PropertyError::Logic {
                id,
                reason: "stride is smaller than the unit size",
            });
        }
        Ok(Self {
            descriptor,
            unit_size,
            storage: RawStorage::new(stride),
            initialized: false,
            emitter: Emitter::new(),
        })
    }

    /// Returns the descriptor.
    #[must_use]
    #[inline]
    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    /// Returns the stable id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.descriptor.id()
    }

    /// Device-side width of one element, in bytes.
    #[must_use]
    #[inline]
    pub fn unit_size(&self) -> usize {
        self.unit_size
    }

    /// Returns the raw storage.
    #[must_use]
    #[inline]
    pub fn storage(&self) -> &RawStorage {
        &self.storage
    }

    /// Returns `true` once a value has been written.
    #[must_use]
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the emitter signals of this property are delivered through.
    #[must_use]
    #[inline]
    pub fn emitter(&self) -> &Emitter<PropertyId> {
        &self.emitter
    }

    pub(crate) fn set_device_id(&mut self, device_id: DeviceId) {
        self.descriptor.set_device_id(device_id);
    }

    /// Puts back the ids a container registered this property under.
    pub(crate) fn restore_identity(&mut self, id: PropertyId, device_id: DeviceId) {
        self.descriptor.set_id(id);
        self.descriptor.set_device_id(device_id);
    }

    /// Adopts a new element size. Only valid while nothing is stored.
    pub(crate) fn adopt_size(&mut self, size: usize) {
        self.unit_size = size;
        self.storage.set_stride(size);
    }

    pub(crate) fn check_edit(&self, access: Access) -> Result<()> {
        if access == Access::Checked && !self.descriptor.features().contains(Features::EDITABLE) {
            return Err(PropertyError::NotEditable { id: self.id() });
        }
        Ok(())
    }

    pub(crate) fn check_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(PropertyError::NotInitialized { id: self.id() })
        }
    }

    pub(crate) fn index_error(&self, index: usize) -> PropertyError {
        PropertyError::IndexOutOfRange {
            id: self.id(),
            index,
            count: self.storage.count(),
        }
    }

    /// Current bytes of an element that must already hold a value.
    pub(crate) fn read(&self, index: usize) -> Result<&[u8]> {
        self.check_initialized()?;
        self.storage
            .element(index)
            .ok_or_else(|| self.index_error(index))
    }

    /// Backup bytes of an element that must already hold a value.
    pub(crate) fn read_backup(&self, index: usize) -> Result<&[u8]> {
        self.check_initialized()?;
        self.storage
            .backup_element(index)
            .ok_or_else(|| self.index_error(index))
    }

    /// Validates that `index` may be written, which includes the implicit
    /// first element of an empty property.
    pub(crate) fn check_write_index(&self, index: usize) -> Result<()> {
        let count = self.storage.count();
        if index < count || (count == 0 && index == 0) {
            Ok(())
        } else {
            Err(self.index_error(index))
        }
    }

    /// Current bytes at `index` for read-modify-write paths, or `None` when
    /// the write will create the element.
    pub(crate) fn pending_element(&self, index: usize) -> Option<&[u8]> {
        if self.initialized {
            self.storage.element(index)
        } else {
            None
        }
    }

    /// Stores an already validated element and emits `ValueChanged` if the
    /// bytes changed or this is the first write.
    pub(crate) fn commit(&mut self, index: usize, bytes: &[u8]) -> bool {
        if self.storage.count() == 0 {
            // A single element always fits.
            let _ = self.storage.resize(1);
        }
        let changed = self.storage.write_element(index, bytes);
        let first = !self.initialized;
        self.initialized = true;
        if changed || first {
            self.emit(SignalKind::ValueChanged);
        }
        changed
    }

    /// Stores already validated bytes at a byte offset of an initialized
    /// property.
    pub(crate) fn commit_at(&mut self, offset: usize, bytes: &[u8]) -> bool {
        let changed = self.storage.write_at(offset, bytes);
        if changed {
            self.emit(SignalKind::ValueChanged);
        }
        changed
    }

    /// Rewrites several elements and emits at most one `ValueChanged`.
    pub(crate) fn commit_many<'a>(&mut self, elements: impl IntoIterator<Item = (usize, &'a [u8])>) -> bool {
        let mut changed = false;
        for (index, bytes) in elements {
            changed |= self.storage.write_element(index, bytes);
        }
        if changed {
            self.emit(SignalKind::ValueChanged);
        }
        changed
    }

    pub(crate) fn write_raw(
        &mut self,
        bytes: &[u8],
        element_size: usize,
        conversion: RawConversion,
        access: Access,
    ) -> Result<()> {
        self.check_edit(access)?;
        let id = self.id();
        if element_size == 0 || bytes.len() % element_size != 0 {
            return Err(PropertyError::InvalidArgument {
                id,
                reason: format!(
                    "{} bytes do not divide into elements of {element_size} bytes",
                    bytes.len()
                ),
            });
        }
        let stride = self.storage.stride();
        let count = bytes.len() / element_size;
        let converted = if element_size == stride {
            bytes.to_vec()
        } else {
            match conversion {
                RawConversion::Numeric => {
                    if !storage::is_integer_width(element_size) || !storage::is_integer_width(stride) {
                        return Err(PropertyError::Logic {
                            id,
                            reason: "raw element size cannot be converted to the stride",
                        });
                    }
                    bytes
                        .chunks_exact(element_size)
                        .flat_map(|element| {
                            storage::encode_unsigned(storage::decode_unsigned(element), stride)
                        })
                        .collect()
                }
                RawConversion::Pad => {
                    if element_size > stride {
                        return Err(PropertyError::TooLong {
                            id,
                            len: element_size,
                            max: stride,
                        });
                    }
                    let mut padded = vec![0_u8; count * stride];
                    for (slot, element) in padded
                        .chunks_exact_mut(stride)
                        .zip(bytes.chunks_exact(element_size))
                    {
                        slot[..element_size].copy_from_slice(element);
                    }
                    padded
                }
            }
        };

        let changed = self.storage.replace(converted);
        let first = !self.initialized && count > 0;
        self.initialized = count > 0;
        if changed || first {
            self.emit(SignalKind::ValueChanged);
        }
        Ok(())
    }

    pub(crate) fn set_count(&mut self, count: usize) -> Result<()> {
        if !self.storage.resize(count) {
            return Err(PropertyError::OutOfRange {
                id: self.id(),
                reason: format!(
                    "{count} elements of {} bytes exceed the addressable storage",
                    self.storage.stride()
                ),
            });
        }
        if count == 0 {
            self.initialized = false;
        }
        Ok(())
    }

    pub(crate) fn set_clean(&mut self) {
        self.storage.set_clean();
    }

    pub(crate) fn restore(&mut self) {
        if self.storage.restore() {
            self.emit(SignalKind::ValueChanged);
        }
    }

    pub(crate) fn emit(&self, kind: SignalKind) {
        if !self.emitter.is_enabled() {
            return;
        }
        tracing::trace!(id = %self.id(), %kind, "property signal");
        self.emitter.emit(&Signal::new(kind, self.id()));
    }
}

impl Clone for PropertyCore {
    /// Copies metadata and both buffers. Subscribers are not copied.
    fn clone(&self) -> Self {
        let emitter = Emitter::new();
        emitter.set_enabled(self.emitter.is_enabled());
        Self {
            descriptor: self.descriptor.clone(),
            unit_size: self.unit_size,
            storage: self.storage.clone(),
            initialized: self.initialized,
            emitter,
        }
    }
}

impl core::fmt::Debug for PropertyCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyCore")
            .field("descriptor", &self.descriptor)
            .field("unit_size", &self.unit_size)
            .field("storage", &self.storage)
            .field("initialized", &self.initialized)
            .field("emitter", &self.emitter)
            .finish()
    }
}

/// The contract shared by every property type.
///
/// Implementors provide access to their [`PropertyCore`] and the text
/// encoding of their values; everything else is provided.
pub trait PropertyKind {
    /// The type tag of this property.
    fn property_type(&self) -> PropertyType;

    /// Shared property state.
    fn core(&self) -> &PropertyCore;

    /// Shared property state, mutably.
    fn core_mut(&mut self) -> &mut PropertyCore;

    /// Text rendering of element `index`.
    fn string_value(&self, index: usize) -> Result<String>;

    /// Parses `text` and writes it to element `index`.
    fn write_string_value(&mut self, index: usize, text: &str, access: Access) -> Result<()>;

    /// Replaces the whole storage with `bytes`, laid out as elements of
    /// `element_size` bytes.
    fn write_raw_storage(&mut self, bytes: &[u8], element_size: usize, access: Access) -> Result<()> {
        self.core_mut()
            .write_raw(bytes, element_size, RawConversion::Numeric, access)
    }

    /// Parses `text` and writes it to element `index`, honoring the edit gate.
    fn set_string_value(&mut self, index: usize, text: &str) -> Result<()> {
        self.write_string_value(index, text, Access::Checked)
    }

    /// Parses `text` and writes it to element `index`, bypassing the edit gate.
    fn force_string_value(&mut self, index: usize, text: &str) -> Result<()> {
        self.write_string_value(index, text, Access::Forced)
    }

    /// Replaces the whole storage, honoring the edit gate.
    ///
    /// When `element_size` differs from the stride each element is
    /// converted: integer-like properties zero-extend or truncate elements of
    /// 1, 2, 4 or 8 bytes, text and buffer properties zero-pad shorter ones.
    fn set_raw_storage(&mut self, bytes: &[u8], element_size: usize) -> Result<()> {
        self.write_raw_storage(bytes, element_size, Access::Checked)
    }

    /// Replaces the whole storage, bypassing the edit gate.
    fn force_raw_storage(&mut self, bytes: &[u8], element_size: usize) -> Result<()> {
        self.write_raw_storage(bytes, element_size, Access::Forced)
    }

    /// Returns the stable id.
    fn id(&self) -> PropertyId {
        self.core().id()
    }

    /// Returns the device-protocol id.
    fn device_id(&self) -> DeviceId {
        self.core().descriptor().device_id()
    }

    /// Returns the category.
    fn category(&self) -> Category {
        self.core().descriptor().category()
    }

    /// Returns the feature flags.
    fn features(&self) -> Features {
        self.core().descriptor().features()
    }

    /// Returns `true` if checked writes are allowed.
    fn is_editable(&self) -> bool {
        self.core().descriptor().is_editable()
    }

    /// Returns the description.
    fn description(&self) -> &str {
        self.core().descriptor().description()
    }

    /// Device-side width of one element, in bytes.
    fn unit_size(&self) -> usize {
        self.core().unit_size()
    }

    /// Bytes per stored element.
    fn stride(&self) -> usize {
        self.core().storage().stride()
    }

    /// Number of stored elements.
    fn count(&self) -> usize {
        self.core().storage().count()
    }

    /// Resizes both buffers to `count` elements, zero-filling growth.
    /// A count of zero marks the property uninitialized.
    ///
    /// Fails with `OutOfRange`, leaving the storage unchanged, if the
    /// buffers cannot hold `count` elements.
    fn set_count(&mut self, count: usize) -> Result<()> {
        self.core_mut().set_count(count)
    }

    /// Returns `true` once a value has been written.
    fn is_initialized(&self) -> bool {
        self.core().is_initialized()
    }

    /// Current value bytes.
    fn storage(&self) -> &[u8] {
        self.core().storage().current()
    }

    /// Backup (device shadow) bytes.
    fn backup_storage(&self) -> &[u8] {
        self.core().storage().backup()
    }

    /// Returns `true` if the current bytes differ from the backup.
    fn is_modified(&self) -> bool {
        self.core().storage().is_modified()
    }

    /// Accepts the current value as synchronized with the device.
    fn set_clean(&mut self) {
        self.core_mut().set_clean();
    }

    /// Reverts the current value to the backup, emitting `ValueChanged` if
    /// any byte changes.
    fn restore(&mut self) {
        self.core_mut().restore();
    }

    /// Calls `listener` for every signal of a kind in `filter`.
    fn subscribe<F>(&self, filter: SignalSet, listener: F) -> SubscriptionId
    where
        F: Fn(&Signal<PropertyId>) + 'static,
        Self: Sized,
    {
        self.core().emitter().subscribe(filter, listener)
    }

    /// Removes a listener added with [`subscribe`](Self::subscribe).
    fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.core().emitter().unsubscribe(subscription)
    }

    /// Enables or disables signal delivery. Writes still apply while disabled.
    fn set_signals_enabled(&self, enabled: bool) {
        self.core().emitter().set_enabled(enabled);
    }

    /// Returns `true` if signals are delivered.
    fn signals_enabled(&self) -> bool {
        self.core().emitter().is_enabled()
    }
}
