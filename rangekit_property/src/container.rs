// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed ownership, lookup and change aggregation for properties.
//!
//! A [`PropertyContainer`] owns its properties, ordered by [`PropertyId`].
//!
//! # Implementation
//!
//! Entries live in a vector sorted by id and are found by binary search.
//! Containers hold a few dozen to a few hundred properties that are looked
//! up far more often than they are added, and sorted storage keeps
//! iteration in id order.
//!
//! # Signals
//!
//! When a property is added the container subscribes to it and re-emits
//! every signal on its own emitter, with the originating property id as
//! sender. Subscribing once to the container observes every property.
//!
//! # Mutable access
//!
//! Mutable lookups hand out a [`PropertyMut`] guard rather than a bare
//! reference. A caller may replace the property wholesale through it; when
//! the guard drops, the registered id and device id are put back and the
//! forwarding subscription follows the new property's emitter.

use core::ops::{Deref, DerefMut};

use hashbrown::HashSet;
use rangekit_signal::{Emitter, Signal, SignalSet, SubscriptionId};

use crate::base::PropertyKind;
use crate::descriptor::{Category, Features};
use crate::error::{PropertyError, Result};
use crate::id::{DeviceId, PropertyId};
use crate::property::{Property, PropertyVariant};

struct Entry {
    property: Property,
    forwarder: SubscriptionId,
}

/// Re-emits every signal of `source` on `relay` while `relay` is alive.
fn forward(source: &Emitter<PropertyId>, relay: &Emitter<PropertyId>) -> SubscriptionId {
    let weak = relay.downgrade();
    source.subscribe(SignalSet::ALL, move |signal| {
        if let Some(emitter) = weak.upgrade() {
            emitter.emit(signal);
        }
    })
}

/// Mutable access to a property owned by a [`PropertyContainer`].
///
/// Dereferences to the property. On drop the guard reconciles the entry
/// with whatever the property now is: an id or device id changed by a
/// wholesale replacement is reset to the registered one, and a replaced
/// emitter is subscribed to in place of the old one.
pub struct PropertyMut<'a, T: PropertyKind = Property> {
    id: PropertyId,
    device_id: DeviceId,
    emitter: Emitter<PropertyId>,
    relay: &'a Emitter<PropertyId>,
    forwarder: &'a mut SubscriptionId,
    property: &'a mut T,
}

impl<'a, T: PropertyKind> PropertyMut<'a, T> {
    fn new(
        property: &'a mut T,
        forwarder: &'a mut SubscriptionId,
        relay: &'a Emitter<PropertyId>,
    ) -> Self {
        let core = property.core();
        Self {
            id: core.id(),
            device_id: core.descriptor().device_id(),
            emitter: core.emitter().clone(),
            relay,
            forwarder,
            property,
        }
    }
}

impl<T: PropertyKind> Deref for PropertyMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.property
    }
}

impl<T: PropertyKind> DerefMut for PropertyMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.property
    }
}

impl<T: PropertyKind> Drop for PropertyMut<'_, T> {
    fn drop(&mut self) {
        let core = self.property.core_mut();
        if core.id() != self.id || core.descriptor().device_id() != self.device_id {
            tracing::warn!(
                id = %self.id,
                replaced_id = %core.id(),
                replaced_device_id = %core.descriptor().device_id(),
                "replacement carries other ids, keeping the registered ones"
            );
            core.restore_identity(self.id, self.device_id);
        }
        if !core.emitter().ptr_eq(&self.emitter) {
            self.emitter.unsubscribe(*self.forwarder);
            *self.forwarder = forward(core.emitter(), self.relay);
        }
    }
}

impl<T: PropertyKind + core::fmt::Debug> core::fmt::Debug for PropertyMut<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&*self.property, f)
    }
}

/// Owns a set of properties keyed by id.
///
/// # Example
///
/// ```rust
/// use rangekit_property::{
///     Category, IntegerProperty, PropertyContainer, PropertyDescriptor, PropertyId,
/// };
///
/// let id = PropertyId::new(0x51);
/// let mut container = PropertyContainer::new();
/// container.add(IntegerProperty::new(
///     PropertyDescriptor::builder(id).category(Category::CONFIGURATION).build(),
///     2,
///     false,
/// )?)?;
///
/// container.get_mut::<IntegerProperty>(id)?.set_value(0, 8)?;
/// assert!(container.is_modified(Category::CONFIGURATION));
///
/// container.set_clean(Category::all());
/// assert!(!container.is_modified(Category::all()));
/// # Ok::<(), rangekit_property::PropertyError>(())
/// ```
pub struct PropertyContainer {
    entries: Vec<(PropertyId, Entry)>,
    emitter: Emitter<PropertyId>,
}

impl PropertyContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            emitter: Emitter::new(),
        }
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the container holds no property.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binary search for an entry by id.
    #[inline]
    fn position(&self, id: PropertyId) -> core::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(key, _)| *key)
    }

    /// Returns `true` if a property with `id` is present.
    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.position(id).is_ok()
    }

    fn device_id_owner(&self, device_id: DeviceId) -> Option<PropertyId> {
        if !device_id.is_mapped() {
            return None;
        }
        self.iter()
            .find(|property| property.device_id() == device_id)
            .map(PropertyKind::id)
    }

    fn check_new(&self, property: &Property) -> Result<()> {
        let id = property.id();
        if self.contains(id) {
            return Err(PropertyError::DuplicateId { id });
        }
        let device_id = property.device_id();
        if let Some(existing) = self.device_id_owner(device_id) {
            return Err(PropertyError::DuplicateDeviceId {
                id,
                device_id,
                existing,
            });
        }
        Ok(())
    }

    /// Takes ownership of `property`.
    ///
    /// Fails if the id is already present, or if the device id is mapped and
    /// already used by another property.
    pub fn add(&mut self, property: impl Into<Property>) -> Result<()> {
        let property = property.into();
        self.check_new(&property)?;
        tracing::debug!(
            id = %property.id(),
            device_id = %property.device_id(),
            kind = %property.property_type(),
            "add property"
        );
        self.insert(property);
        Ok(())
    }

    /// Inserts a property whose id and device id are known to be free.
    fn insert(&mut self, property: Property) {
        let id = property.id();
        let forwarder = forward(property.core().emitter(), &self.emitter);
        let entry = Entry {
            property,
            forwarder,
        };
        debug_assert!(!self.contains(id), "{id} is already registered");
        let at = self.position(id).unwrap_or_else(|at| at);
        self.entries.insert(at, (id, entry));
    }

    /// Moves every property of `donor` into this container.
    ///
    /// All ids and device ids are validated before anything moves, so on
    /// failure both containers are unchanged. On success `donor` is empty.
    pub fn add_all(&mut self, donor: &mut Self) -> Result<()> {
        let mut device_ids: HashSet<DeviceId> = self
            .iter()
            .map(PropertyKind::device_id)
            .filter(|device_id| device_id.is_mapped())
            .collect();
        for property in donor.iter() {
            self.check_new(property)?;
            let device_id = property.device_id();
            if device_id.is_mapped() && !device_ids.insert(device_id) {
                return Err(PropertyError::DuplicateDeviceId {
                    id: property.id(),
                    device_id,
                    existing: donor
                        .device_id_owner(device_id)
                        .unwrap_or_else(|| property.id()),
                });
            }
        }

        let moved = donor.entries.len();
        for (_, entry) in donor.entries.drain(..) {
            entry.property.unsubscribe(entry.forwarder);
            self.insert(entry.property);
        }
        tracing::debug!(moved, total = self.len(), "merged property containers");
        Ok(())
    }

    /// Removes a property and hands ownership back to the caller.
    pub fn remove(&mut self, id: PropertyId) -> Option<Property> {
        let at = self.position(id).ok()?;
        let (_, entry) = self.entries.remove(at);
        entry.property.unsubscribe(entry.forwarder);
        Some(entry.property)
    }

    /// Maps a registered property onto `device_id`, keeping device ids unique.
    pub fn set_device_id(&mut self, id: PropertyId, device_id: DeviceId) -> Result<()> {
        if let Some(existing) = self.device_id_owner(device_id)
            && existing != id
        {
            return Err(PropertyError::DuplicateDeviceId {
                id,
                device_id,
                existing,
            });
        }
        let at = self.position(id).map_err(|_| PropertyError::NotFound { id })?;
        self.entries[at].1.property.core_mut().set_device_id(device_id);
        tracing::debug!(%id, %device_id, "map device id");
        Ok(())
    }

    /// Iterates over the properties in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> + '_ {
        self.entries.iter().map(|(_, entry)| &entry.property)
    }

    /// Iterates mutably over the properties in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = PropertyMut<'_>> + '_ {
        let relay = &self.emitter;
        self.entries
            .iter_mut()
            .map(move |(_, Entry { property, forwarder })| {
                PropertyMut::new(property, forwarder, relay)
            })
    }

    /// Iterates over the ids in order.
    pub fn ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// The property with `id`, if any.
    #[must_use]
    pub fn find(&self, id: PropertyId) -> Option<&Property> {
        let at = self.position(id).ok()?;
        Some(&self.entries[at].1.property)
    }

    /// The property with `id`, mutably, if any.
    #[must_use]
    pub fn find_mut(&mut self, id: PropertyId) -> Option<PropertyMut<'_>> {
        let at = self.position(id).ok()?;
        let Entry {
            property,
            forwarder,
        } = &mut self.entries[at].1;
        Some(PropertyMut::new(property, forwarder, &self.emitter))
    }

    /// The property with `id` if it is a `T`.
    #[must_use]
    pub fn find_as<T: PropertyVariant>(&self, id: PropertyId) -> Option<&T> {
        self.find(id).and_then(T::from_property)
    }

    /// The property with `id`, failing with `NotFound` if absent.
    pub fn property(&self, id: PropertyId) -> Result<&Property> {
        self.find(id).ok_or(PropertyError::NotFound { id })
    }

    /// The property with `id`, mutably, failing with `NotFound` if absent.
    pub fn property_mut(&mut self, id: PropertyId) -> Result<PropertyMut<'_>> {
        self.find_mut(id).ok_or(PropertyError::NotFound { id })
    }

    /// The `T` with `id`.
    ///
    /// Fails with `NotFound` for a missing id and `TypeMismatch` for a
    /// property of another type.
    pub fn get<T: PropertyVariant>(&self, id: PropertyId) -> Result<&T> {
        self.property(id)?.expect_ref()
    }

    /// The `T` with `id`, mutably.
    pub fn get_mut<T: PropertyVariant>(&mut self, id: PropertyId) -> Result<PropertyMut<'_, T>> {
        let at = self.position(id).map_err(|_| PropertyError::NotFound { id })?;
        let Entry {
            property,
            forwarder,
        } = &mut self.entries[at].1;
        let property = property.expect_mut::<T>()?;
        Ok(PropertyMut::new(property, forwarder, &self.emitter))
    }

    /// The property mapped onto `device_id`, if any.
    #[must_use]
    pub fn find_by_device_id(&self, device_id: DeviceId) -> Option<&Property> {
        if !device_id.is_mapped() {
            return None;
        }
        self.iter().find(|property| property.device_id() == device_id)
    }

    /// The property mapped onto `device_id`, mutably, if any.
    #[must_use]
    pub fn find_by_device_id_mut(&mut self, device_id: DeviceId) -> Option<PropertyMut<'_>> {
        if !device_id.is_mapped() {
            return None;
        }
        self.iter_mut()
            .find(|property| property.device_id() == device_id)
    }

    /// The property mapped onto `device_id`, failing with `NotFound` if absent.
    pub fn property_by_device_id(&self, device_id: DeviceId) -> Result<&Property> {
        self.find_by_device_id(device_id)
            .ok_or(PropertyError::DeviceIdNotFound { device_id })
    }

    /// Properties whose category intersects `categories`.
    pub fn find_by_categories(&self, categories: Category) -> impl Iterator<Item = &Property> + '_ {
        self.iter()
            .filter(move |property| property.category().intersects(categories))
    }

    /// Properties having any of `features`.
    pub fn find_by_feature(&self, features: Features) -> impl Iterator<Item = &Property> + '_ {
        self.iter()
            .filter(move |property| property.features().intersects(features))
    }

    /// Returns `true` if a property in `categories` differs from its backup.
    #[must_use]
    pub fn is_modified(&self, categories: Category) -> bool {
        self.find_by_categories(categories)
            .any(PropertyKind::is_modified)
    }

    /// Accepts the current values of every property in `categories`.
    pub fn set_clean(&mut self, categories: Category) {
        for mut property in self.iter_mut() {
            if property.category().intersects(categories) {
                property.set_clean();
            }
        }
    }

    /// Reverts every property in `categories` to its backup.
    pub fn restore(&mut self, categories: Category) {
        for mut property in self.iter_mut() {
            if property.category().intersects(categories) {
                property.restore();
            }
        }
    }

    /// Calls `listener` for every signal of a kind in `filter` emitted by
    /// any owned property.
    pub fn subscribe<F>(&self, filter: SignalSet, listener: F) -> SubscriptionId
    where
        F: Fn(&Signal<PropertyId>) + 'static,
    {
        self.emitter.subscribe(filter, listener)
    }

    /// Removes a listener added with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.emitter.unsubscribe(subscription)
    }
}

impl Default for PropertyContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PropertyContainer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyContainer")
            .field("ids", &self.ids().collect::<Vec<_>>())
            .field("emitter", &self.emitter)
            .finish()
    }
}
