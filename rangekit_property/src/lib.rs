// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rangekit Property: typed property storage for sensor configuration.
//!
//! Every configurable or observable value of a ranging sensor is held in a
//! property: a typed array of elements backed by two byte buffers, the
//! current value and a shadow of the last value confirmed with the device.
//! Protocol code reads and writes the raw bytes, application code works
//! through typed accessors and text, and both see the same dirty state.
//!
//! ## Core Concepts
//!
//! ### Properties
//!
//! Seven typed properties share one storage core ([`PropertyCore`]) and the
//! [`PropertyKind`] trait:
//!
//! | Type | Stored as | Text |
//! |------|-----------|------|
//! | [`BoolProperty`] | one byte | `true` / `false` |
//! | [`IntegerProperty`] | 1, 2, 4 or 8 bytes, signed or unsigned | decimal or any radix |
//! | [`FloatProperty`] | native `f32`, or a scaled fixed-point `i32` | fixed decimals |
//! | [`EnumProperty`] | raw value or table index | entry label |
//! | [`BitFieldProperty`] | 1, 2, 4 or 8 bytes | `0`/`1`/`x` per bit, MSB first |
//! | [`TextProperty`] | fixed byte block (ASCII, UTF-8 or UTF-16) | the string |
//! | [`BufferProperty`] | fixed byte block | upper-case hex |
//!
//! [`Property`] is the closed sum of the seven, used wherever properties of
//! mixed types are stored together.
//!
//! ### Dirty tracking
//!
//! - `is_modified()` - current bytes differ from the backup
//! - `set_clean()` - accept the current bytes as the device state
//! - `restore()` - revert to the backup
//!
//! ### Edit gate
//!
//! `set_*` methods fail on properties without [`Features::EDITABLE`];
//! `force_*` methods apply the same validation but skip that check. A
//! failed write never changes either buffer.
//!
//! ### Signals
//!
//! Each property owns an emitter from `rangekit_signal`. A write that
//! changes bytes emits exactly one [`SignalKind::ValueChanged`]; a write
//! that stores the bytes already present emits nothing. Limit and table
//! changes emit [`SignalKind::LimitsChanged`].
//!
//! ### Containers
//!
//! [`PropertyContainer`] owns properties keyed by [`PropertyId`], looks them
//! up by id, device id, category or feature, aggregates dirty state and
//! re-emits every signal of its properties. Containers can also be filled
//! from a JSON definition document with
//! [`load_definitions`](PropertyContainer::load_definitions).
//!
//! ## Quick Start
//!
//! ```rust
//! use rangekit_property::{
//!     Category, IntegerProperty, PropertyDescriptor, PropertyId, PropertyKind, SignalKind,
//! };
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut gain = IntegerProperty::new(
//!     PropertyDescriptor::builder(PropertyId::new(0x10))
//!         .category(Category::CONFIGURATION)
//!         .description("receiver gain")
//!         .build(),
//!     2,
//!     true,
//! )?;
//!
//! let changes = Rc::new(Cell::new(0));
//! let counter = changes.clone();
//! gain.subscribe(SignalKind::ValueChanged.into(), move |_| counter.set(counter.get() + 1));
//!
//! gain.set_value(0, 12)?;
//! gain.set_value(0, 12)?;
//! assert_eq!(changes.get(), 1);
//!
//! // The protocol layer pushes the edit, then accepts it.
//! assert!(gain.is_modified());
//! assert_eq!(gain.storage(), &[12, 0]);
//! gain.set_clean();
//! assert!(!gain.is_modified());
//!
//! gain.set_string_value(0, "-3")?;
//! gain.restore();
//! assert_eq!(gain.value(0)?, 12);
//! # Ok::<(), rangekit_property::PropertyError>(())
//! ```
//!
//! ## Threading
//!
//! Properties and containers are single-threaded: they are neither `Send`
//! nor `Sync`, and all operations are synchronous.

mod base;
mod bitfield;
mod boolean;
mod buffer;
mod container;
mod definition;
mod descriptor;
mod enumeration;
mod error;
mod float;
mod id;
mod integer;
mod property;
mod storage;
mod text;
mod value;

#[cfg(test)]
mod testing;

pub use base::{Access, PropertyCore, PropertyKind};
pub use bitfield::BitFieldProperty;
pub use boolean::BoolProperty;
pub use buffer::BufferProperty;
pub use container::{PropertyContainer, PropertyMut};
pub use definition::{DefinitionError, IdMapping};
pub use descriptor::{
    Category, Features, PropertyDescriptor, PropertyDescriptorBuilder, PropertyType,
};
pub use enumeration::{EnumProperty, EnumStorage};
pub use error::{ErrorKind, PropertyError, Result};
pub use float::FloatProperty;
pub use id::{DeviceId, PropertyId};
pub use integer::{IntegerLimits, IntegerProperty};
pub use property::{Property, PropertyVariant};
pub use storage::RawStorage;
pub use text::{TextEncoding, TextProperty};
pub use value::PropertyValue;

pub use rangekit_signal::{Signal, SignalKind, SignalSet, SubscriptionId};
