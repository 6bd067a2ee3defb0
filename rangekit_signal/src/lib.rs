// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rangekit Signal: synchronous change notification primitives.
//!
//! This crate provides the notification base used by the rangekit property
//! engine. It models change notification as:
//!
//! - **Kinds** ([`SignalKind`], [`SignalSet`]): what changed, and which
//!   changes a listener cares about.
//! - **Emitters** ([`Emitter`]): a shared list of listeners that are called
//!   in order, on the emitting thread, before `emit` returns.
//!
//! Emitters are single-threaded (`!Send`); properties and the containers
//! that own them are not shared across threads.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use rangekit_signal::{Emitter, Signal, SignalKind, SignalSet};
//!
//! let emitter = Emitter::<&'static str>::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = log.clone();
//! emitter.subscribe(SignalSet::ALL, move |signal| {
//!     sink.borrow_mut().push((signal.kind, signal.sender));
//! });
//!
//! emitter.emit(&Signal::new(SignalKind::ValueChanged, "gain"));
//! assert_eq!(*log.borrow(), [(SignalKind::ValueChanged, "gain")]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod emitter;
mod kind;

pub use emitter::{Emitter, Signal, SubscriptionId, WeakEmitter};
pub use kind::{SignalKind, SignalSet};
