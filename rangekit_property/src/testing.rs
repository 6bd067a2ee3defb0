// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Helpers shared by the unit tests of this crate.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rangekit_signal::{SignalKind, SignalSet};

use crate::base::PropertyKind;
use crate::descriptor::PropertyDescriptor;
use crate::id::PropertyId;

pub(crate) fn descriptor(id: u32) -> PropertyDescriptor {
    PropertyDescriptor::builder(PropertyId::new(id)).build()
}

pub(crate) fn read_only(id: u32) -> PropertyDescriptor {
    PropertyDescriptor::builder(PropertyId::new(id))
        .editable(false)
        .build()
}

/// Counts `ValueChanged` signals emitted by `prop`.
pub(crate) fn signal_counter<P: PropertyKind>(prop: &P) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let sink = hits.clone();
    prop.subscribe(SignalKind::ValueChanged.into(), move |_| sink.set(sink.get() + 1));
    hits
}

/// Records every signal kind emitted by `prop`, in order.
pub(crate) fn signal_log<P: PropertyKind>(prop: &P) -> Rc<RefCell<Vec<SignalKind>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    prop.subscribe(SignalSet::ALL, move |signal| sink.borrow_mut().push(signal.kind));
    log
}
