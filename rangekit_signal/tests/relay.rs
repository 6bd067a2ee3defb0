// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for relaying signals between emitters.
//!
//! These mirror how a container republishes the signals of the objects it
//! owns through a weak handle to its own emitter.

use std::cell::RefCell;
use std::rc::Rc;

use rangekit_signal::{Emitter, Signal, SignalKind, SignalSet};

fn relay(from: &Emitter<u32>, to: &Emitter<u32>) {
    let weak = to.downgrade();
    from.subscribe(SignalSet::ALL, move |signal| {
        if let Some(target) = weak.upgrade() {
            target.emit(signal);
        }
    });
}

#[test]
fn relayed_signals_keep_their_sender() {
    let child = Emitter::new();
    let parent = Emitter::new();
    relay(&child, &parent);

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    parent.subscribe(SignalKind::LimitsChanged.into(), move |signal| {
        sink.borrow_mut().push(*signal);
    });

    child.emit(&Signal::new(SignalKind::ValueChanged, 7));
    child.emit(&Signal::new(SignalKind::LimitsChanged, 7));
    assert_eq!(*log.borrow(), [Signal::new(SignalKind::LimitsChanged, 7)]);
}

#[test]
fn relay_outlives_its_target_quietly() {
    let child = Emitter::new();
    let parent = Emitter::new();
    relay(&child, &parent);
    drop(parent);
    child.emit(&Signal::new(SignalKind::ValueChanged, 1));
    assert_eq!(child.listener_count(), 1);
}

#[test]
fn listener_may_subscribe_during_emit() {
    let emitter: Emitter<u32> = Emitter::new();
    let hits = Rc::new(RefCell::new(0));

    let handle = emitter.clone();
    let sink = hits.clone();
    emitter.subscribe(SignalSet::ALL, move |_| {
        let inner = sink.clone();
        handle.subscribe(SignalSet::ALL, move |_| *inner.borrow_mut() += 1);
    });

    // Listeners added during delivery only see later signals.
    emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
    assert_eq!(*hits.borrow(), 0);
    emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
    assert_eq!(*hits.borrow(), 1);
}

#[test]
fn disabling_the_source_silences_the_chain() {
    let child = Emitter::new();
    let parent = Emitter::new();
    relay(&child, &parent);

    let hits = Rc::new(RefCell::new(0));
    let sink = hits.clone();
    parent.subscribe(SignalSet::ALL, move |_| *sink.borrow_mut() += 1);

    child.set_enabled(false);
    child.emit(&Signal::new(SignalKind::ValueChanged, 3));
    assert_eq!(*hits.borrow(), 0);
    child.set_enabled(true);
    child.emit(&Signal::new(SignalKind::ValueChanged, 3));
    assert_eq!(*hits.borrow(), 1);
}
