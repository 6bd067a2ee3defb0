// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared, single-threaded signal emitter with filtered subscriptions.

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use core::fmt;

use smallvec::SmallVec;

use crate::kind::{SignalKind, SignalSet};

/// A delivered notification: what changed and who sent it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signal<S> {
    /// The kind of change.
    pub kind: SignalKind,
    /// The object the change originated from.
    pub sender: S,
}

impl<S> Signal<S> {
    /// Creates a signal of `kind` originating from `sender`.
    #[inline]
    #[must_use]
    pub const fn new(kind: SignalKind, sender: S) -> Self {
        Self { kind, sender }
    }
}

/// Handle returned by [`Emitter::subscribe`], used to unsubscribe later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

impl SubscriptionId {
    /// Returns the raw numeric value of this handle.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

type Listener<S> = Rc<dyn Fn(&Signal<S>)>;

struct Subscription<S> {
    id: SubscriptionId,
    filter: SignalSet,
    listener: Listener<S>,
}

struct Registry<S> {
    subscriptions: SmallVec<[Subscription<S>; 2]>,
    next_id: u32,
    enabled: bool,
}

/// A shared list of listeners that are invoked synchronously on [`emit`](Self::emit).
///
/// Cloning an `Emitter` yields another handle to the same listener list.
/// Listeners run in subscription order. The listener list is snapshotted
/// before delivery, so a listener may subscribe, unsubscribe, or emit again
/// without invalidating the current delivery.
///
/// ```
/// use core::cell::Cell;
/// use std::rc::Rc;
///
/// use rangekit_signal::{Emitter, Signal, SignalKind, SignalSet};
///
/// let emitter = Emitter::<u32>::new();
/// let seen = Rc::new(Cell::new(0));
/// let counter = seen.clone();
/// let id = emitter.subscribe(SignalKind::ValueChanged.into(), move |signal| {
///     assert_eq!(signal.sender, 7);
///     counter.set(counter.get() + 1);
/// });
///
/// emitter.emit(&Signal::new(SignalKind::ValueChanged, 7));
/// emitter.emit(&Signal::new(SignalKind::LimitsChanged, 7));
/// assert_eq!(seen.get(), 1);
///
/// assert!(emitter.unsubscribe(id));
/// emitter.emit(&Signal::new(SignalKind::ValueChanged, 7));
/// assert_eq!(seen.get(), 1);
/// ```
pub struct Emitter<S> {
    inner: Rc<RefCell<Registry<S>>>,
}

impl<S> Emitter<S> {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                subscriptions: SmallVec::new(),
                next_id: 0,
                enabled: true,
            })),
        }
    }

    /// Registers `listener` for every kind in `filter`.
    pub fn subscribe<F>(&self, filter: SignalSet, listener: F) -> SubscriptionId
    where
        F: Fn(&Signal<S>) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let id = SubscriptionId(registry.next_id);
        registry.next_id = registry.next_id.wrapping_add(1);
        registry.subscriptions.push(Subscription {
            id,
            filter,
            listener: Rc::new(listener),
        });
        id
    }

    /// Removes a listener. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.inner.borrow_mut();
        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|sub| sub.id != id);
        registry.subscriptions.len() != before
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.inner.borrow_mut().subscriptions.clear();
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    /// Enables or disables delivery. While disabled, [`emit`](Self::emit) is a no-op.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.borrow_mut().enabled = enabled;
    }

    /// Returns `true` if delivery is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    /// Delivers `signal` to every listener whose filter contains its kind.
    pub fn emit(&self, signal: &Signal<S>) {
        let targets: SmallVec<[Listener<S>; 4]> = {
            let registry = self.inner.borrow();
            if !registry.enabled {
                return;
            }
            registry
                .subscriptions
                .iter()
                .filter(|sub| sub.filter.contains(signal.kind))
                .map(|sub| Rc::clone(&sub.listener))
                .collect()
        };
        for listener in targets {
            listener(signal);
        }
    }

    /// Returns a non-owning handle to this emitter.
    #[must_use]
    pub fn downgrade(&self) -> WeakEmitter<S> {
        WeakEmitter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if both handles share one listener registry.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S> Default for Emitter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Emitter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Emitter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.borrow();
        f.debug_struct("Emitter")
            .field("listeners", &registry.subscriptions.len())
            .field("enabled", &registry.enabled)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to an [`Emitter`].
///
/// Used to forward signals into an emitter without keeping it alive.
pub struct WeakEmitter<S> {
    inner: Weak<RefCell<Registry<S>>>,
}

impl<S> WeakEmitter<S> {
    /// Returns the emitter if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Emitter<S>> {
        self.inner.upgrade().map(|inner| Emitter { inner })
    }
}

impl<S> Clone for WeakEmitter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for WeakEmitter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEmitter")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::cell::Cell;

    #[test]
    fn filter_restricts_delivery() {
        let emitter = Emitter::<u8>::new();
        let limits = Rc::new(Cell::new(0_u32));
        let l = limits.clone();
        emitter.subscribe(SignalKind::LimitsChanged.into(), move |_| l.set(l.get() + 1));

        emitter.emit(&Signal::new(SignalKind::ValueChanged, 1));
        assert_eq!(limits.get(), 0);
        emitter.emit(&Signal::new(SignalKind::LimitsChanged, 1));
        assert_eq!(limits.get(), 1);
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let emitter = Emitter::<u8>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3_u8 {
            let log = log.clone();
            emitter.subscribe(SignalSet::ALL, move |_| log.borrow_mut().push(tag));
        }
        emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
        assert_eq!(*log.borrow(), [0, 1, 2]);
    }

    #[test]
    fn disabled_emitter_is_silent() {
        let emitter = Emitter::<u8>::new();
        let hits = Rc::new(Cell::new(0_u32));
        let h = hits.clone();
        emitter.subscribe(SignalSet::ALL, move |_| h.set(h.get() + 1));

        emitter.set_enabled(false);
        emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
        assert_eq!(hits.get(), 0);

        emitter.set_enabled(true);
        emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let emitter = Emitter::<u8>::new();
        let hits = Rc::new(Cell::new(0_u32));
        let slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let handle = emitter.clone();
        let h = hits.clone();
        let s = slot.clone();
        let id = emitter.subscribe(SignalSet::ALL, move |_| {
            h.set(h.get() + 1);
            if let Some(id) = s.get() {
                handle.unsubscribe(id);
            }
        });
        slot.set(Some(id));

        emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
        emitter.emit(&Signal::new(SignalKind::ValueChanged, 0));
        assert_eq!(hits.get(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn clones_share_listeners() {
        let a = Emitter::<u8>::new();
        let b = a.clone();
        b.subscribe(SignalSet::ALL, |_| {});
        assert_eq!(a.listener_count(), 1);
        a.clear();
        assert_eq!(b.listener_count(), 0);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Emitter::new()));
    }

    #[test]
    fn weak_handle_does_not_keep_alive() {
        let emitter = Emitter::<u8>::new();
        let weak = emitter.downgrade();
        assert!(weak.upgrade().is_some());
        drop(emitter);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn unsubscribe_unknown_returns_false() {
        let emitter = Emitter::<u8>::new();
        assert!(!emitter.unsubscribe(SubscriptionId(42)));
    }
}
