// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signal kinds and compact kind sets used to filter subscriptions.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// The kind of change a signal reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// The stored value (or any of its bytes) changed.
    ValueChanged,
    /// The admissible range of values changed.
    LimitsChanged,
}

impl SignalKind {
    /// Every signal kind, in declaration order.
    pub const ALL: [Self; 2] = [Self::ValueChanged, Self::LimitsChanged];

    const fn bit(self) -> u8 {
        match self {
            Self::ValueChanged => 1 << 0,
            Self::LimitsChanged => 1 << 1,
        }
    }

    /// Converts this kind into a single-element [`SignalSet`].
    #[must_use]
    pub const fn into_set(self) -> SignalSet {
        SignalSet(self.bit())
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValueChanged => "value-changed",
            Self::LimitsChanged => "limits-changed",
        })
    }
}

/// A compact set of [`SignalKind`]s.
///
/// Subscribers register interest in a set of kinds; the emitter only calls
/// a subscriber for kinds contained in its set.
///
/// ```
/// use rangekit_signal::{SignalKind, SignalSet};
///
/// let set = SignalKind::ValueChanged.into_set();
/// assert!(set.contains(SignalKind::ValueChanged));
/// assert!(!set.contains(SignalKind::LimitsChanged));
/// assert!(SignalSet::ALL.contains(SignalKind::LimitsChanged));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignalSet(u8);

impl SignalSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// A set containing every kind.
    pub const ALL: Self = Self(0b11);

    /// Returns `true` if the set contains no kinds.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the set contains `kind`.
    #[must_use]
    pub const fn contains(self, kind: SignalKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Inserts `kind` into the set.
    pub fn insert(&mut self, kind: SignalKind) {
        self.0 |= kind.bit();
    }

    /// Removes `kind` from the set.
    pub fn remove(&mut self, kind: SignalKind) {
        self.0 &= !kind.bit();
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(SignalKind::ALL.iter().filter(|kind| self.contains(**kind)))
            .finish()
    }
}

impl BitOr for SignalSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SignalSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<SignalKind> for SignalSet {
    fn from(kind: SignalKind) -> Self {
        kind.into_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn set_insert_remove() {
        let mut set = SignalSet::EMPTY;
        assert!(set.is_empty());

        set.insert(SignalKind::LimitsChanged);
        assert!(set.contains(SignalKind::LimitsChanged));
        assert!(!set.contains(SignalKind::ValueChanged));

        set.remove(SignalKind::LimitsChanged);
        assert!(set.is_empty());
    }

    #[test]
    fn set_union() {
        let set = SignalKind::ValueChanged.into_set() | SignalKind::LimitsChanged.into_set();
        assert_eq!(set, SignalSet::ALL);
    }

    #[test]
    fn debug_lists_members() {
        let debug = format!("{:?}", SignalSet::from(SignalKind::ValueChanged));
        assert_eq!(debug, "{ValueChanged}");
    }

    #[test]
    fn display_is_kebab_case() {
        assert_eq!(format!("{}", SignalKind::LimitsChanged), "limits-changed");
    }
}
