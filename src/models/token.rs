// Colored tokens and multisets

//! # Token Multisets
//!
//! In a colored Petri net, tokens carry typed values ("colors") rather than
//! being indistinguishable units. A place therefore holds a *multiset* of
//! colors: a mapping from color to a positive multiplicity.
//!
//! [`Multiset`] is the arithmetic core the whole engine is built on:
//! enabledness is a subset check, consumption is a checked difference, and
//! production is a union. The invariant every operation preserves is that no
//! entry has multiplicity zero - an absent color *is* multiplicity zero.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Bound alias for token color types.
///
/// A color is any owned value with value equality. `Ord` is required so that
/// default token selection is deterministic regardless of hash-map iteration
/// order; `Send + Sync + 'static` lets markings cross task boundaries.
///
/// Blanket-implemented: `String`, integers, or any domain enum deriving the
/// usual traits qualifies automatically.
pub trait Color:
    Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static
{
}

impl<T> Color for T where T: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static {}

/// A bag of colored tokens: color -> multiplicity.
///
/// Invariant: stored multiplicities are always >= 1. Removing the last token
/// of a color removes the entry, so two multisets holding the same tokens
/// always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiset<C: Color> {
    counts: HashMap<C, u64>,
}

impl<C: Color> Default for Multiset<C> {
    fn default() -> Self {
        Multiset::new()
    }
}

impl<C: Color> Multiset<C> {
    /// Create an empty multiset.
    pub fn new() -> Self {
        Multiset {
            counts: HashMap::new(),
        }
    }

    /// Create a multiset holding `count` tokens of a single color.
    pub fn of(color: C, count: u64) -> Self {
        let mut ms = Multiset::new();
        ms.add(color, count);
        ms
    }

    /// Add `count` tokens of `color`. Adding zero is a no-op.
    pub fn add(&mut self, color: C, count: u64) {
        if count == 0 {
            return;
        }
        *self.counts.entry(color).or_insert(0) += count;
    }

    /// Remove `count` tokens of `color`.
    ///
    /// Returns `false` (leaving the multiset unchanged) if fewer than
    /// `count` tokens of that color are present.
    pub fn remove(&mut self, color: &C, count: u64) -> bool {
        if count == 0 {
            return true;
        }
        match self.counts.get_mut(color) {
            Some(n) if *n >= count => {
                *n -= count;
                if *n == 0 {
                    self.counts.remove(color);
                }
                true
            }
            _ => false,
        }
    }

    /// Multiplicity of `color` (zero when absent).
    pub fn count(&self, color: &C) -> u64 {
        self.counts.get(color).copied().unwrap_or(0)
    }

    /// Whether at least `count` tokens of `color` are present.
    pub fn contains(&self, color: &C, count: u64) -> bool {
        self.count(color) >= count
    }

    /// Total number of tokens across all colors.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct colors present.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Whether every entry of `self` is covered by `other`.
    pub fn is_subset_of(&self, other: &Multiset<C>) -> bool {
        self.counts
            .iter()
            .all(|(color, n)| other.contains(color, *n))
    }

    /// Union: add every entry of `other` into `self`.
    pub fn merge(&mut self, other: &Multiset<C>) {
        for (color, n) in &other.counts {
            self.add(color.clone(), *n);
        }
    }

    /// Multiset difference, or `None` if `other` is not a subset of `self`.
    pub fn checked_sub(&self, other: &Multiset<C>) -> Option<Multiset<C>> {
        if !other.is_subset_of(self) {
            return None;
        }
        let mut out = self.clone();
        for (color, n) in &other.counts {
            out.remove(color, *n);
        }
        Some(out)
    }

    /// Total number of tokens whose color satisfies `pred`.
    pub fn total_matching(&self, mut pred: impl FnMut(&C) -> bool) -> u64 {
        self.counts
            .iter()
            .filter(|(color, _)| pred(color))
            .map(|(_, n)| *n)
            .sum()
    }

    /// Iterate over `(color, multiplicity)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&C, u64)> {
        self.counts.iter().map(|(c, n)| (c, *n))
    }

    /// Colors in ascending order. The deterministic spine of default token
    /// selection.
    pub fn colors_sorted(&self) -> Vec<&C> {
        let mut colors: Vec<&C> = self.counts.keys().collect();
        colors.sort();
        colors
    }
}

impl<C: Color> FromIterator<C> for Multiset<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut ms = Multiset::new();
        for color in iter {
            ms.add(color, 1);
        }
        ms
    }
}

impl<C: Color> FromIterator<(C, u64)> for Multiset<C> {
    fn from_iter<I: IntoIterator<Item = (C, u64)>>(iter: I) -> Self {
        let mut ms = Multiset::new();
        for (color, count) in iter {
            ms.add(color, count);
        }
        ms
    }
}
