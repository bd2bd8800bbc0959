// Markings - token distributions across places

//! # Markings
//!
//! A marking is the distribution of tokens across places at a point in time:
//! a mapping from [`PlaceId`] to [`Multiset`]. An absent place implies an
//! empty multiset, and empty multisets are pruned on removal so that equal
//! distributions always compare equal.
//!
//! Markings are plain values. Consumption and production are computed on
//! copies by the token game; only the instance process replaces the live
//! marking, which is what makes firings atomic from the outside.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::net::PlaceId;
use super::token::{Color, Multiset};

/// Mapping from place to multiset of tokens.
///
/// Invariant: every stored multiset is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marking<C: Color> {
    places: HashMap<PlaceId, Multiset<C>>,
}

impl<C: Color> Default for Marking<C> {
    fn default() -> Self {
        Marking::new()
    }
}

impl<C: Color> Marking<C> {
    /// Create an empty marking.
    pub fn new() -> Self {
        Marking {
            places: HashMap::new(),
        }
    }

    /// Tokens at `place`, or `None` when the place is unmarked.
    pub fn tokens_at(&self, place: PlaceId) -> Option<&Multiset<C>> {
        self.places.get(&place)
    }

    /// Multiplicity of `color` at `place` (zero when unmarked).
    pub fn count_at(&self, place: PlaceId, color: &C) -> u64 {
        self.places.get(&place).map_or(0, |ms| ms.count(color))
    }

    /// Add a single token of `color` at `place`.
    pub fn add_token(&mut self, place: PlaceId, color: C) {
        self.add_tokens(place, color, 1);
    }

    /// Add `count` tokens of `color` at `place`.
    pub fn add_tokens(&mut self, place: PlaceId, color: C, count: u64) {
        if count == 0 {
            return;
        }
        self.places.entry(place).or_default().add(color, count);
    }

    /// Add a whole multiset at `place`.
    pub fn add_multiset(&mut self, place: PlaceId, tokens: Multiset<C>) {
        if tokens.is_empty() {
            return;
        }
        self.places.entry(place).or_default().merge(&tokens);
    }

    /// Remove `count` tokens of `color` at `place`.
    ///
    /// Returns `false` (leaving the marking unchanged) when the place does
    /// not hold that many.
    pub fn remove_tokens(&mut self, place: PlaceId, color: &C, count: u64) -> bool {
        let Some(ms) = self.places.get_mut(&place) else {
            return count == 0;
        };
        if !ms.remove(color, count) {
            return false;
        }
        if ms.is_empty() {
            self.places.remove(&place);
        }
        true
    }

    /// Whether every token of `other` is also present in `self`.
    pub fn covers(&self, other: &Marking<C>) -> bool {
        other.places.iter().all(|(place, tokens)| {
            self.places
                .get(place)
                .is_some_and(|mine| tokens.is_subset_of(mine))
        })
    }

    /// Union: add every token of `other` into `self`.
    pub fn merge(&mut self, other: &Marking<C>) {
        for (place, tokens) in &other.places {
            self.add_multiset(*place, tokens.clone());
        }
    }

    /// Marking difference, or `None` if `other` is not covered by `self`.
    pub fn checked_sub(&self, other: &Marking<C>) -> Option<Marking<C>> {
        if !self.covers(other) {
            return None;
        }
        let mut out = self.clone();
        for (place, tokens) in &other.places {
            for (color, n) in tokens.iter() {
                out.remove_tokens(*place, color, n);
            }
        }
        Some(out)
    }

    /// Total token count across all places.
    pub fn total_tokens(&self) -> u64 {
        self.places.values().map(Multiset::total).sum()
    }

    /// Whether no place holds any token.
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Iterate over `(place, multiset)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Multiset<C>)> {
        self.places.iter().map(|(p, ms)| (*p, ms))
    }

    /// Marked places in ascending id order.
    pub fn places_sorted(&self) -> Vec<PlaceId> {
        let mut places: Vec<PlaceId> = self.places.keys().copied().collect();
        places.sort();
        places
    }
}

impl<C: Color> FromIterator<(PlaceId, Multiset<C>)> for Marking<C> {
    fn from_iter<I: IntoIterator<Item = (PlaceId, Multiset<C>)>>(iter: I) -> Self {
        let mut marking = Marking::new();
        for (place, tokens) in iter {
            marking.add_multiset(place, tokens);
        }
        marking
    }
}
