// Token game - pure enabledness and consumption over a marking

//! # Token Game
//!
//! The token game answers two questions and computes one delta, all without
//! side effects:
//!
//! - [`is_enabled`] / [`enabled_transitions`]: does the marking hold, for
//!   every input arc of a transition, at least `weight` tokens matching the
//!   arc's filter?
//! - [`default_selection`]: pick a concrete set of token instances to
//!   consume, deterministically (first-match in ascending color order).
//! - [`consume`]: validate a caller-supplied selection against the arcs and
//!   return the marking with exactly those tokens removed.
//!
//! An explicit selection exists because multiple tokens of matching color
//! may be present and the caller - normally the instance process - picks a
//! specific combination. The token game is a pure evaluator, not a
//! scheduler: which enabled transition fires, and when, is decided one
//! layer up.

use crate::models::{Color, Marking, Multiset, NetTopology, TransitionId};
use crate::{EngineError, Result};

/// The exact token instances chosen to satisfy a transition's input arcs,
/// keyed by input place.
///
/// Structurally a marking; a valid selection provides, per input arc,
/// exactly `weight` tokens at the arc's place, all matching its filter.
/// (The builder guarantees at most one input arc per place and transition,
/// so keying by place is unambiguous.)
pub type TokenSelection<C> = Marking<C>;

/// Whether `transition` is enabled under `marking`.
///
/// True iff every input arc finds at least `weight` tokens matching its
/// filter at its place. Transitions absent from the topology are simply not
/// enabled; the instance process reports [`EngineError::UnknownTransition`]
/// at its command boundary instead.
pub fn is_enabled<C: Color>(
    topology: &NetTopology<C>,
    marking: &Marking<C>,
    transition: TransitionId,
) -> bool {
    if topology.transition(transition).is_none() {
        return false;
    }
    topology.input_arcs(transition).iter().all(|arc| {
        marking
            .tokens_at(arc.place)
            .map_or(false, |tokens| {
                tokens.total_matching(|color| arc.filter.matches(color)) >= arc.weight
            })
    })
}

/// All enabled transitions under `marking`, in ascending id order.
pub fn enabled_transitions<C: Color>(
    topology: &NetTopology<C>,
    marking: &Marking<C>,
) -> Vec<TransitionId> {
    topology
        .transitions()
        .map(|t| t.id)
        .filter(|id| is_enabled(topology, marking, *id))
        .collect()
}

/// Deterministic first-match token selection for `transition`.
///
/// Walks each input arc and takes tokens in ascending color order until the
/// arc's weight is met, honoring its filter. Returns `None` when the
/// transition is not enabled (or unknown).
pub fn default_selection<C: Color>(
    topology: &NetTopology<C>,
    marking: &Marking<C>,
    transition: TransitionId,
) -> Option<TokenSelection<C>> {
    topology.transition(transition)?;
    let mut selection = Marking::new();
    for arc in topology.input_arcs(transition) {
        let tokens = marking.tokens_at(arc.place)?;
        let mut chosen = Multiset::new();
        let mut needed = arc.weight;
        for color in tokens.colors_sorted() {
            if needed == 0 {
                break;
            }
            if arc.filter.matches(color) {
                let take = needed.min(tokens.count(color));
                chosen.add(color.clone(), take);
                needed -= take;
            }
        }
        if needed > 0 {
            return None;
        }
        selection.add_multiset(arc.place, chosen);
    }
    Some(selection)
}

/// Validate `selection` against the input arcs of `transition` and return
/// the marking with exactly those tokens removed.
///
/// Fails with [`EngineError::InsufficientTokens`] when the selection does
/// not satisfy an arc's weight or filter, names a place that is not an
/// input place of the transition, or picks tokens the marking does not
/// hold. The input marking is never mutated.
pub fn consume<C: Color>(
    topology: &NetTopology<C>,
    marking: &Marking<C>,
    transition: TransitionId,
    selection: &TokenSelection<C>,
) -> Result<Marking<C>> {
    if topology.transition(transition).is_none() {
        return Err(EngineError::UnknownTransition { transition });
    }

    let input_arcs = topology.input_arcs(transition);

    // Every selected place must correspond to an input arc.
    for place in selection.places_sorted() {
        if !input_arcs.iter().any(|arc| arc.place == place) {
            return Err(EngineError::InsufficientTokens { place, transition });
        }
    }

    for arc in input_arcs {
        let insufficient = EngineError::InsufficientTokens {
            place: arc.place,
            transition,
        };
        let Some(chosen) = selection.tokens_at(arc.place) else {
            return Err(insufficient);
        };
        // Exactly `weight` tokens, all matching the arc's filter.
        if chosen.total() != arc.weight {
            return Err(insufficient);
        }
        if chosen.iter().any(|(color, _)| !arc.filter.matches(color)) {
            return Err(insufficient);
        }
        // The marking must actually hold the chosen tokens.
        let held = marking
            .tokens_at(arc.place)
            .is_some_and(|held| chosen.is_subset_of(held));
        if !held {
            return Err(insufficient);
        }
    }

    // Every selected place maps to a validated input arc, so the
    // difference cannot underflow.
    marking
        .checked_sub(selection)
        .ok_or(EngineError::TransitionNotEnabled { transition })
}
