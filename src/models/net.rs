// Net topology - places, transitions, arcs

//! # Net Topology
//!
//! The structural half of a colored Petri net: an immutable, strictly
//! bipartite directed graph of [`Place`]s and [`Transition`]s connected by
//! weighted, filtered [`NetArc`]s.
//!
//! ## Core Concepts
//!
//! **Places** are passive: they hold tokens. **Transitions** are active:
//! when fired they consume tokens from the places on their input arcs and
//! produce tokens on the places on their output arcs. An arc's *weight* is
//! the number of tokens it requires (or contributes), and its
//! [`ColorFilter`] restricts which token colors count towards that weight.
//!
//! Token types are erased at this level: the topology describes structure
//! only, parameterized over the color type. Which colors actually flow is
//! the business of the token game and the executor bindings.
//!
//! ## Validation
//!
//! A topology can only be obtained through [`NetBuilder::build`], which
//! checks unique ids, existing arc endpoints, positive weights, and at most
//! one arc per direction between a given place and transition. A built
//! topology is immutable and can be shared read-only across any number of
//! instances (`Arc<NetTopology<C>>`).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

use super::token::Color;

/// Stable identifier of a place within a net.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlaceId(pub u32);

impl From<u32> for PlaceId {
    fn from(id: u32) -> Self {
        PlaceId(id)
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Stable identifier of a transition within a net.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TransitionId(pub u32);

impl From<u32> for TransitionId {
    fn from(id: u32) -> Self {
        TransitionId(id)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A state in the net where tokens reside. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    /// Human-readable label, e.g. `"review"` or `"payment_pending"`.
    pub label: String,
}

impl Place {
    pub fn new(id: impl Into<PlaceId>, label: impl Into<String>) -> Self {
        Place {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// An action that consumes and produces tokens. Immutable once created.
///
/// A transition owns no mutable state and no logic; its behavior lives in
/// the executor binding registered for it. The `automated` flag marks
/// transitions that fire without an external trigger whenever enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,
    /// Human-readable label, e.g. `"approve"` or `"ship"`.
    pub label: String,
    /// Fires automatically whenever enabled.
    pub automated: bool,
}

impl Transition {
    /// A manual transition: fires only on an explicit command.
    pub fn new(id: impl Into<TransitionId>, label: impl Into<String>) -> Self {
        Transition {
            id: id.into(),
            label: label.into(),
            automated: false,
        }
    }

    /// An automated transition: fires whenever enabled.
    pub fn automated(id: impl Into<TransitionId>, label: impl Into<String>) -> Self {
        Transition {
            automated: true,
            ..Transition::new(id, label)
        }
    }
}

/// Restricts which token colors an arc matches.
///
/// Filters are closed data rather than predicates so topologies stay
/// comparable, printable and serializable. `Any` matches every color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorFilter<C: Color> {
    Any,
    Equals(C),
    OneOf(Vec<C>),
}

impl<C: Color> Default for ColorFilter<C> {
    fn default() -> Self {
        ColorFilter::Any
    }
}

impl<C: Color> ColorFilter<C> {
    pub fn matches(&self, color: &C) -> bool {
        match self {
            ColorFilter::Any => true,
            ColorFilter::Equals(wanted) => wanted == color,
            ColorFilter::OneOf(wanted) => wanted.contains(color),
        }
    }
}

/// Directed edge between a place and a transition.
///
/// The same struct describes both directions; an arc's role (input vs
/// output) is determined by whether it is registered via
/// [`NetBuilder::input_arc`] (place -> transition) or
/// [`NetBuilder::output_arc`] (transition -> place). The net stays strictly
/// bipartite by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetArc<C: Color> {
    pub place: PlaceId,
    pub transition: TransitionId,
    /// Required (input) or contributed (output) token multiplicity.
    pub weight: u64,
    /// Which token colors count towards the weight.
    pub filter: ColorFilter<C>,
}

impl<C: Color> NetArc<C> {
    /// An arc with weight 1 matching any color.
    pub fn new(place: impl Into<PlaceId>, transition: impl Into<TransitionId>) -> Self {
        NetArc {
            place: place.into(),
            transition: transition.into(),
            weight: 1,
            filter: ColorFilter::Any,
        }
    }

    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_filter(mut self, filter: ColorFilter<C>) -> Self {
        self.filter = filter;
        self
    }
}

/// The immutable bipartite graph of places, transitions and arcs.
///
/// Transitions are stored in a `BTreeMap`, so every enumeration the engine
/// performs (enabled-set computation, automatic progression) is in
/// ascending transition-id order.
#[derive(Debug, Clone)]
pub struct NetTopology<C: Color> {
    places: HashMap<PlaceId, Place>,
    transitions: BTreeMap<TransitionId, Transition>,
    inputs: HashMap<TransitionId, Vec<NetArc<C>>>,
    outputs: HashMap<TransitionId, Vec<NetArc<C>>>,
    /// Transitions that consume from a given place.
    consumers: HashMap<PlaceId, Vec<TransitionId>>,
    /// Transitions that produce into a given place.
    producers: HashMap<PlaceId, Vec<TransitionId>>,
}

impl<C: Color> NetTopology<C> {
    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places.get(&id)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    pub fn contains_place(&self, id: PlaceId) -> bool {
        self.places.contains_key(&id)
    }

    /// All transitions in ascending id order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Ids of automated transitions in ascending order.
    pub fn automated_transitions(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.transitions
            .values()
            .filter(|t| t.automated)
            .map(|t| t.id)
    }

    /// Input arcs (place -> transition) of a transition.
    pub fn input_arcs(&self, transition: TransitionId) -> &[NetArc<C>] {
        self.inputs.get(&transition).map_or(&[], Vec::as_slice)
    }

    /// Output arcs (transition -> place) of a transition.
    pub fn output_arcs(&self, transition: TransitionId) -> &[NetArc<C>] {
        self.outputs.get(&transition).map_or(&[], Vec::as_slice)
    }

    /// Places a transition consumes from.
    pub fn input_places(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.input_arcs(transition).iter().map(|arc| arc.place)
    }

    /// Places a transition produces into.
    pub fn output_places(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.output_arcs(transition).iter().map(|arc| arc.place)
    }

    /// Transitions with an input arc at `place`, ascending.
    pub fn transitions_from(&self, place: PlaceId) -> &[TransitionId] {
        self.consumers.get(&place).map_or(&[], Vec::as_slice)
    }

    /// Transitions with an output arc at `place`, ascending.
    pub fn transitions_into(&self, place: PlaceId) -> &[TransitionId] {
        self.producers.get(&place).map_or(&[], Vec::as_slice)
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }
}

/// Validating builder for [`NetTopology`].
///
/// ```
/// # use petriflow::{NetBuilder, NetArc, ColorFilter};
/// let topology = NetBuilder::<String>::new()
///     .place(1, "draft")
///     .place(2, "review")
///     .transition(1, "submit")
///     .input_arc(NetArc::new(1, 1))
///     .output_arc(NetArc::new(2, 1))
///     .build()
///     .unwrap();
/// assert_eq!(topology.input_arcs(1.into()).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NetBuilder<C: Color> {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    inputs: Vec<NetArc<C>>,
    outputs: Vec<NetArc<C>>,
}

impl<C: Color> Default for NetBuilder<C> {
    fn default() -> Self {
        NetBuilder::new()
    }
}

impl<C: Color> NetBuilder<C> {
    pub fn new() -> Self {
        NetBuilder {
            places: Vec::new(),
            transitions: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn place(mut self, id: impl Into<PlaceId>, label: impl Into<String>) -> Self {
        self.places.push(Place::new(id, label));
        self
    }

    pub fn transition(mut self, id: impl Into<TransitionId>, label: impl Into<String>) -> Self {
        self.transitions.push(Transition::new(id, label));
        self
    }

    pub fn automated_transition(
        mut self,
        id: impl Into<TransitionId>,
        label: impl Into<String>,
    ) -> Self {
        self.transitions.push(Transition::automated(id, label));
        self
    }

    /// Register a place -> transition arc.
    pub fn input_arc(mut self, arc: NetArc<C>) -> Self {
        self.inputs.push(arc);
        self
    }

    /// Register a transition -> place arc.
    pub fn output_arc(mut self, arc: NetArc<C>) -> Self {
        self.outputs.push(arc);
        self
    }

    /// Validate and freeze the topology.
    ///
    /// Errors: [`EngineError::DuplicatePlace`],
    /// [`EngineError::DuplicateTransition`], [`EngineError::UnknownPlace`],
    /// [`EngineError::UnknownTransition`] for dangling arc endpoints, and
    /// [`EngineError::InvalidArc`] for zero weights or duplicate edges.
    pub fn build(self) -> Result<NetTopology<C>> {
        let mut places = HashMap::new();
        for place in self.places {
            let id = place.id;
            if places.insert(id, place).is_some() {
                return Err(EngineError::DuplicatePlace { place: id });
            }
        }

        let mut transitions = BTreeMap::new();
        for transition in self.transitions {
            let id = transition.id;
            if transitions.insert(id, transition).is_some() {
                return Err(EngineError::DuplicateTransition { transition: id });
            }
        }

        let mut inputs: HashMap<TransitionId, Vec<NetArc<C>>> = HashMap::new();
        let mut outputs: HashMap<TransitionId, Vec<NetArc<C>>> = HashMap::new();
        let mut consumers: HashMap<PlaceId, Vec<TransitionId>> = HashMap::new();
        let mut producers: HashMap<PlaceId, Vec<TransitionId>> = HashMap::new();

        let mut register = |arc: NetArc<C>,
                            table: &mut HashMap<TransitionId, Vec<NetArc<C>>>,
                            adjacency: &mut HashMap<PlaceId, Vec<TransitionId>>,
                            role: &str|
         -> Result<()> {
            if !places.contains_key(&arc.place) {
                return Err(EngineError::UnknownPlace { place: arc.place });
            }
            if !transitions.contains_key(&arc.transition) {
                return Err(EngineError::UnknownTransition {
                    transition: arc.transition,
                });
            }
            if arc.weight == 0 {
                return Err(EngineError::InvalidArc {
                    detail: format!("{role} arc {}-{} has zero weight", arc.place, arc.transition),
                });
            }
            let arcs = table.entry(arc.transition).or_default();
            if arcs.iter().any(|existing| existing.place == arc.place) {
                return Err(EngineError::InvalidArc {
                    detail: format!(
                        "duplicate {role} arc between {} and {}",
                        arc.place, arc.transition
                    ),
                });
            }
            adjacency.entry(arc.place).or_default().push(arc.transition);
            arcs.push(arc);
            Ok(())
        };

        for arc in self.inputs {
            register(arc, &mut inputs, &mut consumers, "input")?;
        }
        for arc in self.outputs {
            register(arc, &mut outputs, &mut producers, "output")?;
        }

        for ids in consumers.values_mut().chain(producers.values_mut()) {
            ids.sort();
        }

        Ok(NetTopology {
            places,
            transitions,
            inputs,
            outputs,
            consumers,
            producers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_net() -> NetTopology<String> {
        NetBuilder::new()
            .place(1, "draft")
            .place(2, "review")
            .place(3, "published")
            .transition(1, "submit")
            .automated_transition(2, "publish")
            .input_arc(NetArc::new(1, 1))
            .output_arc(NetArc::new(2, 1))
            .input_arc(NetArc::new(2, 2))
            .output_arc(NetArc::new(3, 2))
            .build()
            .unwrap()
    }

    #[test]
    fn adjacency_queries() {
        let net = review_net();
        assert_eq!(net.place_count(), 3);
        assert_eq!(net.transition_count(), 2);

        let submit = TransitionId(1);
        assert_eq!(
            net.input_places(submit).collect::<Vec<_>>(),
            vec![PlaceId(1)]
        );
        assert_eq!(
            net.output_places(submit).collect::<Vec<_>>(),
            vec![PlaceId(2)]
        );
        assert_eq!(net.transitions_from(PlaceId(2)), &[TransitionId(2)]);
        assert_eq!(net.transitions_into(PlaceId(2)), &[TransitionId(1)]);
        assert!(net.transitions_from(PlaceId(3)).is_empty());
    }

    #[test]
    fn transitions_iterate_in_ascending_id_order() {
        let net: NetTopology<String> = NetBuilder::new()
            .transition(3, "c")
            .transition(1, "a")
            .automated_transition(2, "b")
            .build()
            .unwrap();
        let ids: Vec<u32> = net.transitions().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let automated: Vec<TransitionId> = net.automated_transitions().collect();
        assert_eq!(automated, vec![TransitionId(2)]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = NetBuilder::<String>::new()
            .place(1, "a")
            .place(1, "b")
            .build()
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicatePlace { place: PlaceId(1) });

        let err = NetBuilder::<String>::new()
            .transition(7, "a")
            .transition(7, "b")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::DuplicateTransition {
                transition: TransitionId(7)
            }
        );
    }

    #[test]
    fn dangling_arc_endpoints_are_rejected() {
        let err = NetBuilder::<String>::new()
            .transition(1, "t")
            .input_arc(NetArc::new(9, 1))
            .build()
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownPlace { place: PlaceId(9) });

        let err = NetBuilder::<String>::new()
            .place(1, "p")
            .output_arc(NetArc::new(1, 9))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownTransition {
                transition: TransitionId(9)
            }
        );
    }

    #[test]
    fn zero_weight_and_duplicate_arcs_are_rejected() {
        let err = NetBuilder::<String>::new()
            .place(1, "p")
            .transition(1, "t")
            .input_arc(NetArc::new(1, 1).with_weight(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArc { .. }));

        let err = NetBuilder::<String>::new()
            .place(1, "p")
            .transition(1, "t")
            .input_arc(NetArc::new(1, 1))
            .input_arc(NetArc::new(1, 1).with_weight(2))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArc { .. }));
    }

    #[test]
    fn color_filters_match() {
        let any: ColorFilter<String> = ColorFilter::Any;
        assert!(any.matches(&"x".to_string()));

        let equals = ColorFilter::Equals("x".to_string());
        assert!(equals.matches(&"x".to_string()));
        assert!(!equals.matches(&"y".to_string()));

        let one_of = ColorFilter::OneOf(vec!["a".to_string(), "b".to_string()]);
        assert!(one_of.matches(&"b".to_string()));
        assert!(!one_of.matches(&"c".to_string()));
    }
}
