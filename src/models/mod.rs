// Domain models for colored Petri nets
// Pure data: no scheduling, no I/O

//! # Petri Net Domain Models
//!
//! The model layer is deliberately inert. It defines the vocabulary of the
//! engine - tokens, multisets, markings, the net topology, and the events an
//! instance emits - without any execution logic. The token game
//! ([`crate::engine::token_game`]) evaluates these values; the instance
//! process ([`crate::engine::instance`]) owns and mutates them.
//!
//! ## Module Map
//!
//! - [`token`]: [`Multiset`] and the [`Color`] bound for token color types
//! - [`marking`]: [`Marking`], the place-indexed token distribution
//! - [`net`]: identifiers, [`Place`]/[`Transition`]/[`NetArc`], the
//!   [`ColorFilter`] arc guard, and the validated [`NetTopology`]
//! - [`event`]: [`InstanceEvent`] lifecycle records

pub mod event;
pub mod marking;
pub mod net;
pub mod token;

pub use event::{InstanceEvent, StrategyTag};
pub use marking::Marking;
pub use net::{ColorFilter, NetArc, NetBuilder, NetTopology, Place, PlaceId, Transition, TransitionId};
pub use token::{Color, Multiset};
