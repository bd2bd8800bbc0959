// Petriflow - colored Petri net execution engine
// Token game, instance scheduling, and failure-handling policies

//! # Petriflow Library
//!
//! Petriflow executes **colored Petri nets** as a process model: places hold
//! typed tokens, transitions consume tokens from their input places and
//! produce tokens on their output places, and a running *instance* advances
//! by repeatedly firing enabled transitions until no automated transition
//! remains enabled.
//!
//! ## Core Components
//!
//! ### Domain Models
//! - [`Multiset`]: a bag of colored tokens with positive multiplicities
//! - [`Marking`]: the distribution of tokens across places at a point in time
//! - [`NetTopology`]: the immutable bipartite graph of places, transitions
//!   and weighted, filtered arcs, built through [`NetBuilder`]
//! - [`InstanceEvent`]: the externally observable record of state change
//!
//! ### Token Game
//! Pure evaluation over a topology and a marking: [`is_enabled`],
//! [`enabled_transitions`], deterministic [`default_selection`] and
//! [`consume`]. The token game never schedules anything - it only answers
//! questions and computes marking deltas.
//!
//! ### Execution
//! - [`TransitionExecutor`]: async domain logic bound to a transition
//! - [`ExceptionStrategy`] / [`ExceptionPolicy`]: what happens when that
//!   logic fails (fatal, block, retry with delay, continue with fallback)
//! - [`InstanceProcess`]: the per-instance scheduler. One mailbox, one
//!   owner of the instance state; transition executors run concurrently but
//!   every mutation of the marking goes through the serialized command loop.
//!
//! ## Minimal example
//!
//! ```no_run
//! use petriflow::{
//!     ExecutionOutcome, ExecutorRegistry, FiringContext, FnExecutor,
//!     InstanceProcess, Marking, NetArc, NetBuilder, fatal_policy,
//! };
//! use futures::FutureExt;
//! use std::sync::Arc;
//!
//! # async fn demo() -> petriflow::Result<()> {
//! let topology = NetBuilder::new()
//!     .place(1, "queue")
//!     .place(2, "done")
//!     .automated_transition(1, "work")
//!     .input_arc(NetArc::new(1, 1))
//!     .output_arc(NetArc::new(2, 1))
//!     .build()?;
//!
//! let mut registry = ExecutorRegistry::new();
//! registry.bind(
//!     1.into(),
//!     FnExecutor::new(|firing: FiringContext<String, ()>| {
//!         async move {
//!             let mut produced = Marking::new();
//!             produced.add_token(2.into(), "done".to_string());
//!             ExecutionOutcome::Success { produced, new_state: firing.state }
//!         }
//!         .boxed()
//!     }),
//!     fatal_policy(),
//! );
//!
//! let mut initial = Marking::new();
//! initial.add_token(1.into(), "job".to_string());
//!
//! let handle = InstanceProcess::spawn(Arc::new(topology), Arc::new(registry), initial, ())?;
//! handle.wait_until_idle().await?;
//! # Ok(())
//! # }
//! ```

// Core domain models: tokens, markings, net topology, events
pub mod models;

// Execution: token game, executor bindings, the instance process
pub mod engine;

// Re-export core domain types for easy access
pub use models::{
    Color,         // bound alias for token color types
    ColorFilter,   // arc-level token color filter
    InstanceEvent, // observable record of state change
    Marking,       // place -> multiset of tokens
    Multiset,      // bag of colored tokens
    NetArc,        // weighted, filtered place/transition edge
    NetBuilder,    // validating topology builder
    NetTopology,   // immutable bipartite net
    Place,         // place definition
    PlaceId,       // stable place identifier
    StrategyTag,   // reporting mirror of the resolved strategy
    Transition,    // transition definition
    TransitionId,  // stable transition identifier
};

// Re-export engine types for convenience
pub use engine::{
    consume, default_selection, enabled_transitions, fatal_policy, is_enabled, ExceptionPolicy,
    ExceptionStrategy, ExecutionOutcome, ExecutorRegistry, FailureRecord, FiringContext,
    FnExecutor, InstanceHandle, InstanceProcess, InstanceSnapshot, InstanceStatus, ProcessState,
    RetryPolicy, TokenSelection, TransitionExecutor,
};

use thiserror::Error;

/// Errors surfaced synchronously by the engine.
///
/// Structural errors (unknown ids, insufficient tokens, malformed nets) are
/// rejected at the command boundary with instance state unchanged. Domain
/// failures inside transition logic never appear here - they are routed
/// through the exception strategy and surface as
/// [`InstanceEvent::TransitionFailed`] events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The transition's input places do not hold sufficient matching tokens,
    /// or the transition is fatally failed and excluded from the enabled set.
    #[error("transition {transition} is not enabled")]
    TransitionNotEnabled { transition: TransitionId },

    /// A token selection does not satisfy an input arc's weight or filter.
    #[error("insufficient tokens at place {place} for transition {transition}")]
    InsufficientTokens {
        place: PlaceId,
        transition: TransitionId,
    },

    /// The transition id is not part of the topology, or no executor is
    /// bound to it.
    #[error("unknown transition {transition}")]
    UnknownTransition { transition: TransitionId },

    /// The place id is not part of the topology.
    #[error("unknown place {place}")]
    UnknownPlace { place: PlaceId },

    /// A place id was registered twice while building a topology.
    #[error("duplicate place {place}")]
    DuplicatePlace { place: PlaceId },

    /// A transition id was registered twice while building a topology.
    #[error("duplicate transition {transition}")]
    DuplicateTransition { transition: TransitionId },

    /// An arc violates the net structure (zero weight, duplicate edge).
    #[error("invalid arc: {detail}")]
    InvalidArc { detail: String },

    /// The instance's mailbox is closed; no further commands are accepted.
    #[error("instance terminated")]
    InstanceTerminated,
}

/// Shorthand for results using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;
