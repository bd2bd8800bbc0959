// Petriflow engine
// Token game evaluation, executor bindings, and the instance process

//! # Petriflow Engine Module
//!
//! The engine layer turns the inert models into a running system, in three
//! pieces with a strict dependency order:
//!
//! ### Token Game (`token_game` module)
//! Pure functions over a topology and a marking: enabledness, the enabled
//! set, deterministic default token selection, and consumption. No side
//! effects, no scheduling decisions.
//!
//! ### Executor Bindings (`executor` module)
//! Per-transition domain logic ([`TransitionExecutor`], an async trait) and
//! the failure policy attached to it ([`ExceptionPolicy`] resolving to the
//! closed [`ExceptionStrategy`] variants). Bindings are collected in an
//! [`ExecutorRegistry`] shared read-only across instances.
//!
//! ### Instance Process (`instance` module)
//! The stateful scheduler. Each instance is a tokio task draining a command
//! mailbox; exactly one command mutates the instance state at a time, while
//! transition executors run concurrently on reserved tokens. Lifecycle
//! events fan out over a broadcast channel.

pub mod executor;
pub mod instance;
pub mod token_game;

pub use executor::{
    fatal_policy, ExceptionPolicy, ExceptionStrategy, ExecutionOutcome, ExecutorRegistry,
    FiringContext, FnExecutor, ProcessState, RetryPolicy, TransitionExecutor,
};
pub use instance::{
    FailureRecord, InstanceHandle, InstanceProcess, InstanceSnapshot, InstanceStatus,
};
pub use token_game::{consume, default_selection, enabled_transitions, is_enabled, TokenSelection};
