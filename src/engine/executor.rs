// Transition executors and exception strategies

//! # Executor Bindings
//!
//! A transition owns no logic of its own. What happens when it fires -
//! which output tokens appear, how the process state changes - lives in a
//! [`TransitionExecutor`] bound to the transition id, and what happens when
//! that logic *fails* lives in the [`ExceptionPolicy`] bound next to it.
//!
//! Executor calls model externally-asynchronous domain logic (an I/O-bound
//! step, a human task, a service call) and may suspend indefinitely. The
//! engine invokes `execute` at most once per attempt and tracks the attempt
//! count separately; exactly-once delivery across process restarts is a
//! persistence concern outside this core.
//!
//! Strategies are a closed tagged variant, not open polymorphism: the set
//! is fixed (fatal, block, retry with delay, continue with fallback) and
//! the instance process handles it exhaustively.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::models::{Color, Marking, StrategyTag, TransitionId};

use super::token_game::TokenSelection;

/// Bound alias for per-instance process state types.
///
/// The state is cloned into each concurrent attempt and replaced when the
/// attempt's outcome is applied, so it must be an owned, cloneable value.
pub trait ProcessState: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> ProcessState for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// Everything an executor gets to see for one attempt.
#[derive(Debug, Clone)]
pub struct FiringContext<C: Color, S> {
    /// Instance the attempt belongs to.
    pub instance: Uuid,
    pub transition: TransitionId,
    /// The exact tokens reserved for this attempt, per input place.
    pub consumed: TokenSelection<C>,
    /// Process state as of reservation time.
    pub state: S,
    /// 1-based attempt number (previous failures + 1).
    pub attempt: u32,
}

/// Result of one executor attempt.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome<C: Color, S> {
    /// Apply `produced` to the output places and replace the process state.
    Success {
        produced: Marking<C>,
        new_state: S,
    },
    /// Route through the transition's exception policy.
    Failure { reason: String },
}

/// What the instance process does with a failed attempt.
#[derive(Debug, Clone)]
pub enum ExceptionStrategy<C: Color> {
    /// Permanently exclude the transition from the enabled set until an
    /// external command clears it.
    Fatal,
    /// Exclude the transition from automatic re-evaluation until an
    /// external command unblocks it.
    Block,
    /// Re-attempt after the delay, re-checking enabledness first.
    RetryWithDelay(Duration),
    /// Treat the failure as a success using this fallback output; the
    /// process state is left unchanged.
    Continue { produced: Marking<C> },
}

impl<C: Color> ExceptionStrategy<C> {
    /// The reporting tag carried on `TransitionFailed` events.
    pub fn tag(&self) -> StrategyTag {
        match self {
            ExceptionStrategy::Fatal => StrategyTag::Fatal,
            ExceptionStrategy::Block => StrategyTag::Block,
            ExceptionStrategy::RetryWithDelay(_) => StrategyTag::Retry,
            ExceptionStrategy::Continue { .. } => StrategyTag::Continue,
        }
    }
}

/// Async domain logic bound to a transition.
#[async_trait::async_trait]
pub trait TransitionExecutor<C: Color, S: ProcessState>: Send + Sync {
    /// Run one attempt. Invoked at most once per attempt; may suspend.
    async fn execute(&self, firing: FiringContext<C, S>) -> ExecutionOutcome<C, S>;
}

/// Adapter turning an async closure into a [`TransitionExecutor`].
///
/// ```
/// # use petriflow::{ExecutionOutcome, FnExecutor, Marking};
/// # use futures::FutureExt;
/// let executor = FnExecutor::new(|firing: petriflow::FiringContext<String, u32>| {
///     async move {
///         ExecutionOutcome::Success {
///             produced: Marking::<String>::new(),
///             new_state: firing.state + 1,
///         }
///     }
///     .boxed()
/// });
/// ```
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        FnExecutor { f }
    }
}

#[async_trait::async_trait]
impl<C, S, F> TransitionExecutor<C, S> for FnExecutor<F>
where
    C: Color,
    S: ProcessState,
    F: Fn(FiringContext<C, S>) -> BoxFuture<'static, ExecutionOutcome<C, S>> + Send + Sync,
{
    async fn execute(&self, firing: FiringContext<C, S>) -> ExecutionOutcome<C, S> {
        (self.f)(firing).await
    }
}

/// Maps `(transition, failure, retry count)` to an [`ExceptionStrategy`].
pub trait ExceptionPolicy<C: Color>: Send + Sync {
    /// `failure_count` is the consecutive failure count including the
    /// failure being resolved (1 on the first failure).
    fn resolve(
        &self,
        transition: TransitionId,
        reason: &str,
        failure_count: u32,
    ) -> ExceptionStrategy<C>;
}

impl<C, F> ExceptionPolicy<C> for F
where
    C: Color,
    F: Fn(TransitionId, &str, u32) -> ExceptionStrategy<C> + Send + Sync,
{
    fn resolve(
        &self,
        transition: TransitionId,
        reason: &str,
        failure_count: u32,
    ) -> ExceptionStrategy<C> {
        self(transition, reason, failure_count)
    }
}

/// Policy that resolves every failure to [`ExceptionStrategy::Fatal`].
pub fn fatal_policy<C: Color>() -> impl ExceptionPolicy<C> {
    |_: TransitionId, _: &str, _: u32| ExceptionStrategy::<C>::Fatal
}

/// Retry with a fixed delay up to `max_attempts` total attempts, then
/// escalate to `then`.
#[derive(Clone)]
pub struct RetryPolicy<C: Color> {
    pub max_attempts: u32,
    pub delay: Duration,
    pub then: ExceptionStrategy<C>,
}

impl<C: Color> RetryPolicy<C> {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
            then: ExceptionStrategy::Fatal,
        }
    }

    pub fn then(mut self, strategy: ExceptionStrategy<C>) -> Self {
        self.then = strategy;
        self
    }
}

impl<C: Color> ExceptionPolicy<C> for RetryPolicy<C> {
    fn resolve(&self, _: TransitionId, _: &str, failure_count: u32) -> ExceptionStrategy<C> {
        if failure_count < self.max_attempts {
            ExceptionStrategy::RetryWithDelay(self.delay)
        } else {
            self.then.clone()
        }
    }
}

/// Per-transition binding of executor and exception policy.
pub(crate) struct TransitionBinding<C: Color, S: ProcessState> {
    pub executor: Arc<dyn TransitionExecutor<C, S>>,
    pub policy: Arc<dyn ExceptionPolicy<C>>,
}

impl<C: Color, S: ProcessState> Clone for TransitionBinding<C, S> {
    fn clone(&self) -> Self {
        TransitionBinding {
            executor: Arc::clone(&self.executor),
            policy: Arc::clone(&self.policy),
        }
    }
}

/// Registry of executor bindings, shared read-only across instances.
///
/// Firing a transition with no binding is rejected as
/// [`crate::EngineError::UnknownTransition`] even when the id exists in the
/// topology - a net definition is only complete once every transition is
/// bound.
pub struct ExecutorRegistry<C: Color, S: ProcessState> {
    bindings: HashMap<TransitionId, TransitionBinding<C, S>>,
}

impl<C: Color, S: ProcessState> Default for ExecutorRegistry<C, S> {
    fn default() -> Self {
        ExecutorRegistry::new()
    }
}

impl<C: Color, S: ProcessState> ExecutorRegistry<C, S> {
    pub fn new() -> Self {
        ExecutorRegistry {
            bindings: HashMap::new(),
        }
    }

    /// Bind `executor` and `policy` to a transition, replacing any previous
    /// binding.
    pub fn bind(
        &mut self,
        transition: TransitionId,
        executor: impl TransitionExecutor<C, S> + 'static,
        policy: impl ExceptionPolicy<C> + 'static,
    ) -> &mut Self {
        self.bindings.insert(
            transition,
            TransitionBinding {
                executor: Arc::new(executor),
                policy: Arc::new(policy),
            },
        );
        self
    }

    pub fn is_bound(&self, transition: TransitionId) -> bool {
        self.bindings.contains_key(&transition)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn get(&self, transition: TransitionId) -> Option<&TransitionBinding<C, S>> {
        self.bindings.get(&transition)
    }
}
