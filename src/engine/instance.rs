// Instance process - the per-instance scheduler

//! # Instance Process
//!
//! One running net instance is one tokio task draining a command mailbox.
//! Exactly one command mutates the instance state at a time: external
//! requests from the [`InstanceHandle`], executor completions, and retry
//! timer expiries all arrive as [`Command`]s on the same `mpsc` queue. That
//! serialization is what makes marking mutation race-free even though many
//! transition executors run concurrently.
//!
//! ## Firing protocol
//!
//! Tokens are *reserved* - removed from the visible marking - synchronously
//! before an executor task starts, and the outcome is applied back through
//! the mailbox when the task completes, in completion order:
//!
//! - `Success`: production applied, process state replaced, sequence number
//!   incremented, `TransitionFired` emitted, failure record cleared.
//! - `Failure`: reserved tokens restored (a failed firing reads as if it
//!   never started), `TransitionFailed` emitted, and the transition's
//!   exception policy decides what happens next: fatal, blocked, retry
//!   after a delay, or continue with a fallback output.
//!
//! After every applied success (and at initialization) the process runs
//! *automatic progression*: automated transitions are selected greedily in
//! ascending id order, each reserving its default token selection from the
//! remaining marking, and fired concurrently; the cycle repeats as results
//! are applied until no automated transition can be selected. When nothing
//! is in flight and no retry timer is pending, the instance is `Idle` and
//! an [`InstanceEvent::Idle`] marker is emitted.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{Color, InstanceEvent, Marking, NetTopology, StrategyTag, TransitionId};
use crate::{EngineError, Result};

use super::executor::{
    ExceptionStrategy, ExecutionOutcome, ExecutorRegistry, FiringContext, ProcessState,
};
use super::token_game::{consume, default_selection, TokenSelection};

/// Externally visible scheduling state of an instance.
///
/// `Fatal`-flagged transitions do not stop the instance; only themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    /// At least one firing is in flight or a retry is scheduled.
    Active,
    /// Fixed point reached; a new command may resume progress.
    Idle,
}

/// Failure bookkeeping for one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Consecutive failures since the last success.
    pub count: u32,
    pub last_reason: String,
    /// Strategy the most recent failure resolved to.
    pub strategy: StrategyTag,
    pub last_at: DateTime<Utc>,
}

/// Point-in-time copy of an instance's state, for inspection and tests.
#[derive(Debug, Clone)]
pub struct InstanceSnapshot<C: Color, S> {
    pub instance: Uuid,
    pub status: InstanceStatus,
    /// Sequence of the last applied firing (0 if none).
    pub sequence: u64,
    pub marking: Marking<C>,
    pub state: S,
    pub failures: HashMap<TransitionId, FailureRecord>,
    pub blocked: Vec<TransitionId>,
    pub fatal: Vec<TransitionId>,
    pub awaiting_retry: Vec<TransitionId>,
    pub breakpoints: Vec<TransitionId>,
    /// Automated transitions paused at a breakpoint.
    pub parked: Vec<TransitionId>,
    /// Transitions with an attempt currently in flight.
    pub in_flight: Vec<TransitionId>,
}

enum Command<C: Color, S: ProcessState> {
    Fire {
        transition: TransitionId,
        selection: Option<TokenSelection<C>>,
        reply: oneshot::Sender<Result<()>>,
    },
    Query {
        since: u64,
        reply: oneshot::Sender<Vec<InstanceEvent<C, S>>>,
    },
    Snapshot {
        reply: oneshot::Sender<InstanceSnapshot<C, S>>,
    },
    ClearFailure {
        transition: TransitionId,
        reply: oneshot::Sender<Result<()>>,
    },
    SetBreakpoint {
        transition: TransitionId,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveBreakpoint {
        transition: TransitionId,
        reply: oneshot::Sender<Result<()>>,
    },
    Step {
        reply: oneshot::Sender<Option<TransitionId>>,
    },
    Resume {
        reply: oneshot::Sender<()>,
    },
    Terminate,
    /// Internal: an executor task finished.
    AttemptFinished {
        attempt: Uuid,
        outcome: ExecutionOutcome<C, S>,
    },
    /// Internal: a retry delay elapsed.
    RetryDue { transition: TransitionId },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FireOrigin {
    Manual,
    Automatic,
}

struct InFlight<C: Color> {
    transition: TransitionId,
    /// Reserved tokens, restored verbatim on failure.
    consumed: TokenSelection<C>,
}

/// Entry point for running net instances.
///
/// Spawning is the `Initialize` operation: an instance cannot exist
/// without a starting marking and process state. Requires a tokio runtime.
pub struct InstanceProcess;

impl InstanceProcess {
    /// Validate the initial marking against the topology, start the
    /// instance task, run initial automatic progression, and return a
    /// handle to it.
    pub fn spawn<C: Color, S: ProcessState>(
        topology: Arc<NetTopology<C>>,
        registry: Arc<ExecutorRegistry<C, S>>,
        initial_marking: Marking<C>,
        initial_state: S,
    ) -> Result<InstanceHandle<C, S>> {
        for place in initial_marking.places_sorted() {
            if !topology.contains_place(place) {
                return Err(EngineError::UnknownPlace { place });
            }
        }

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(1024);
        let (status_tx, status_rx) = watch::channel(InstanceStatus::Active);

        let worker = Worker {
            id,
            topology,
            registry,
            marking: initial_marking,
            state: initial_state,
            sequence: 0,
            failures: HashMap::new(),
            blocked: BTreeSet::new(),
            fatal: BTreeSet::new(),
            awaiting_retry: BTreeSet::new(),
            breakpoints: BTreeSet::new(),
            parked: BTreeSet::new(),
            in_flight: HashMap::new(),
            log: Vec::new(),
            events: events_tx.clone(),
            status: status_tx,
            tx: tx.downgrade(),
        };

        tokio::spawn(worker.run(rx).instrument(info_span!("instance", %id)));

        Ok(InstanceHandle {
            id,
            tx,
            events: events_tx,
            status: status_rx,
        })
    }
}

/// Clonable handle to a running instance.
///
/// All command methods return [`EngineError::InstanceTerminated`] once the
/// instance's mailbox is closed. `fire` replies after validation and token
/// reservation, not after the executor completes; observe completion
/// through the event stream.
pub struct InstanceHandle<C: Color, S: ProcessState> {
    id: Uuid,
    tx: mpsc::Sender<Command<C, S>>,
    events: broadcast::Sender<InstanceEvent<C, S>>,
    status: watch::Receiver<InstanceStatus>,
}

impl<C: Color, S: ProcessState> Clone for InstanceHandle<C, S> {
    fn clone(&self) -> Self {
        InstanceHandle {
            id: self.id,
            tx: self.tx.clone(),
            events: self.events.clone(),
            status: self.status.clone(),
        }
    }
}

impl<C: Color, S: ProcessState> InstanceHandle<C, S> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command<C, S>,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| EngineError::InstanceTerminated)?;
        reply_rx.await.map_err(|_| EngineError::InstanceTerminated)
    }

    /// Fire a transition using the deterministic default token selection.
    pub async fn fire(&self, transition: TransitionId) -> Result<()> {
        self.request(|reply| Command::Fire {
            transition,
            selection: None,
            reply,
        })
        .await?
    }

    /// Fire a transition consuming an explicit token selection.
    pub async fn fire_with(
        &self,
        transition: TransitionId,
        selection: TokenSelection<C>,
    ) -> Result<()> {
        self.request(|reply| Command::Fire {
            transition,
            selection: Some(selection),
            reply,
        })
        .await?
    }

    /// Events recorded after sequence number `since` (0 for all).
    pub async fn query(&self, since: u64) -> Result<Vec<InstanceEvent<C, S>>> {
        self.request(|reply| Command::Query { since, reply }).await
    }

    /// Point-in-time copy of the instance state.
    pub async fn snapshot(&self) -> Result<InstanceSnapshot<C, S>> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Clear a blocked or fatally failed transition and re-run automatic
    /// progression.
    pub async fn clear_failure(&self, transition: TransitionId) -> Result<()> {
        self.request(|reply| Command::ClearFailure { transition, reply })
            .await?
    }

    /// Pause automatic progression before this transition fires.
    pub async fn set_breakpoint(&self, transition: TransitionId) -> Result<()> {
        self.request(|reply| Command::SetBreakpoint { transition, reply })
            .await?
    }

    pub async fn remove_breakpoint(&self, transition: TransitionId) -> Result<()> {
        self.request(|reply| Command::RemoveBreakpoint { transition, reply })
            .await?
    }

    /// Fire the lowest-id transition currently parked at a breakpoint.
    /// Returns `None` when nothing is parked.
    pub async fn step(&self) -> Result<Option<TransitionId>> {
        self.request(|reply| Command::Step { reply }).await
    }

    /// Release every parked transition; breakpoints stay armed.
    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Subscribe to the live event stream. Only events emitted after
    /// subscription are delivered; use [`Self::query`] for the backlog.
    pub fn subscribe(&self) -> broadcast::Receiver<InstanceEvent<C, S>> {
        self.events.subscribe()
    }

    /// The live event stream as a `futures` `Stream`.
    pub fn events(&self) -> BroadcastStream<InstanceEvent<C, S>> {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Watch the instance's Active/Idle status.
    pub fn status(&self) -> watch::Receiver<InstanceStatus> {
        self.status.clone()
    }

    /// Wait until the instance reaches a fixed point.
    pub async fn wait_until_idle(&self) -> Result<()> {
        let mut status = self.status.clone();
        loop {
            if *status.borrow_and_update() == InstanceStatus::Idle {
                return Ok(());
            }
            status
                .changed()
                .await
                .map_err(|_| EngineError::InstanceTerminated)?;
        }
    }

    /// Tear the instance down. Outstanding executor results are discarded.
    pub async fn terminate(&self) {
        let _ = self.tx.send(Command::Terminate).await;
    }
}

struct Worker<C: Color, S: ProcessState> {
    id: Uuid,
    topology: Arc<NetTopology<C>>,
    registry: Arc<ExecutorRegistry<C, S>>,
    marking: Marking<C>,
    state: S,
    sequence: u64,
    failures: HashMap<TransitionId, FailureRecord>,
    blocked: BTreeSet<TransitionId>,
    fatal: BTreeSet<TransitionId>,
    awaiting_retry: BTreeSet<TransitionId>,
    breakpoints: BTreeSet<TransitionId>,
    parked: BTreeSet<TransitionId>,
    in_flight: HashMap<Uuid, InFlight<C>>,
    /// Append-only backlog behind `query`. Grows for the life of the
    /// instance; truncation or compaction belongs to a persistence
    /// collaborator reading the event stream.
    log: Vec<InstanceEvent<C, S>>,
    events: broadcast::Sender<InstanceEvent<C, S>>,
    status: watch::Sender<InstanceStatus>,
    /// Weak so the mailbox closes when the last handle drops; executor
    /// tasks and retry timers hold strong clones while outstanding.
    tx: mpsc::WeakSender<Command<C, S>>,
}

impl<C: Color, S: ProcessState> Worker<C, S> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command<C, S>>) {
        self.progress();
        self.refresh_status();

        while let Some(command) = rx.recv().await {
            if matches!(command, Command::Terminate) {
                debug!("terminating");
                break;
            }
            self.handle(command);
            self.refresh_status();
        }
        debug!(sequence = self.sequence, "instance loop exited");
    }

    fn handle(&mut self, command: Command<C, S>) {
        match command {
            Command::Fire {
                transition,
                selection,
                reply,
            } => {
                let result = self.try_fire(transition, selection, FireOrigin::Manual);
                self.refresh_status();
                let _ = reply.send(result);
            }
            Command::Query { since, reply } => {
                let _ = reply.send(self.events_since(since));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::ClearFailure { transition, reply } => {
                let result = self.clear_failure(transition);
                self.refresh_status();
                let _ = reply.send(result);
            }
            Command::SetBreakpoint { transition, reply } => {
                let result = if self.topology.transition(transition).is_some() {
                    self.breakpoints.insert(transition);
                    Ok(())
                } else {
                    Err(EngineError::UnknownTransition { transition })
                };
                let _ = reply.send(result);
            }
            Command::RemoveBreakpoint { transition, reply } => {
                let result = if self.topology.transition(transition).is_some() {
                    self.breakpoints.remove(&transition);
                    if self.parked.remove(&transition) {
                        self.progress();
                    }
                    Ok(())
                } else {
                    Err(EngineError::UnknownTransition { transition })
                };
                self.refresh_status();
                let _ = reply.send(result);
            }
            Command::Step { reply } => {
                let stepped = self.step();
                self.refresh_status();
                let _ = reply.send(stepped);
            }
            Command::Resume { reply } => {
                let parked: Vec<TransitionId> = std::mem::take(&mut self.parked).into_iter().collect();
                for transition in parked {
                    if let Err(error) = self.try_fire(transition, None, FireOrigin::Automatic) {
                        debug!(%transition, %error, "parked transition no longer fireable");
                    }
                }
                self.refresh_status();
                let _ = reply.send(());
            }
            Command::Terminate => {}
            Command::AttemptFinished { attempt, outcome } => {
                self.attempt_finished(attempt, outcome);
            }
            Command::RetryDue { transition } => {
                self.retry_due(transition);
            }
        }
    }

    /// Validate, reserve tokens, and start one executor attempt.
    fn try_fire(
        &mut self,
        transition: TransitionId,
        selection: Option<TokenSelection<C>>,
        origin: FireOrigin,
    ) -> Result<()> {
        if self.topology.transition(transition).is_none() {
            return Err(EngineError::UnknownTransition { transition });
        }
        let Some(binding) = self.registry.get(transition).cloned() else {
            return Err(EngineError::UnknownTransition { transition });
        };
        // Fatal exclusion applies to every origin; Block only suppresses
        // automatic evaluation, an explicit fire is an operator decision.
        if self.fatal.contains(&transition) {
            return Err(EngineError::TransitionNotEnabled { transition });
        }
        if origin == FireOrigin::Automatic && self.blocked.contains(&transition) {
            return Err(EngineError::TransitionNotEnabled { transition });
        }

        let selection = match selection {
            Some(selection) => selection,
            None => default_selection(&self.topology, &self.marking, transition)
                .ok_or(EngineError::TransitionNotEnabled { transition })?,
        };
        let after = consume(&self.topology, &self.marking, transition, &selection)?;

        let Some(tx) = self.tx.upgrade() else {
            // Last handle already dropped; the instance is tearing down.
            return Err(EngineError::InstanceTerminated);
        };

        // Reservation: from here the tokens are invisible until the
        // outcome is applied.
        self.marking = after;

        let attempt = Uuid::new_v4();
        let attempt_no = self.failures.get(&transition).map_or(0, |f| f.count) + 1;
        self.in_flight.insert(
            attempt,
            InFlight {
                transition,
                consumed: selection.clone(),
            },
        );

        let firing = FiringContext {
            instance: self.id,
            transition,
            consumed: selection,
            state: self.state.clone(),
            attempt: attempt_no,
        };
        let executor = Arc::clone(&binding.executor);
        debug!(%transition, attempt = attempt_no, "attempt started");
        tokio::spawn(async move {
            let outcome = executor.execute(firing).await;
            let _ = tx.send(Command::AttemptFinished { attempt, outcome }).await;
        });
        Ok(())
    }

    fn attempt_finished(&mut self, attempt: Uuid, outcome: ExecutionOutcome<C, S>) {
        let Some(flight) = self.in_flight.remove(&attempt) else {
            // Attempt from a previous life of the mailbox; nothing to apply.
            return;
        };
        match outcome {
            ExecutionOutcome::Success {
                produced,
                new_state,
            } => match self.check_production(flight.transition, &produced) {
                Ok(()) => {
                    self.apply_firing(flight.transition, flight.consumed, produced, new_state);
                }
                Err(reason) => self.apply_failure(flight, reason),
            },
            ExecutionOutcome::Failure { reason } => {
                self.apply_failure(flight, reason);
            }
        }
        self.progress();
    }

    /// Production may only land on the transition's output places; an
    /// executor cannot widen the net from inside its own attempt.
    fn check_production(
        &self,
        transition: TransitionId,
        produced: &Marking<C>,
    ) -> std::result::Result<(), String> {
        for place in produced.places_sorted() {
            if !self.topology.output_places(transition).any(|p| p == place) {
                return Err(format!(
                    "produced tokens at {place}, which is not an output place of {transition}"
                ));
            }
        }
        Ok(())
    }

    /// Apply a successful firing: production, state, sequence, event.
    fn apply_firing(
        &mut self,
        transition: TransitionId,
        consumed: TokenSelection<C>,
        produced: Marking<C>,
        new_state: S,
    ) {
        self.marking.merge(&produced);
        self.state = new_state;
        self.sequence += 1;
        self.failures.remove(&transition);
        debug!(%transition, sequence = self.sequence, "transition fired");
        self.emit(InstanceEvent::TransitionFired {
            instance: self.id,
            transition,
            consumed,
            produced,
            resulting_state: self.state.clone(),
            sequence: self.sequence,
            timestamp: Utc::now(),
        });
    }

    fn apply_failure(&mut self, flight: InFlight<C>, reason: String) {
        let transition = flight.transition;
        let count = self.failures.get(&transition).map_or(0, |f| f.count) + 1;
        let strategy = match self.registry.get(transition) {
            Some(binding) => binding.policy.resolve(transition, &reason, count),
            None => ExceptionStrategy::Fatal,
        };
        // A fallback output is production like any other; a policy that
        // tries to place tokens off the output arcs is misconfigured and
        // escalates to fatal.
        let strategy = match strategy {
            ExceptionStrategy::Continue { produced } => {
                match self.check_production(transition, &produced) {
                    Ok(()) => ExceptionStrategy::Continue { produced },
                    Err(detail) => {
                        warn!(%transition, %detail, "fallback output rejected");
                        ExceptionStrategy::Fatal
                    }
                }
            }
            other => other,
        };
        let tag = strategy.tag();
        self.failures.insert(
            transition,
            FailureRecord {
                count,
                last_reason: reason.clone(),
                strategy: tag,
                last_at: Utc::now(),
            },
        );
        warn!(%transition, failure_count = count, strategy = ?tag, %reason, "attempt failed");
        self.emit(InstanceEvent::TransitionFailed {
            instance: self.id,
            transition,
            consumed: flight.consumed.clone(),
            reason,
            failure_count: count,
            strategy: tag,
            timestamp: Utc::now(),
        });

        match strategy {
            ExceptionStrategy::Fatal => {
                self.marking.merge(&flight.consumed);
                self.fatal.insert(transition);
            }
            ExceptionStrategy::Block => {
                self.marking.merge(&flight.consumed);
                self.blocked.insert(transition);
            }
            ExceptionStrategy::RetryWithDelay(delay) => {
                self.marking.merge(&flight.consumed);
                self.awaiting_retry.insert(transition);
                if let Some(tx) = self.tx.upgrade() {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Command::RetryDue { transition }).await;
                    });
                }
            }
            ExceptionStrategy::Continue { produced } => {
                // Treated as a success with the fallback output: the
                // reserved tokens stay consumed, the state is unchanged.
                self.marking.merge(&produced);
                self.sequence += 1;
                self.emit(InstanceEvent::TransitionFired {
                    instance: self.id,
                    transition,
                    consumed: flight.consumed,
                    produced,
                    resulting_state: self.state.clone(),
                    sequence: self.sequence,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn retry_due(&mut self, transition: TransitionId) {
        if !self.awaiting_retry.remove(&transition) {
            // Stale or duplicate timer.
            return;
        }
        if self.blocked.contains(&transition) || self.fatal.contains(&transition) {
            return;
        }
        // Re-check enabledness against the current marking; tokens may
        // have been consumed by another transition in the meantime.
        match self.try_fire(transition, None, FireOrigin::Automatic) {
            Ok(()) => debug!(%transition, "retry attempt started"),
            Err(error) => debug!(%transition, %error, "retry skipped"),
        }
    }

    /// Greedy automatic progression: ascending transition id, reserving
    /// default selections from the remaining marking as it goes.
    fn progress(&mut self) {
        let automated: Vec<TransitionId> = self.topology.automated_transitions().collect();
        for transition in automated {
            if self.in_flight.values().any(|f| f.transition == transition) {
                continue;
            }
            if self.blocked.contains(&transition)
                || self.fatal.contains(&transition)
                || self.awaiting_retry.contains(&transition)
            {
                continue;
            }
            if !self.registry.is_bound(transition) {
                continue;
            }
            let Some(selection) = default_selection(&self.topology, &self.marking, transition)
            else {
                continue;
            };
            if self.breakpoints.contains(&transition) {
                if self.parked.insert(transition) {
                    debug!(%transition, "paused at breakpoint");
                }
                continue;
            }
            if let Err(error) = self.try_fire(transition, Some(selection), FireOrigin::Automatic) {
                debug!(%transition, %error, "automatic firing skipped");
            }
        }
    }

    fn step(&mut self) -> Option<TransitionId> {
        let transition = self.parked.iter().next().copied()?;
        self.parked.remove(&transition);
        match self.try_fire(transition, None, FireOrigin::Automatic) {
            Ok(()) => Some(transition),
            Err(error) => {
                debug!(%transition, %error, "stepped transition no longer fireable");
                None
            }
        }
    }

    fn clear_failure(&mut self, transition: TransitionId) -> Result<()> {
        if self.topology.transition(transition).is_none() {
            return Err(EngineError::UnknownTransition { transition });
        }
        self.blocked.remove(&transition);
        self.fatal.remove(&transition);
        self.failures.remove(&transition);
        self.progress();
        Ok(())
    }

    /// Events recorded after sequence `since`. Failure and idle markers
    /// ride along with the position they were logged at.
    fn events_since(&self, since: u64) -> Vec<InstanceEvent<C, S>> {
        if since == 0 {
            return self.log.clone();
        }
        if since > self.sequence {
            return Vec::new();
        }
        let cut = self
            .log
            .iter()
            .position(|event| event.sequence() == Some(since))
            .map_or(0, |i| i + 1);
        self.log[cut..].to_vec()
    }

    fn snapshot(&self) -> InstanceSnapshot<C, S> {
        let mut in_flight: Vec<TransitionId> =
            self.in_flight.values().map(|f| f.transition).collect();
        in_flight.sort();
        InstanceSnapshot {
            instance: self.id,
            status: *self.status.borrow(),
            sequence: self.sequence,
            marking: self.marking.clone(),
            state: self.state.clone(),
            failures: self.failures.clone(),
            blocked: self.blocked.iter().copied().collect(),
            fatal: self.fatal.iter().copied().collect(),
            awaiting_retry: self.awaiting_retry.iter().copied().collect(),
            breakpoints: self.breakpoints.iter().copied().collect(),
            parked: self.parked.iter().copied().collect(),
            in_flight,
        }
    }

    fn emit(&mut self, event: InstanceEvent<C, S>) {
        self.log.push(event.clone());
        // No subscribers is fine; the log keeps the record.
        let _ = self.events.send(event);
    }

    fn refresh_status(&mut self) {
        let idle = self.in_flight.is_empty() && self.awaiting_retry.is_empty();
        let current = *self.status.borrow();
        if idle && current != InstanceStatus::Idle {
            self.status.send_replace(InstanceStatus::Idle);
            // The marker closes a run of recorded events; an instance that
            // idles at spawn with nothing ever applied logs nothing, and
            // its status watch alone reports the idleness.
            if !self.log.is_empty() {
                self.emit(InstanceEvent::Idle {
                    instance: self.id,
                    sequence: self.sequence,
                    timestamp: Utc::now(),
                });
            }
        } else if !idle && current != InstanceStatus::Active {
            self.status.send_replace(InstanceStatus::Active);
        }
    }
}
