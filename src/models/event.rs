// Instance lifecycle events

//! # Instance Events
//!
//! Events are the only externally observable record of state change. The
//! instance process owns its state exclusively; adapters (blocking
//! iterators, reactive streams, persistence writers) observe the event
//! stream instead of reaching into the marking.
//!
//! Ordering guarantee: `TransitionFired` sequence numbers increase strictly
//! and events are delivered in non-decreasing sequence order per instance.
//! Failures carry no sequence number of their own - nothing was applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::marking::Marking;
use super::net::TransitionId;
use super::token::Color;

/// Reporting mirror of the exception strategy a failure resolved to.
///
/// The full strategy ([`crate::ExceptionStrategy`]) can carry fallback
/// tokens; events only record which branch was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyTag {
    /// Transition permanently excluded from the enabled set until cleared.
    Fatal,
    /// Transition excluded from automatic evaluation until unblocked.
    Block,
    /// A re-attempt was scheduled.
    Retry,
    /// The fallback output was applied as a success.
    Continue,
}

/// Observable record of a state change within one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstanceEvent<C: Color, S> {
    /// A transition fired: consumption and production were both applied.
    TransitionFired {
        instance: Uuid,
        transition: TransitionId,
        /// Exact tokens removed from the input places.
        consumed: Marking<C>,
        /// Tokens added to the output places.
        produced: Marking<C>,
        /// Process state after the firing was applied.
        resulting_state: S,
        /// Strictly increasing per instance, starting at 1.
        sequence: u64,
        timestamp: DateTime<Utc>,
    },

    /// A transition's logic failed; the marking reads as if the firing
    /// never started.
    TransitionFailed {
        instance: Uuid,
        transition: TransitionId,
        /// Tokens that had been reserved for the attempt (since restored).
        consumed: Marking<C>,
        reason: String,
        /// Consecutive failures of this transition, including this one.
        failure_count: u32,
        /// Which exception strategy the failure resolved to.
        strategy: StrategyTag,
        timestamp: DateTime<Utc>,
    },

    /// The instance reached a fixed point: nothing in flight, no retry
    /// pending, no automated transition enabled. Emitted once per
    /// transition into idleness, closing a run of recorded events; an
    /// instance that idles at spawn with an empty log emits no marker.
    /// A new command may resume progress.
    Idle {
        instance: Uuid,
        /// Sequence of the last applied firing (0 if none).
        sequence: u64,
        timestamp: DateTime<Utc>,
    },
}

impl<C: Color, S> InstanceEvent<C, S> {
    /// The transition this event concerns, if any.
    pub fn transition(&self) -> Option<TransitionId> {
        match self {
            InstanceEvent::TransitionFired { transition, .. }
            | InstanceEvent::TransitionFailed { transition, .. } => Some(*transition),
            InstanceEvent::Idle { .. } => None,
        }
    }

    /// The sequence number assigned by this event, if it applied a firing.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            InstanceEvent::TransitionFired { sequence, .. } => Some(*sequence),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InstanceEvent::Idle { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, InstanceEvent::TransitionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::net::PlaceId;

    #[test]
    fn event_accessors() {
        let instance = Uuid::new_v4();
        let mut consumed = Marking::new();
        consumed.add_token(PlaceId(1), "x".to_string());

        let fired: InstanceEvent<String, ()> = InstanceEvent::TransitionFired {
            instance,
            transition: TransitionId(1),
            consumed: consumed.clone(),
            produced: Marking::new(),
            resulting_state: (),
            sequence: 1,
            timestamp: Utc::now(),
        };
        assert_eq!(fired.transition(), Some(TransitionId(1)));
        assert_eq!(fired.sequence(), Some(1));
        assert!(!fired.is_idle());

        let failed: InstanceEvent<String, ()> = InstanceEvent::TransitionFailed {
            instance,
            transition: TransitionId(2),
            consumed,
            reason: "boom".into(),
            failure_count: 1,
            strategy: StrategyTag::Retry,
            timestamp: Utc::now(),
        };
        assert_eq!(failed.transition(), Some(TransitionId(2)));
        assert_eq!(failed.sequence(), None);
        assert!(failed.is_failure());

        let idle: InstanceEvent<String, ()> = InstanceEvent::Idle {
            instance,
            sequence: 1,
            timestamp: Utc::now(),
        };
        assert!(idle.is_idle());
        assert_eq!(idle.transition(), None);
    }

    #[test]
    fn events_serialize_for_external_adapters() {
        let event: InstanceEvent<String, u32> = InstanceEvent::Idle {
            instance: Uuid::nil(),
            sequence: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"Idle\""));
        assert!(json.contains("\"sequence\":3"));
    }
}
