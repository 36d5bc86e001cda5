//! State transition history tracking.
//!
//! The controller runs indefinitely, so history is a bounded window over the
//! most recent transitions rather than a complete log.

use super::machine::TransitionCause;
use super::state::IntersectionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Number of transitions kept by [`StateHistory::default`]; two full cycles.
pub const DEFAULT_HISTORY_CAPACITY: usize = 12;

/// Record of a single state transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being left
    pub from: IntersectionState,
    /// The state being entered
    pub to: IntersectionState,
    /// The guard that fired
    pub cause: TransitionCause,
    /// Time spent in `from`
    pub dwell: Duration,
    /// Wall-clock time of the transition, for operators reading logs
    pub timestamp: DateTime<Utc>,
}

/// Most recent transitions, oldest first.
///
/// # Example
///
/// ```rust
/// use crossing::core::{IntersectionState, StateHistory, StateTransition, TransitionCause};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let mut history = StateHistory::with_capacity(4);
/// history.record(StateTransition {
///     from: IntersectionState::MainGreen,
///     to: IntersectionState::MainYellow,
///     cause: TransitionCause::ServiceRequested,
///     dwell: Duration::from_secs(5),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(
///     history.get_path(),
///     vec![IntersectionState::MainGreen, IntersectionState::MainYellow]
/// );
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    capacity: usize,
    transitions: VecDeque<StateTransition>,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl StateHistory {
    /// Create an empty history keeping at most `capacity` transitions.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            transitions: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a transition, evicting the oldest one when full.
    ///
    /// A history deserialized with a zero capacity or an overfull window is
    /// trimmed back to its bound here.
    pub fn record(&mut self, transition: StateTransition) {
        let capacity = self.capacity.max(1);
        while self.transitions.len() >= capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Get the path of states traversed within the window.
    ///
    /// Returns the `from` state of the oldest retained transition followed by
    /// the `to` state of each transition.
    pub fn get_path(&self) -> Vec<IntersectionState> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Wall-clock span between the oldest and newest retained transitions.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.transitions.front()?;
        let last = self.transitions.back()?;
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Most recent transition, if any.
    pub fn last(&self) -> Option<&StateTransition> {
        self.transitions.back()
    }

    /// Retained transitions, oldest first.
    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &StateTransition> + '_ {
        self.transitions.iter()
    }

    /// Number of retained transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if no transition has been recorded.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
