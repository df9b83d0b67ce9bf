//! State change history.
//!
//! Records every state change an interpreter commits, including the ones
//! taken while draining automatic transitions.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state change.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being left
    pub from: S,
    /// The state being entered
    pub to: S,
    /// Kind of the event that triggered the step; `None` for the initial
    /// drain of a fresh interpreter
    pub event: Option<String>,
    /// When the change was committed
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of state changes.
///
/// `record` consumes the history and appends in place. A history built
/// with [`StateHistory::with_limit`] keeps only the most recent changes.
///
/// # Example
///
/// ```rust
/// use widget_machines::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Clock {
///     Running,
///     Paused,
/// }
///
/// impl State for Clock {
///     fn name(&self) -> &str {
///         match self {
///             Self::Running => "running",
///             Self::Paused => "paused",
///         }
///     }
/// }
///
/// let history = StateHistory::new().record(StateTransition {
///     from: Clock::Running,
///     to: Clock::Paused,
///     event: Some("TICK".into()),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path(), vec![&Clock::Running, &Clock::Paused]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// An unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            limit: None,
        }
    }

    /// A history keeping at most `limit` changes, dropping the oldest.
    /// A zero limit records nothing.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(limit.min(64)),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Append a state change.
    pub fn record(mut self, transition: StateTransition<S>) -> Self {
        match self.limit {
            Some(0) => return self,
            Some(limit) if self.transitions.len() >= limit => {
                let excess = self.transitions.len() + 1 - limit;
                self.transitions.drain(..excess);
            }
            _ => {}
        }
        self.transitions.push(transition);
        self
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` of the first change followed by the `to` of
    /// every change, in order.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and the last recorded change.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
