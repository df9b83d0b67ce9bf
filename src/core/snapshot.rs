//! Immutable views of a machine's (state, context) pair.

use super::state::State;
use serde::{Deserialize, Serialize};

/// The (state, context) pair of a machine at one point in time.
///
/// Snapshots are handed out by value; holding one never aliases the
/// interpreter's own data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<S, C> {
    pub state: S,
    pub context: C,
}

impl<S: State, C> Snapshot<S, C> {
    pub fn new(state: S, context: C) -> Self {
        Self { state, context }
    }

    /// Check whether the snapshot is in the given state.
    pub fn matches(&self, state: &S) -> bool {
        self.state == *state
    }

    pub fn is_final(&self) -> bool {
        self.state.is_final()
    }

    /// Render the snapshot for display (`{"state": .., "context": ..}`).
    pub fn to_json(&self) -> serde_json::Value
    where
        C: Serialize,
    {
        serde_json::json!({
            "state": self.state.name(),
            "context": serde_json::to_value(&self.context).unwrap_or(serde_json::Value::Null),
        })
    }
}

/// Result of a dry-run transition.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome<S, C> {
    /// State the machine would settle in.
    pub state: S,
    /// Context the machine would hold.
    pub context: C,
    /// True iff state or context differ from the input snapshot.
    pub changed: bool,
}

impl<S, C> TransitionOutcome<S, C> {
    pub fn into_snapshot(self) -> Snapshot<S, C> {
        Snapshot {
            state: self.state,
            context: self.context,
        }
    }
}
