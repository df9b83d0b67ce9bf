//! Declarative machine definitions.
//!
//! A definition is plain data: states, the events each state accepts,
//! automatic transitions, effect bindings and the initial state/context.
//! Guards, actions and effects are referenced by name and resolved against
//! a [`Registry`](crate::builder::Registry) when the blueprint is created.
//!
//! Definitions can be written with the fluent builders below or loaded
//! from JSON:
//!
//! ```json
//! {
//!   "id": "counter",
//!   "initial": "Active",
//!   "context": { "count": 0 },
//!   "states": [
//!     {
//!       "state": "Active",
//!       "on": {
//!         "INCREMENT": [{ "actions": ["increaseCounter"] }],
//!         "DECREASE": [{ "guard": "isGreaterThanZero", "actions": ["decreaseCounter"] }]
//!       }
//!     }
//!   ]
//! }
//! ```

use crate::core::State;
use crate::error::MachineError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on automatic transitions taken in one step.
pub const DEFAULT_MAX_AUTOMATIC_STEPS: usize = 64;

/// State changes an interpreter keeps in its history.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

fn default_max_automatic_steps() -> usize {
    DEFAULT_MAX_AUTOMATIC_STEPS
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// One candidate transition.
///
/// Without a `target` the transition is internal: actions may change the
/// context, the state (and its effect) stays as is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned"))]
pub struct TransitionDef<S> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<S>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

impl<S> TransitionDef<S> {
    /// A transition that stays in the current state.
    pub fn internal() -> Self {
        Self {
            target: None,
            guard: None,
            actions: Vec::new(),
        }
    }

    /// A transition that enters `target`.
    pub fn to(target: S) -> Self {
        Self {
            target: Some(target),
            guard: None,
            actions: Vec::new(),
        }
    }

    /// Gate the transition with a registered guard.
    pub fn guard(mut self, name: impl Into<String>) -> Self {
        self.guard = Some(name.into());
        self
    }

    /// Append a registered action.
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.actions.push(name.into());
        self
    }
}

/// Transition table for one state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned"))]
pub struct StateNode<S> {
    pub state: S,

    /// Event kind -> candidates, tried in order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, Vec<TransitionDef<S>>>,

    /// Automatic transitions, tried in order after every step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub always: Vec<TransitionDef<S>>,

    /// Registered effect running while the state is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke: Option<String>,
}

impl<S> StateNode<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            on: BTreeMap::new(),
            always: Vec::new(),
            invoke: None,
        }
    }

    /// Add a candidate for `event`. Repeated calls add lower-priority
    /// candidates.
    pub fn on(mut self, event: impl Into<String>, transition: TransitionDef<S>) -> Self {
        self.on.entry(event.into()).or_default().push(transition);
        self
    }

    pub fn always(mut self, transition: TransitionDef<S>) -> Self {
        self.always.push(transition);
        self
    }

    pub fn invoke(mut self, effect: impl Into<String>) -> Self {
        self.invoke = Some(effect.into());
        self
    }
}

/// Complete description of a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned, C: DeserializeOwned"))]
pub struct MachineDefinition<S, C> {
    pub id: String,

    pub initial: S,

    pub context: C,

    pub states: Vec<StateNode<S>>,

    /// Transitions accepted in every non-final state, consulted after the
    /// current state's own candidates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, Vec<TransitionDef<S>>>,

    #[serde(default = "default_max_automatic_steps")]
    pub max_automatic_steps: usize,

    /// Most recent state changes kept per interpreter. Zero disables
    /// history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl<S: State, C> MachineDefinition<S, C> {
    pub fn new(id: impl Into<String>, initial: S, context: C) -> Self {
        Self {
            id: id.into(),
            initial,
            context,
            states: Vec::new(),
            on: BTreeMap::new(),
            max_automatic_steps: DEFAULT_MAX_AUTOMATIC_STEPS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn state(mut self, node: StateNode<S>) -> Self {
        self.states.push(node);
        self
    }

    /// Add a machine-wide candidate for `event`.
    pub fn on(mut self, event: impl Into<String>, transition: TransitionDef<S>) -> Self {
        self.on.entry(event.into()).or_default().push(transition);
        self
    }

    pub fn max_automatic_steps(mut self, limit: usize) -> Self {
        self.max_automatic_steps = limit;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Find the node declared for `state`.
    pub fn node(&self, state: &S) -> Option<&StateNode<S>> {
        self.states.iter().find(|n| n.state.name() == state.name())
    }
}

impl<S, C> MachineDefinition<S, C>
where
    S: State,
    C: DeserializeOwned,
{
    /// Parse a definition from JSON text.
    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<S, C> MachineDefinition<S, C>
where
    S: State,
    C: Serialize,
{
    pub fn to_json(&self) -> Result<serde_json::Value, MachineError> {
        Ok(serde_json::to_value(self)?)
    }
}
