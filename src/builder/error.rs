//! Definition errors reported when a blueprint is constructed.

use thiserror::Error;

/// A single problem found in a machine definition.
///
/// Construction reports every violation at once, not just the first.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionError {
    #[error("state '{state}' is declared more than once")]
    DuplicateState { state: String },

    #[error("initial state '{state}' is not declared")]
    UndeclaredInitialState { state: String },

    #[error("transition from '{from}' targets undeclared state '{target}'")]
    UndeclaredState { from: String, target: String },

    #[error("guard '{name}' used in '{location}' is not registered")]
    UnknownGuard { name: String, location: String },

    #[error("action '{name}' used in '{location}' is not registered")]
    UnknownAction { name: String, location: String },

    #[error("effect '{name}' invoked by state '{state}' is not registered")]
    UnknownEffect { name: String, state: String },

    #[error("max_automatic_steps must be at least 1")]
    ZeroAutomaticStepLimit,
}
