//! Errors surfaced by machine construction and interpretation.

use crate::builder::DefinitionError;
use thiserror::Error;

/// Errors returned by blueprint construction, `send` and dry runs.
///
/// An event the current state does not accept is not an error; it is a
/// no-op.
#[derive(Debug, Error)]
pub enum MachineError {
    /// The definition references unknown names or undeclared states.
    #[error("invalid machine definition: {}", join(.0))]
    InvalidDefinition(Vec<DefinitionError>),

    /// Automatic transitions kept firing past the configured bound.
    #[error("automatic transitions from state '{state}' did not settle within {limit} steps")]
    AutomaticTransitionLimit { state: String, limit: usize },

    /// `send` was called while a step of the same interpreter was running
    /// on this thread.
    #[error("re-entrant send of event '{event}' during an in-progress step")]
    ReentrantSend { event: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MachineError {
    /// Returns true for errors caused by the machine's configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MachineError::InvalidDefinition(_)
                | MachineError::AutomaticTransitionLimit { .. }
                | MachineError::Json(_)
        )
    }

    /// The definition violations, if this is a construction error.
    pub fn violations(&self) -> &[DefinitionError] {
        match self {
            MachineError::InvalidDefinition(violations) => violations,
            _ => &[],
        }
    }
}

fn join(violations: &[DefinitionError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
