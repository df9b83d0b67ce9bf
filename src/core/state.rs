//! State identifiers.
//!
//! A machine's states are the variants of a Rust enum. The interpreter only
//! ever holds one of them, so "current state is a member of the declared
//! state set" is enforced by the type system plus definition validation.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for state identifiers.
///
/// All methods are pure. The `name` is the key the transition table is
/// indexed by, so distinct variants must return distinct names.
///
/// # Example
///
/// ```rust
/// use widget_machines::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum BookingState {
///     Editing,
///     Submitted,
/// }
///
/// impl State for BookingState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Editing => "editing",
///             Self::Submitted => "submitted",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Submitted)
///     }
/// }
///
/// assert_eq!(BookingState::Editing.name(), "editing");
/// assert!(BookingState::Submitted.is_final());
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's name for table lookup and logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// A final state accepts no events. An interpreter that settles in a
    /// final state is done.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Running,
        Paused,
        Finished,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Running => "running",
                Self::Paused => "paused",
                Self::Finished => "finished",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Finished)
        }
    }

    #[test]
    fn state_name_returns_correct_value() {
        assert_eq!(TestState::Running.name(), "running");
        assert_eq!(TestState::Paused.name(), "paused");
        assert_eq!(TestState::Finished.name(), "finished");
    }

    #[test]
    fn is_final_identifies_terminal_states() {
        assert!(!TestState::Running.is_final());
        assert!(!TestState::Paused.is_final());
        assert!(TestState::Finished.is_final());
    }

    #[test]
    fn state_serializes_correctly() {
        let state = TestState::Paused;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
