//! Machine definitions and the registry of named implementations.
//!
//! A definition describes *what* a machine does in terms of names; the
//! registry supplies the closures behind those names. Both are consumed by
//! [`create_machine`](crate::machine::create_machine), which validates
//! them together and fails before any event is processed.

pub mod definition;
pub mod error;
pub mod macros;
pub mod registry;

pub use definition::{
    MachineDefinition, StateNode, TransitionDef, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_AUTOMATIC_STEPS,
};
pub use error::DefinitionError;
pub use registry::Registry;
