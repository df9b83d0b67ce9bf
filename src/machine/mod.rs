//! Transition tables and the pure step function.
//!
//! [`create_machine`] turns a [`MachineDefinition`](crate::builder::MachineDefinition)
//! and a [`Registry`](crate::builder::Registry) into a shared
//! [`MachineBlueprint`]. The blueprint answers "what would this event do"
//! for any snapshot; interpreters commit those answers.

mod blueprint;

pub(crate) use blueprint::Resolution;
pub use blueprint::{create_machine, MachineBlueprint};
