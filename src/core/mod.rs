//! Core machine types.
//!
//! This module contains the pure vocabulary every machine is written in:
//! - State identifiers via the `State` trait
//! - Events via the `Event` trait, context data via `Context`
//! - Guard predicates and context-update actions
//! - Snapshots, dry-run outcomes and state change history
//!
//! Nothing in this module performs side effects.

mod action;
mod event;
mod guard;
mod history;
mod snapshot;
mod state;

pub use action::Action;
pub use event::{Context, Event};
pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use snapshot::{Snapshot, TransitionOutcome};
pub use state::State;
