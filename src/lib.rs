//! Widget Machines: declarative state machines for interactive widgets
//!
//! A machine is described as data: states, per-state event candidates,
//! automatic transitions and state-scoped effects, all referring to guards,
//! actions and effects by name. A [`Registry`] supplies the closures behind
//! those names and [`create_machine`] validates both together before any
//! event is processed.
//!
//! # Core Concepts
//!
//! - **State**: enum identifiers via the `State` trait (see [`state_enum!`])
//! - **Guards**: predicates deciding whether a candidate transition fires
//! - **Actions**: context updates applied to a working copy of the context
//! - **Effects**: started on entering a state, torn down on leaving it
//! - **Interpreter**: one running instance; `send` commits, `transition`
//!   answers "what would happen" without committing
//!
//! # Example
//!
//! ```rust
//! use widget_machines::builder::{MachineDefinition, Registry, StateNode, TransitionDef};
//! use widget_machines::core::Event;
//! use widget_machines::{create_machine, interpret, state_enum};
//!
//! state_enum! {
//!     enum Light {
//!         Off,
//!         On,
//!     }
//! }
//!
//! #[derive(Clone, Debug)]
//! struct Toggle;
//!
//! impl Event for Toggle {
//!     fn kind(&self) -> &str {
//!         "TOGGLE"
//!     }
//! }
//!
//! #[derive(Clone, PartialEq, Debug, Default)]
//! struct Switches {
//!     flips: u32,
//! }
//!
//! let definition = MachineDefinition::new("light", Light::Off, Switches::default())
//!     .state(StateNode::new(Light::Off).on("TOGGLE", TransitionDef::to(Light::On).action("flip")))
//!     .state(StateNode::new(Light::On).on("TOGGLE", TransitionDef::to(Light::Off).action("flip")));
//! let registry = Registry::<Switches, Toggle>::new().action("flip", |ctx, _| ctx.flips += 1);
//!
//! let light = interpret(create_machine(definition, registry)?)?;
//! let snapshot = light.send(Toggle)?;
//!
//! assert_eq!(snapshot.state, Light::On);
//! assert_eq!(snapshot.context.flips, 1);
//! # Ok::<(), widget_machines::MachineError>(())
//! ```

pub mod builder;
pub mod core;
pub mod effects;
pub mod error;
pub mod interpreter;
pub mod machine;
pub mod widgets;

// Re-export commonly used types
pub use crate::builder::{MachineDefinition, Registry, StateNode, TransitionDef};
pub use crate::core::{Event, Guard, Snapshot, State, StateHistory, StateTransition, TransitionOutcome};
pub use crate::error::MachineError;
pub use crate::interpreter::{interpret, Interpreter, InterpreterStatus, Subscription};
pub use crate::machine::{create_machine, MachineBlueprint};
