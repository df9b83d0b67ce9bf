//! State-scoped effects.
//!
//! An effect is started when its state is entered and torn down when the
//! state is left, before the next state's effect starts. At most one
//! effect is live per interpreter.
//!
//! # Key Concepts
//!
//! - **Start function**: receives the context and an [`Injector`], returns a [`Teardown`]
//! - **Injector**: feeds events back through the interpreter's normal step
//! - **Cancellation**: teardown cancels the injector's token first, so a
//!   cancelled effect never delivers another event

mod effect;
mod interval;
pub(crate) mod manager;

pub(crate) use effect::Dispatch;
pub use effect::{Delivery, EffectFn, Injector, Teardown};
pub use interval::{interval, seconds};
