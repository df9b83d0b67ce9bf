//! Effect start functions, teardowns and the event injector.

use crate::core::Event;
use crate::error::MachineError;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Starts an effect for a freshly entered state.
///
/// Receives the settled context and an injector bound to the owning
/// interpreter, and returns the teardown to run when the state is left.
pub type EffectFn<C, E> = Arc<dyn Fn(&C, Injector<E>) -> Teardown + Send + Sync>;

/// Cleanup returned by an effect's start function.
///
/// The interpreter runs it exactly once, when the state that started the
/// effect is left or the interpreter stops.
pub struct Teardown(Option<Box<dyn FnOnce() + Send>>);

impl Teardown {
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Some(Box::new(cleanup)))
    }

    /// A teardown with nothing to clean up.
    pub fn noop() -> Self {
        Self(None)
    }

    pub(crate) fn run(mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup();
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Teardown").field(&self.0.is_some()).finish()
    }
}

/// Outcome of injecting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event went through the interpreter's normal step.
    Delivered,
    /// The effect was torn down (or its interpreter dropped); the event
    /// was discarded.
    Cancelled,
}

/// Receives injected events on behalf of an interpreter.
pub(crate) trait Dispatch<E>: Send + Sync {
    fn dispatch(&self, event: E, token: &CancellationToken) -> Result<Delivery, MachineError>;
}

/// Sends events from a running effect back into its interpreter.
///
/// `send` goes through the same step as [`Interpreter::send`]; the event
/// is evaluated against whatever state is current when it arrives. Once
/// the effect is torn down every further `send` returns
/// [`Delivery::Cancelled`].
///
/// Effects must inject from another task or thread. Injecting
/// synchronously from inside the start function is a re-entrant send and
/// is rejected.
///
/// [`Interpreter::send`]: crate::interpreter::Interpreter::send
pub struct Injector<E> {
    target: Weak<dyn Dispatch<E>>,
    token: CancellationToken,
}

impl<E: Event> Injector<E> {
    pub(crate) fn new(target: Weak<dyn Dispatch<E>>, token: CancellationToken) -> Self {
        Self { target, token }
    }

    pub fn send(&self, event: E) -> Result<Delivery, MachineError> {
        if self.token.is_cancelled() {
            trace!(event = event.kind(), "effect cancelled, dropping injected event");
            return Ok(Delivery::Cancelled);
        }
        match self.target.upgrade() {
            Some(target) => target.dispatch(event, &self.token),
            None => Ok(Delivery::Cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token cancelled at teardown, for effects that run their own tasks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl<E> Clone for Injector<E> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
            token: self.token.clone(),
        }
    }
}

impl<E> fmt::Debug for Injector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
