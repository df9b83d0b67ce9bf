//! Context-update actions.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A context update attached to a transition.
///
/// An action writes the fields it owns on the step's working copy of the
/// context; every other field keeps its value. Actions of one transition
/// run in declaration order, each seeing the writes of the previous one.
/// The committed context is only replaced once the whole step succeeds.
///
/// # Example
///
/// ```rust
/// use widget_machines::core::Action;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Timer {
///     elapsed: f64,
///     duration: f64,
/// }
///
/// let reset = Action::<Timer, ()>::new(|ctx, _| ctx.elapsed = 0.0);
///
/// let before = Timer { elapsed: 3.0, duration: 5.0 };
/// let after = reset.applied(&before, None);
///
/// assert_eq!(after, Timer { elapsed: 0.0, duration: 5.0 });
/// assert_eq!(before.elapsed, 3.0);
/// ```
pub struct Action<C, E> {
    assign: Arc<dyn Fn(&mut C, Option<&E>) + Send + Sync>,
    _phantom: PhantomData<fn(&C, &E)>,
}

impl<C, E> Action<C, E> {
    pub fn new<F>(assign: F) -> Self
    where
        F: Fn(&mut C, Option<&E>) + Send + Sync + 'static,
    {
        Action {
            assign: Arc::new(assign),
            _phantom: PhantomData,
        }
    }

    /// Apply the update to a working copy.
    pub fn apply(&self, context: &mut C, event: Option<&E>) {
        (self.assign)(context, event)
    }

    /// Return an updated copy, leaving `context` untouched.
    pub fn applied(&self, context: &C, event: Option<&E>) -> C
    where
        C: Clone,
    {
        let mut next = context.clone();
        self.apply(&mut next, event);
        next
    }
}

impl<C, E> Clone for Action<C, E> {
    fn clone(&self) -> Self {
        Self {
            assign: Arc::clone(&self.assign),
            _phantom: PhantomData,
        }
    }
}

impl<C, E> fmt::Debug for Action<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}
