//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions over the current context and the
//! incoming event. They must not consult anything else, so that a dry run
//! and a committed step always select the same transition.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Pure predicate that determines if a transition can fire.
///
/// The event is `None` when the guard belongs to an automatic transition.
///
/// # Example
///
/// ```rust
/// use widget_machines::core::Guard;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Counter {
///     count: u32,
/// }
///
/// let above_zero = Guard::<Counter, ()>::new(|ctx, _| ctx.count > 0);
///
/// assert!(!above_zero.check(&Counter { count: 0 }, None));
/// assert!(above_zero.check(&Counter { count: 3 }, Some(&())));
/// ```
pub struct Guard<C, E> {
    predicate: Arc<dyn Fn(&C, Option<&E>) -> bool + Send + Sync>,
    _phantom: PhantomData<fn(&C, &E)>,
}

impl<C, E> Guard<C, E> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
            _phantom: PhantomData,
        }
    }

    /// Evaluate the guard without side effects.
    pub fn check(&self, context: &C, event: Option<&E>) -> bool {
        (self.predicate)(context, event)
    }
}

impl<C, E> Clone for Guard<C, E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            _phantom: PhantomData,
        }
    }
}

impl<C, E> fmt::Debug for Guard<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Ctx {
        elapsed: f64,
        duration: f64,
    }

    #[derive(Clone, Debug)]
    enum Ev {
        Set(&'static str),
    }

    #[test]
    fn guard_reads_context() {
        let finished = Guard::<Ctx, Ev>::new(|ctx, _| ctx.elapsed >= ctx.duration);

        assert!(finished.check(
            &Ctx {
                elapsed: 5.0,
                duration: 5.0
            },
            None
        ));
        assert!(!finished.check(
            &Ctx {
                elapsed: 4.9,
                duration: 5.0
            },
            None
        ));
    }

    #[test]
    fn guard_reads_event_payload() {
        let known = Guard::<Ctx, Ev>::new(|_, event| {
            matches!(event, Some(Ev::Set("oneWay")) | Some(Ev::Set("roundTrip")))
        });
        let ctx = Ctx {
            elapsed: 0.0,
            duration: 0.0,
        };

        assert!(known.check(&ctx, Some(&Ev::Set("oneWay"))));
        assert!(!known.check(&ctx, Some(&Ev::Set("multiCity"))));
        assert!(!known.check(&ctx, None));
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::<Ctx, Ev>::new(|ctx, _| ctx.elapsed < ctx.duration);
        let ctx = Ctx {
            elapsed: 1.0,
            duration: 2.0,
        };

        assert_eq!(guard.check(&ctx, None), guard.check(&ctx, None));
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let guard = Guard::<Ctx, Ev>::new(|ctx, _| ctx.duration > 0.0);
        let cloned = guard.clone();
        let ctx = Ctx {
            elapsed: 0.0,
            duration: 1.0,
        };

        assert_eq!(guard.check(&ctx, None), cloned.check(&ctx, None));
    }
}
