//! Repeating effect backed by the tokio timer.

use crate::core::Event;
use crate::effects::effect::{Delivery, Injector, Teardown};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, warn};

/// Build an effect that injects `make_event()` every period.
///
/// The period is read from the context when the state is entered. The
/// first event arrives one period after entry. The task stops as soon as
/// the effect's token is cancelled; teardown also aborts it.
///
/// Outside a tokio runtime, or with a zero period, the effect logs a
/// warning and does nothing.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use widget_machines::builder::Registry;
/// use widget_machines::core::Event;
/// use widget_machines::effects;
///
/// #[derive(Clone, Debug)]
/// struct Tick;
///
/// impl Event for Tick {
///     fn kind(&self) -> &str {
///         "TICK"
///     }
/// }
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Clock {
///     interval_ms: u64,
/// }
///
/// let registry = Registry::<Clock, Tick>::new().effect(
///     "ticker",
///     effects::interval(|ctx: &Clock| Duration::from_millis(ctx.interval_ms), || Tick),
/// );
/// assert!(registry.has_effect("ticker"));
/// ```
pub fn interval<C, E, P, M>(
    period_of: P,
    make_event: M,
) -> impl Fn(&C, Injector<E>) -> Teardown + Send + Sync + 'static
where
    C: 'static,
    E: Event,
    P: Fn(&C) -> Duration + Send + Sync + 'static,
    M: Fn() -> E + Send + Sync + 'static,
{
    let make_event = Arc::new(make_event);

    move |context: &C, injector: Injector<E>| {
        let period = period_of(context);
        if period.is_zero() {
            warn!("interval effect has a zero period, not started");
            return Teardown::noop();
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no tokio runtime available, interval effect not started");
                return Teardown::noop();
            }
        };

        let token = injector.cancellation_token();
        let make_event = Arc::clone(&make_event);

        let task = handle.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match injector.send(make_event()) {
                            Ok(Delivery::Delivered) => {}
                            Ok(Delivery::Cancelled) => break,
                            Err(err) => {
                                error!(error = %err, "interval event rejected, stopping interval");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Teardown::new(move || task.abort())
    }
}

/// Convert a period in seconds, treating negative or non-finite values as
/// zero.
pub fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
