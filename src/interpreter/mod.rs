//! Running machine instances.
//!
//! An [`Interpreter`] owns one `(state, context)` pair of a shared
//! [`MachineBlueprint`], commits steps, runs the current state's effect and
//! publishes the settled snapshot to subscribers after each committed
//! `send`.
//!
//! # Concurrency
//!
//! Steps are serialized by a re-entrant lock. A `send` from another thread
//! (or from an effect's task) waits for the running step. A `send` made
//! from inside a guard, action, effect start or teardown of the same
//! interpreter is rejected with [`MachineError::ReentrantSend`].
//!
//! Subscriber callbacks run once the step lock is released and may call
//! `send`. Snapshots reach every subscriber in commit order: a snapshot
//! committed while another is being delivered is queued behind it.

mod subscription;

pub use subscription::Subscription;

use crate::core::{Context, Event, Snapshot, State, StateHistory, StateTransition, TransitionOutcome};
use crate::effects::manager::ActiveEffect;
use crate::effects::{Delivery, Dispatch};
use crate::error::MachineError;
use crate::machine::{MachineBlueprint, Resolution};
use chrono::Utc;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::{Arc, Weak};
use subscription::{Outbox, Subscribers, Unsubscribe};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Lifecycle of an interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpreterStatus {
    /// Accepting events.
    Running,
    /// Settled in a final state.
    Done,
    /// `stop()` was called.
    Stopped,
}

/// Start an interpreter for `blueprint`.
///
/// The initial state's automatic transitions are drained before the
/// interpreter is returned, and the settled state's effect is started.
pub fn interpret<S, C, E>(
    blueprint: Arc<MachineBlueprint<S, C, E>>,
) -> Result<Interpreter<S, C, E>, MachineError>
where
    S: State,
    C: Context,
    E: Event,
{
    let resolution = blueprint.initial_resolution()?;
    let history = record_entries(
        StateHistory::with_limit(blueprint.history_limit()),
        blueprint.initial_state(),
        &resolution.entered,
        None,
    );
    let Resolution { state, context, .. } = resolution;

    let shared = Arc::new_cyclic(|self_ref| Shared {
        blueprint,
        session_id: Uuid::new_v4(),
        self_ref: self_ref.clone(),
        core: ReentrantMutex::new(Core {
            stepping: Cell::new(false),
            inner: RefCell::new(Inner {
                state: state.clone(),
                context,
                status: InterpreterStatus::Running,
                effect: None,
                history,
            }),
        }),
        subscribers: Mutex::new(Subscribers::default()),
        outbox: Mutex::new(Outbox::default()),
    });

    {
        let core = shared.core.lock();
        let _step = core.begin_step("(start)")?;
        shared.enter(&core, &state);
    }

    info!(
        machine = shared.blueprint.id(),
        session = %shared.session_id,
        state = state.name(),
        "interpreter started"
    );
    Ok(Interpreter { shared })
}

/// Handle to a running machine instance.
///
/// Clones share the same instance. The running effect is torn down when
/// the last handle is dropped.
pub struct Interpreter<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    shared: Arc<Shared<S, C, E>>,
}

impl<S, C, E> Interpreter<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    /// Apply one event and drain automatic transitions.
    ///
    /// Returns the committed snapshot. An event no candidate accepts, or
    /// any event after the interpreter is done or stopped, leaves the
    /// snapshot unchanged and notifies nobody.
    pub fn send(&self, event: E) -> Result<Snapshot<S, C>, MachineError> {
        let (snapshot, deliver) = {
            let core = self.shared.core.lock();
            self.shared.send_locked(&core, event)?
        };
        if deliver {
            self.shared.deliver();
        }
        Ok(snapshot)
    }

    /// What `event` would do from `snapshot`, without committing.
    pub fn transition(
        &self,
        snapshot: &Snapshot<S, C>,
        event: &E,
    ) -> Result<TransitionOutcome<S, C>, MachineError> {
        self.shared.blueprint.transition(snapshot, event)
    }

    /// Whether `event` would change anything if sent now.
    pub fn can(&self, event: &E) -> Result<bool, MachineError> {
        if self.status() != InterpreterStatus::Running {
            return Ok(false);
        }
        let snapshot = self.snapshot();
        Ok(self.shared.blueprint.transition(&snapshot, event)?.changed)
    }

    /// The last committed snapshot.
    pub fn snapshot(&self) -> Snapshot<S, C> {
        let core = self.shared.core.lock();
        core.snapshot()
    }

    /// Register `callback` for every committed step.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot<S, C>) + Send + Sync + 'static,
    {
        let (id, listeners) = {
            let mut subscribers = self.shared.subscribers.lock();
            let id = subscribers.add(Arc::new(callback));
            (id, subscribers.len())
        };
        let owner: Weak<dyn Unsubscribe> = self.shared.self_ref.clone();
        trace!(
            machine = self.shared.blueprint.id(),
            session = %self.shared.session_id,
            subscription = id,
            listeners,
            "subscribed"
        );
        Subscription::new(id, owner)
    }

    /// Tear down the running effect and make every later `send` a no-op.
    ///
    /// Once this returns the effect can no longer deliver events. Calling
    /// `stop` again does nothing.
    pub fn stop(&self) -> Result<(), MachineError> {
        let core = self.shared.core.lock();
        let _step = core.begin_step("stop")?;

        let effect = {
            let mut inner = core.inner.borrow_mut();
            if inner.status == InterpreterStatus::Stopped {
                return Ok(());
            }
            inner.status = InterpreterStatus::Stopped;
            inner.effect.take()
        };
        if let Some(mut effect) = effect {
            effect.stop();
        }

        info!(
            machine = self.shared.blueprint.id(),
            session = %self.shared.session_id,
            "interpreter stopped"
        );
        Ok(())
    }

    pub fn status(&self) -> InterpreterStatus {
        let core = self.shared.core.lock();
        let status = core.inner.borrow().status;
        status
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    /// Every committed state change, including the initial drain.
    pub fn history(&self) -> StateHistory<S> {
        let core = self.shared.core.lock();
        let history = core.inner.borrow().history.clone();
        history
    }

    /// Name of the effect currently running, if any.
    pub fn active_effect(&self) -> Option<String> {
        let core = self.shared.core.lock();
        let name = core
            .inner
            .borrow()
            .effect
            .as_ref()
            .map(|effect| effect.name().to_string());
        name
    }

    pub fn blueprint(&self) -> &Arc<MachineBlueprint<S, C, E>> {
        &self.shared.blueprint
    }
}

impl<S, C, E> Clone for Interpreter<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, C, E> fmt::Debug for Interpreter<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("machine", &self.shared.blueprint.id())
            .field("session", &self.shared.session_id)
            .finish_non_exhaustive()
    }
}

struct Shared<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    blueprint: Arc<MachineBlueprint<S, C, E>>,
    session_id: Uuid,
    self_ref: Weak<Self>,
    core: ReentrantMutex<Core<S, C>>,
    subscribers: Mutex<Subscribers<S, C>>,
    outbox: Mutex<Outbox<S, C>>,
}

struct Core<S: State, C> {
    /// Set while a step, start or stop runs user code on this interpreter.
    stepping: Cell<bool>,
    inner: RefCell<Inner<S, C>>,
}

struct Inner<S: State, C> {
    state: S,
    context: C,
    status: InterpreterStatus,
    effect: Option<ActiveEffect>,
    history: StateHistory<S>,
}

struct StepGuard<'a>(&'a Cell<bool>);

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: State, C: Context> Core<S, C> {
    fn begin_step(&self, event: &str) -> Result<StepGuard<'_>, MachineError> {
        if self.stepping.replace(true) {
            return Err(MachineError::ReentrantSend {
                event: event.to_string(),
            });
        }
        Ok(StepGuard(&self.stepping))
    }

    fn snapshot(&self) -> Snapshot<S, C> {
        let inner = self.inner.borrow();
        Snapshot::new(inner.state.clone(), inner.context.clone())
    }
}

impl<S, C, E> Shared<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    /// Step under the core lock and queue the snapshot if it committed.
    ///
    /// The flag tells the caller to [`deliver`](Self::deliver) once the
    /// lock is released.
    fn send_locked(
        &self,
        core: &Core<S, C>,
        event: E,
    ) -> Result<(Snapshot<S, C>, bool), MachineError> {
        let committed = {
            let _step = core.begin_step(event.kind())?;
            self.step(core, &event)?
        };

        let snapshot = core.snapshot();
        let deliver = committed && self.outbox.lock().push(snapshot.clone());
        Ok((snapshot, deliver))
    }

    /// Resolve and commit one event. Returns false for a no-op.
    fn step(&self, core: &Core<S, C>, event: &E) -> Result<bool, MachineError> {
        let (state, context) = {
            let inner = core.inner.borrow();
            if inner.status != InterpreterStatus::Running {
                trace!(
                    machine = self.blueprint.id(),
                    session = %self.session_id,
                    event = event.kind(),
                    status = ?inner.status,
                    "interpreter not running, ignoring event"
                );
                return Ok(false);
            }
            (inner.state.clone(), inner.context.clone())
        };

        let Some(resolution) = self.blueprint.resolve(&state, &context, event)? else {
            trace!(
                machine = self.blueprint.id(),
                session = %self.session_id,
                state = state.name(),
                event = event.kind(),
                "no enabled transition, ignoring event"
            );
            return Ok(false);
        };

        debug!(
            machine = self.blueprint.id(),
            session = %self.session_id,
            event = event.kind(),
            from = state.name(),
            to = resolution.state.name(),
            "step committed"
        );
        self.commit(core, resolution, event.kind());
        Ok(true)
    }

    fn commit(&self, core: &Core<S, C>, resolution: Resolution<S, C>, event: &str) {
        let reentered = resolution.reentered();

        if reentered {
            let previous = core.inner.borrow_mut().effect.take();
            if let Some(mut effect) = previous {
                effect.stop();
            }
        }

        let settled = resolution.state.clone();
        {
            let mut inner = core.inner.borrow_mut();
            let history = std::mem::take(&mut inner.history);
            inner.history = record_entries(history, &inner.state, &resolution.entered, Some(event));
            inner.state = resolution.state;
            inner.context = resolution.context;
        }

        if reentered {
            self.enter(core, &settled);
        }
    }

    /// Finish entering the settled state: mark done or start its effect.
    fn enter(&self, core: &Core<S, C>, state: &S) {
        if state.is_final() {
            core.inner.borrow_mut().status = InterpreterStatus::Done;
            info!(
                machine = self.blueprint.id(),
                session = %self.session_id,
                state = state.name(),
                "machine reached final state"
            );
            return;
        }

        let Some((name, start)) = self.blueprint.effect_for(state) else {
            return;
        };
        let context = core.inner.borrow().context.clone();
        let target: Weak<dyn Dispatch<E>> = self.self_ref.clone();
        let effect = ActiveEffect::start(name, state.name(), start, &context, target);
        core.inner.borrow_mut().effect = Some(effect);
    }

    /// Hand queued snapshots to subscribers until the outbox is empty.
    /// Must not be called with the core lock held.
    fn deliver(&self) {
        let _abandon = AbandonOnPanic(&self.outbox);
        loop {
            let next = self.outbox.lock().next();
            let Some(snapshot) = next else {
                break;
            };
            let listeners = self.subscribers.lock().listeners();
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }
}

impl<S, C, E> Dispatch<E> for Shared<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    fn dispatch(&self, event: E, token: &CancellationToken) -> Result<Delivery, MachineError> {
        let deliver = {
            let core = self.core.lock();
            // Teardown cancels under this lock, so the check cannot race it.
            if token.is_cancelled() {
                warn!(
                    machine = self.blueprint.id(),
                    session = %self.session_id,
                    event = event.kind(),
                    "effect torn down, dropping injected event"
                );
                return Ok(Delivery::Cancelled);
            }
            self.send_locked(&core, event)?.1
        };
        if deliver {
            self.deliver();
        }
        Ok(Delivery::Delivered)
    }
}

impl<S, C, E> Unsubscribe for Shared<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    fn unsubscribe(&self, id: u64) {
        if self.subscribers.lock().remove(id) {
            trace!(
                machine = self.blueprint.id(),
                session = %self.session_id,
                subscription = id,
                "unsubscribed"
            );
        }
    }
}

/// Releases the outbox if a subscriber panics mid-delivery.
struct AbandonOnPanic<'a, S, C>(&'a Mutex<Outbox<S, C>>);

impl<S, C> Drop for AbandonOnPanic<'_, S, C> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().abandon();
        }
    }
}

fn record_entries<S: State>(
    history: StateHistory<S>,
    from: &S,
    entered: &[S],
    event: Option<&str>,
) -> StateHistory<S> {
    let mut from = from.clone();
    entered.iter().fold(history, |history, to| {
        history.record(StateTransition {
            from: std::mem::replace(&mut from, to.clone()),
            to: to.clone(),
            event: event.map(str::to_string),
            timestamp: Utc::now(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MachineDefinition, Registry, StateNode, TransitionDef};
    use crate::effects::{Injector, Teardown};
    use crate::machine::create_machine;
    use crate::state_enum;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    state_enum! {
        enum Lamp {
            Off,
            On,
            Warming,
            Broken,
        }
        final: [Broken]
    }

    #[derive(Clone, PartialEq, Debug, Default)]
    struct Ctx {
        presses: u32,
        heat: u32,
    }

    #[derive(Clone, Debug)]
    enum Ev {
        Press,
        Flick,
        Heat,
        Smash,
        Nothing,
    }

    impl Event for Ev {
        fn kind(&self) -> &str {
            match self {
                Self::Press => "PRESS",
                Self::Flick => "FLICK",
                Self::Heat => "HEAT",
                Self::Smash => "SMASH",
                Self::Nothing => "NOTHING",
            }
        }
    }

    #[derive(Default)]
    struct Probe {
        starts: AtomicUsize,
        teardowns: AtomicUsize,
        injector: Mutex<Option<Injector<Ev>>>,
    }

    fn registry(probe: &Arc<Probe>) -> Registry<Ctx, Ev> {
        let probe = Arc::clone(probe);
        Registry::<Ctx, Ev>::new()
            .action("press", |ctx: &mut Ctx, _| ctx.presses += 1)
            .action("heat", |ctx: &mut Ctx, _| ctx.heat += 1)
            .guard("warm", |ctx: &Ctx, _| ctx.heat >= 2)
            .effect("glow", move |_: &Ctx, injector: Injector<Ev>| {
                probe.starts.fetch_add(1, Ordering::SeqCst);
                *probe.injector.lock() = Some(injector);
                let probe = Arc::clone(&probe);
                Teardown::new(move || {
                    probe.teardowns.fetch_add(1, Ordering::SeqCst);
                })
            })
    }

    /// Off -PRESS-> Warming -(heat >= 2)-> On; On -PRESS-> Off;
    /// FLICK re-enters On; SMASH anywhere -> Broken.
    fn lamp(probe: &Arc<Probe>) -> Interpreter<Lamp, Ctx, Ev> {
        let definition = MachineDefinition::new("lamp", Lamp::Off, Ctx::default())
            .state(StateNode::new(Lamp::Off).on(
                "PRESS",
                TransitionDef::to(Lamp::Warming).action("press"),
            ))
            .state(
                StateNode::new(Lamp::Warming)
                    .on("HEAT", TransitionDef::internal().action("heat"))
                    .always(TransitionDef::to(Lamp::On).guard("warm"))
                    .invoke("glow"),
            )
            .state(
                StateNode::new(Lamp::On)
                    .on("PRESS", TransitionDef::to(Lamp::Off).action("press"))
                    .on("FLICK", TransitionDef::to(Lamp::On))
                    .invoke("glow"),
            )
            .state(StateNode::new(Lamp::Broken))
            .on("SMASH", TransitionDef::to(Lamp::Broken));

        let machine = create_machine(definition, registry(probe)).unwrap();
        interpret(machine).unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Snapshot<Lamp, Ctx>) + Send + Sync) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        (calls, move |_: &Snapshot<Lamp, Ctx>| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn send_commits_and_notifies_once() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let (calls, callback) = counter();
        let _subscription = lamp.subscribe(callback);

        let snapshot = lamp.send(Ev::Press).unwrap();

        assert_eq!(snapshot.state, Lamp::Warming);
        assert_eq!(snapshot.context.presses, 1);
        assert_eq!(lamp.snapshot(), snapshot);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unmatched_event_is_silent() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let (calls, callback) = counter();
        let _subscription = lamp.subscribe(callback);

        let snapshot = lamp.send(Ev::Nothing).unwrap();

        assert_eq!(snapshot.state, Lamp::Off);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!lamp.can(&Ev::Nothing).unwrap());
        assert!(lamp.can(&Ev::Press).unwrap());
    }

    #[test]
    fn drained_step_publishes_only_settled_snapshot() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let _subscription = lamp.subscribe(move |snapshot| sink.lock().push(snapshot.state.clone()));

        lamp.send(Ev::Press).unwrap();
        lamp.send(Ev::Heat).unwrap();
        lamp.send(Ev::Heat).unwrap();

        assert_eq!(*published.lock(), vec![Lamp::Warming, Lamp::Warming, Lamp::On]);
        assert_eq!(
            lamp.history().get_path(),
            vec![&Lamp::Off, &Lamp::Warming, &Lamp::On]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let (calls, callback) = counter();
        let subscription = lamp.subscribe(callback);

        lamp.send(Ev::Press).unwrap();
        subscription.unsubscribe();
        lamp.send(Ev::Heat).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_follows_state_entry_and_exit() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        assert_eq!(probe.starts.load(Ordering::SeqCst), 0);

        lamp.send(Ev::Press).unwrap();
        assert_eq!(lamp.active_effect().as_deref(), Some("glow"));
        assert_eq!(probe.starts.load(Ordering::SeqCst), 1);

        // Internal transition keeps the effect; the drain into On restarts it.
        lamp.send(Ev::Heat).unwrap();
        assert_eq!(probe.starts.load(Ordering::SeqCst), 1);
        lamp.send(Ev::Heat).unwrap();
        assert_eq!(probe.starts.load(Ordering::SeqCst), 2);
        assert_eq!(probe.teardowns.load(Ordering::SeqCst), 1);

        lamp.send(Ev::Press).unwrap();
        assert_eq!(probe.teardowns.load(Ordering::SeqCst), 2);
        assert!(lamp.active_effect().is_none());
    }

    #[test]
    fn self_target_restarts_effect() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        lamp.send(Ev::Press).unwrap();
        lamp.send(Ev::Heat).unwrap();
        lamp.send(Ev::Heat).unwrap();
        let starts = probe.starts.load(Ordering::SeqCst);

        let snapshot = lamp.send(Ev::Flick).unwrap();

        assert_eq!(snapshot.state, Lamp::On);
        assert_eq!(probe.starts.load(Ordering::SeqCst), starts + 1);
        assert_eq!(probe.teardowns.load(Ordering::SeqCst), starts);
    }

    #[test]
    fn injected_events_run_the_full_step() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let (calls, callback) = counter();
        let _subscription = lamp.subscribe(callback);
        lamp.send(Ev::Press).unwrap();
        let injector = probe.injector.lock().clone().unwrap();

        injector.send(Ev::Heat).unwrap();
        let delivery = injector.send(Ev::Heat).unwrap();

        assert_eq!(delivery, Delivery::Delivered);
        assert_eq!(lamp.snapshot().state, Lamp::On);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // The Warming injector was torn down when On was entered.
        assert_eq!(injector.send(Ev::Press).unwrap(), Delivery::Cancelled);
        assert_eq!(lamp.snapshot().state, Lamp::On);
    }

    #[test]
    fn stop_tears_down_and_ignores_later_events() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        lamp.send(Ev::Press).unwrap();
        let injector = probe.injector.lock().clone().unwrap();

        lamp.stop().unwrap();
        lamp.stop().unwrap();

        assert_eq!(lamp.status(), InterpreterStatus::Stopped);
        assert_eq!(probe.teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(injector.send(Ev::Heat).unwrap(), Delivery::Cancelled);
        assert_eq!(lamp.send(Ev::Smash).unwrap().state, Lamp::Warming);
        assert!(!lamp.can(&Ev::Smash).unwrap());
    }

    #[test]
    fn final_state_marks_done() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        lamp.send(Ev::Press).unwrap();

        let snapshot = lamp.send(Ev::Smash).unwrap();

        assert!(snapshot.is_final());
        assert_eq!(lamp.status(), InterpreterStatus::Done);
        assert_eq!(probe.teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(lamp.send(Ev::Press).unwrap().state, Lamp::Broken);
    }

    #[test]
    fn dropping_last_handle_tears_effect_down() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        lamp.send(Ev::Press).unwrap();
        let injector = probe.injector.lock().clone().unwrap();
        let other = lamp.clone();

        drop(lamp);
        assert_eq!(probe.teardowns.load(Ordering::SeqCst), 0);
        drop(other);

        assert_eq!(probe.teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(injector.send(Ev::Heat).unwrap(), Delivery::Cancelled);
    }

    #[test]
    fn send_from_action_is_rejected() {
        static SLOT: OnceLock<Interpreter<Lamp, Ctx, Ev>> = OnceLock::new();
        static ERRORS: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

        let registry = Registry::<Ctx, Ev>::new().action("nested", |_: &mut Ctx, _| {
            if let Some(lamp) = SLOT.get() {
                if let Err(err) = lamp.send(Ev::Nothing) {
                    ERRORS.lock().push(err.to_string());
                }
            }
        });
        let definition = MachineDefinition::new("nested", Lamp::Off, Ctx::default()).state(
            StateNode::new(Lamp::Off).on("PRESS", TransitionDef::internal().action("nested")),
        );
        let lamp = interpret(create_machine(definition, registry).unwrap()).unwrap();
        let _ = SLOT.set(lamp.clone());

        lamp.send(Ev::Press).unwrap();

        let errors = ERRORS.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("re-entrant send of event 'NOTHING'"));
    }

    #[test]
    fn synchronous_inject_from_start_is_rejected() {
        let outcome = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&outcome);
        let registry = Registry::<Ctx, Ev>::new().effect("eager", move |_: &Ctx, injector: Injector<Ev>| {
            *sink.lock() = Some(injector.send(Ev::Press).is_err());
            Teardown::noop()
        });
        let definition = MachineDefinition::new("eager", Lamp::On, Ctx::default())
            .state(StateNode::new(Lamp::On).invoke("eager"));

        let lamp = interpret(create_machine(definition, registry).unwrap()).unwrap();

        assert_eq!(*outcome.lock(), Some(true));
        assert_eq!(lamp.status(), InterpreterStatus::Running);
    }

    #[test]
    fn subscriber_may_send() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let handle = lamp.clone();
        let _subscription = lamp.subscribe(move |snapshot| {
            if snapshot.state == Lamp::Warming && snapshot.context.heat < 2 {
                handle.send(Ev::Heat).unwrap();
            }
        });

        lamp.send(Ev::Press).unwrap();

        assert_eq!(lamp.snapshot().state, Lamp::On);
    }

    #[test]
    fn nested_sends_are_delivered_in_commit_order() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let handle = lamp.clone();
        let _heater = lamp.subscribe(move |snapshot| {
            if snapshot.state == Lamp::Warming {
                handle.send(Ev::Heat).unwrap();
            }
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let _recorder = lamp.subscribe(move |snapshot| {
            recorder.lock().push((snapshot.state.clone(), snapshot.context.heat));
        });

        lamp.send(Ev::Press).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![(Lamp::Warming, 0), (Lamp::Warming, 1), (Lamp::On, 2)]
        );
        assert_eq!(lamp.snapshot().state, Lamp::On);
    }

    #[test]
    fn subscriber_may_wait_on_a_send_from_another_thread() {
        let probe = Arc::new(Probe::default());
        let lamp = lamp(&probe);
        let handle = lamp.clone();
        let _subscription = lamp.subscribe(move |snapshot| {
            if snapshot.state == Lamp::Warming && snapshot.context.heat == 0 {
                let other = handle.clone();
                std::thread::spawn(move || other.send(Ev::Heat).unwrap())
                    .join()
                    .unwrap();
            }
        });

        lamp.send(Ev::Press).unwrap();

        let snapshot = lamp.snapshot();
        assert_eq!(snapshot.state, Lamp::Warming);
        assert_eq!(snapshot.context.heat, 1);
    }

    #[test]
    fn history_keeps_only_the_configured_number_of_changes() {
        let probe = Arc::new(Probe::default());
        let definition = MachineDefinition::new("lamp", Lamp::Off, Ctx::default())
            .state(StateNode::new(Lamp::Off).on("PRESS", TransitionDef::to(Lamp::On)))
            .state(StateNode::new(Lamp::On).on("PRESS", TransitionDef::to(Lamp::Off)))
            .history_limit(4);
        let lamp = interpret(create_machine(definition, registry(&probe)).unwrap()).unwrap();

        for _ in 0..101 {
            lamp.send(Ev::Press).unwrap();
        }

        let history = lamp.history();
        assert_eq!(history.limit(), Some(4));
        assert_eq!(history.transitions().len(), 4);
        assert_eq!(history.transitions()[3].to, Lamp::On);
        assert_eq!(lamp.snapshot().state, Lamp::On);
    }

    #[test]
    fn initial_drain_is_recorded() {
        let registry = Registry::<Ctx, Ev>::new().guard("yes", |_: &Ctx, _| true);
        let definition = MachineDefinition::new("jump", Lamp::Off, Ctx::default())
            .state(StateNode::new(Lamp::Off).always(TransitionDef::to(Lamp::On).guard("yes")))
            .state(StateNode::new(Lamp::On));

        let lamp = interpret(create_machine(definition, registry).unwrap()).unwrap();

        assert_eq!(lamp.snapshot().state, Lamp::On);
        let history = lamp.history();
        assert_eq!(history.get_path(), vec![&Lamp::Off, &Lamp::On]);
        assert_eq!(history.transitions()[0].event, None);
    }

    #[test]
    fn drain_limit_leaves_state_untouched() {
        let registry = Registry::<Ctx, Ev>::new()
            .guard("hot", |ctx: &Ctx, _| ctx.heat > 0)
            .action("heat", |ctx: &mut Ctx, _| ctx.heat += 1);
        let definition = MachineDefinition::new("loop", Lamp::Off, Ctx::default())
            .state(
                StateNode::new(Lamp::Off)
                    .on("HEAT", TransitionDef::internal().action("heat"))
                    .always(TransitionDef::to(Lamp::On).guard("hot")),
            )
            .state(StateNode::new(Lamp::On).always(TransitionDef::to(Lamp::Off).guard("hot")))
            .max_automatic_steps(8);
        let lamp = interpret(create_machine(definition, registry).unwrap()).unwrap();

        let err = lamp.send(Ev::Heat).unwrap_err();

        assert!(matches!(err, MachineError::AutomaticTransitionLimit { limit: 8, .. }));
        assert_eq!(lamp.snapshot(), Snapshot::new(Lamp::Off, Ctx::default()));
        assert!(lamp.history().is_empty());
    }
}
