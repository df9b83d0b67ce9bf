//! Compiled, immutable machine blueprints.
//!
//! A blueprint is built once from a definition and a registry and shared
//! by every interpreter of that machine. All transition selection lives
//! here as pure functions, so a committed step and a dry run can never
//! disagree.

use crate::builder::{DefinitionError, MachineDefinition, Registry, TransitionDef};
use crate::core::{Action, Context, Event, Guard, Snapshot, State, TransitionOutcome};
use crate::effects::EffectFn;
use crate::error::MachineError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

type Check = Validation<(), NonEmptyVec<DefinitionError>>;

const ROOT: &str = "(machine)";

/// One compiled candidate transition.
pub(crate) struct Candidate<S, C, E> {
    target: Option<S>,
    guard: Option<Guard<C, E>>,
    actions: Vec<Action<C, E>>,
}

impl<S, C, E> Candidate<S, C, E> {
    fn enabled(&self, context: &C, event: Option<&E>) -> bool {
        self.guard.as_ref().map_or(true, |g| g.check(context, event))
    }

    fn apply(&self, context: &mut C, event: Option<&E>) {
        for action in &self.actions {
            action.apply(context, event);
        }
    }
}

struct CompiledNode<S, C, E> {
    on: HashMap<String, Vec<Candidate<S, C, E>>>,
    always: Vec<Candidate<S, C, E>>,
    effect: Option<(String, EffectFn<C, E>)>,
}

/// Outcome of resolving a step without committing it.
#[derive(Debug)]
pub(crate) struct Resolution<S, C> {
    pub(crate) state: S,
    pub(crate) context: C,
    /// Targets of the external transitions taken, in order.
    pub(crate) entered: Vec<S>,
}

impl<S, C> Resolution<S, C> {
    /// True when the starting state was exited at least once.
    pub(crate) fn reentered(&self) -> bool {
        !self.entered.is_empty()
    }
}

/// Immutable machine shared by all its interpreters.
pub struct MachineBlueprint<S, C, E> {
    id: String,
    initial: S,
    context: C,
    states: Vec<S>,
    nodes: HashMap<String, CompiledNode<S, C, E>>,
    root: HashMap<String, Vec<Candidate<S, C, E>>>,
    max_automatic_steps: usize,
    history_limit: usize,
}

/// Validate `definition` against `registry` and compile it.
///
/// Every unknown guard, action or effect name and every undeclared state
/// is reported in one [`MachineError::InvalidDefinition`].
pub fn create_machine<S, C, E>(
    definition: MachineDefinition<S, C>,
    registry: Registry<C, E>,
) -> Result<Arc<MachineBlueprint<S, C, E>>, MachineError>
where
    S: State,
    C: Context,
    E: Event,
{
    validate(&definition, &registry)?;
    let blueprint = compile(definition, &registry)?;
    debug!(
        machine = %blueprint.id,
        states = blueprint.states.len(),
        "machine created"
    );
    Ok(Arc::new(blueprint))
}

fn validate<S: State, C, E>(
    definition: &MachineDefinition<S, C>,
    registry: &Registry<C, E>,
) -> Result<(), MachineError> {
    let mut checks: Vec<Check> = Vec::new();

    if definition.max_automatic_steps == 0 {
        checks.push(Validation::fail(DefinitionError::ZeroAutomaticStepLimit));
    }

    let mut declared = HashSet::new();
    for node in &definition.states {
        if !declared.insert(node.state.name()) {
            checks.push(Validation::fail(DefinitionError::DuplicateState {
                state: node.state.name().to_string(),
            }));
        }
    }

    if !declared.contains(definition.initial.name()) {
        checks.push(Validation::fail(DefinitionError::UndeclaredInitialState {
            state: definition.initial.name().to_string(),
        }));
    }

    for node in &definition.states {
        let from = node.state.name();
        for (event, candidates) in &node.on {
            let location = format!("{from}/{event}");
            for candidate in candidates {
                checks.extend(check_candidate(candidate, from, &location, &declared, registry));
            }
        }
        let location = format!("{from}/always");
        for candidate in &node.always {
            checks.extend(check_candidate(candidate, from, &location, &declared, registry));
        }
        if let Some(effect) = &node.invoke {
            if !registry.has_effect(effect) {
                checks.push(Validation::fail(DefinitionError::UnknownEffect {
                    name: effect.clone(),
                    state: from.to_string(),
                }));
            }
        }
    }

    for (event, candidates) in &definition.on {
        let location = format!("{ROOT}/{event}");
        for candidate in candidates {
            checks.extend(check_candidate(candidate, ROOT, &location, &declared, registry));
        }
    }

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(MachineError::InvalidDefinition(
            errors.iter().cloned().collect(),
        )),
    }
}

fn check_candidate<S: State, C, E>(
    candidate: &TransitionDef<S>,
    from: &str,
    location: &str,
    declared: &HashSet<&str>,
    registry: &Registry<C, E>,
) -> Vec<Check> {
    let mut checks = Vec::new();

    if let Some(target) = &candidate.target {
        if !declared.contains(target.name()) {
            checks.push(Validation::fail(DefinitionError::UndeclaredState {
                from: from.to_string(),
                target: target.name().to_string(),
            }));
        }
    }

    if let Some(guard) = &candidate.guard {
        if !registry.has_guard(guard) {
            checks.push(Validation::fail(DefinitionError::UnknownGuard {
                name: guard.clone(),
                location: location.to_string(),
            }));
        }
    }

    for action in &candidate.actions {
        if !registry.has_action(action) {
            checks.push(Validation::fail(DefinitionError::UnknownAction {
                name: action.clone(),
                location: location.to_string(),
            }));
        }
    }

    checks
}

fn compile<S: State, C, E>(
    definition: MachineDefinition<S, C>,
    registry: &Registry<C, E>,
) -> Result<MachineBlueprint<S, C, E>, MachineError> {
    let mut states = Vec::with_capacity(definition.states.len());
    let mut nodes = HashMap::with_capacity(definition.states.len());

    for node in definition.states {
        let name = node.state.name().to_string();

        let mut on = HashMap::with_capacity(node.on.len());
        for (event, candidates) in node.on {
            let location = format!("{name}/{event}");
            on.insert(event, compile_candidates(candidates, &location, registry)?);
        }
        let always = compile_candidates(node.always, &format!("{name}/always"), registry)?;

        let effect = match node.invoke {
            Some(effect) => {
                let start = registry.get_effect(&effect).cloned().ok_or_else(|| {
                    invalid(DefinitionError::UnknownEffect {
                        name: effect.clone(),
                        state: name.clone(),
                    })
                })?;
                Some((effect, start))
            }
            None => None,
        };

        states.push(node.state);
        nodes.insert(name, CompiledNode { on, always, effect });
    }

    let mut root = HashMap::with_capacity(definition.on.len());
    for (event, candidates) in definition.on {
        let location = format!("{ROOT}/{event}");
        root.insert(event, compile_candidates(candidates, &location, registry)?);
    }

    Ok(MachineBlueprint {
        id: definition.id,
        initial: definition.initial,
        context: definition.context,
        states,
        nodes,
        root,
        max_automatic_steps: definition.max_automatic_steps,
        history_limit: definition.history_limit,
    })
}

fn compile_candidates<S, C, E>(
    candidates: Vec<TransitionDef<S>>,
    location: &str,
    registry: &Registry<C, E>,
) -> Result<Vec<Candidate<S, C, E>>, MachineError> {
    candidates
        .into_iter()
        .map(|candidate| {
            let guard = match &candidate.guard {
                Some(name) => Some(registry.get_guard(name).cloned().ok_or_else(|| {
                    invalid(DefinitionError::UnknownGuard {
                        name: name.clone(),
                        location: location.to_string(),
                    })
                })?),
                None => None,
            };

            let actions = candidate
                .actions
                .iter()
                .map(|name| {
                    registry.get_action(name).cloned().ok_or_else(|| {
                        invalid(DefinitionError::UnknownAction {
                            name: name.clone(),
                            location: location.to_string(),
                        })
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Candidate {
                target: candidate.target,
                guard,
                actions,
            })
        })
        .collect()
}

fn invalid(violation: DefinitionError) -> MachineError {
    MachineError::InvalidDefinition(vec![violation])
}

impl<S, C, E> MachineBlueprint<S, C, E>
where
    S: State,
    C: Context,
    E: Event,
{
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn initial_context(&self) -> &C {
        &self.context
    }

    /// Declared states, in declaration order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn max_automatic_steps(&self) -> usize {
        self.max_automatic_steps
    }

    /// State changes each interpreter keeps in its history.
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Event kinds `state` has candidates for, including machine-wide ones.
    /// Final states accept nothing.
    pub fn events_from(&self, state: &S) -> Vec<&str> {
        if state.is_final() {
            return Vec::new();
        }
        let mut events: Vec<&str> = self
            .nodes
            .get(state.name())
            .into_iter()
            .flat_map(|node| node.on.keys())
            .chain(self.root.keys())
            .map(String::as_str)
            .collect();
        events.sort_unstable();
        events.dedup();
        events
    }

    /// The settled initial snapshot: initial state and context after
    /// draining automatic transitions.
    pub fn initial_snapshot(&self) -> Result<Snapshot<S, C>, MachineError> {
        let resolution = self.initial_resolution()?;
        Ok(Snapshot::new(resolution.state, resolution.context))
    }

    /// Compute what `event` would do from `snapshot` without committing
    /// anything or touching effects.
    ///
    /// `changed` is false when no candidate matches, or when the matched
    /// transition leaves both state and context as they were.
    pub fn transition(
        &self,
        snapshot: &Snapshot<S, C>,
        event: &E,
    ) -> Result<TransitionOutcome<S, C>, MachineError> {
        match self.resolve(&snapshot.state, &snapshot.context, event)? {
            Some(resolution) => {
                let changed =
                    resolution.state != snapshot.state || resolution.context != snapshot.context;
                Ok(TransitionOutcome {
                    state: resolution.state,
                    context: resolution.context,
                    changed,
                })
            }
            None => Ok(TransitionOutcome {
                state: snapshot.state.clone(),
                context: snapshot.context.clone(),
                changed: false,
            }),
        }
    }

    pub(crate) fn initial_resolution(&self) -> Result<Resolution<S, C>, MachineError> {
        self.settle(Resolution {
            state: self.initial.clone(),
            context: self.context.clone(),
            entered: Vec::new(),
        })
    }

    /// Resolve one event. `None` means no candidate matched.
    pub(crate) fn resolve(
        &self,
        state: &S,
        context: &C,
        event: &E,
    ) -> Result<Option<Resolution<S, C>>, MachineError> {
        let Some(candidate) = self.select(state, context, event) else {
            return Ok(None);
        };

        let mut resolution = Resolution {
            state: state.clone(),
            context: context.clone(),
            entered: Vec::new(),
        };
        candidate.apply(&mut resolution.context, Some(event));
        if let Some(target) = &candidate.target {
            resolution.state = target.clone();
            resolution.entered.push(target.clone());
        }

        self.settle(resolution).map(Some)
    }

    pub(crate) fn effect_for(&self, state: &S) -> Option<(&str, &EffectFn<C, E>)> {
        self.nodes
            .get(state.name())?
            .effect
            .as_ref()
            .map(|(name, start)| (name.as_str(), start))
    }

    /// First enabled candidate: the state's own, then machine-wide ones.
    fn select(&self, state: &S, context: &C, event: &E) -> Option<&Candidate<S, C, E>> {
        if state.is_final() {
            return None;
        }
        let kind = event.kind();
        let own = self.nodes.get(state.name()).and_then(|node| node.on.get(kind));
        let root = self.root.get(kind);

        own.into_iter()
            .flatten()
            .chain(root.into_iter().flatten())
            .find(|candidate| candidate.enabled(context, Some(event)))
    }

    fn select_automatic(&self, state: &S, context: &C) -> Option<&Candidate<S, C, E>> {
        if state.is_final() {
            return None;
        }
        self.nodes
            .get(state.name())?
            .always
            .iter()
            .find(|candidate| candidate.enabled(context, None))
    }

    /// Take automatic transitions until none is enabled.
    fn settle(&self, mut resolution: Resolution<S, C>) -> Result<Resolution<S, C>, MachineError> {
        let mut steps = 0;
        while let Some(candidate) = self.select_automatic(&resolution.state, &resolution.context) {
            if steps == self.max_automatic_steps {
                return Err(MachineError::AutomaticTransitionLimit {
                    state: resolution.state.name().to_string(),
                    limit: self.max_automatic_steps,
                });
            }
            steps += 1;

            candidate.apply(&mut resolution.context, None);
            if let Some(target) = &candidate.target {
                resolution.state = target.clone();
                resolution.entered.push(target.clone());
            }
        }
        Ok(resolution)
    }
}

impl<S: State, C, E> fmt::Debug for MachineBlueprint<S, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineBlueprint")
            .field("id", &self.id)
            .field("initial", &self.initial)
            .field("states", &self.states)
            .field("max_automatic_steps", &self.max_automatic_steps)
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}
