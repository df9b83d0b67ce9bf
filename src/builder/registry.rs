//! Named guard, action and effect implementations.

use crate::core::{Action, Guard};
use crate::effects::{EffectFn, Injector, Teardown};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Implementations a definition refers to by name.
///
/// # Example
///
/// ```rust
/// use widget_machines::builder::Registry;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Counter {
///     count: u32,
/// }
///
/// let registry = Registry::<Counter, ()>::new()
///     .guard("isGreaterThanZero", |ctx, _| ctx.count > 0)
///     .action("decreaseCounter", |ctx, _| ctx.count -= 1);
///
/// assert!(registry.has_guard("isGreaterThanZero"));
/// assert!(!registry.has_action("increaseCounter"));
/// ```
pub struct Registry<C, E> {
    guards: HashMap<String, Guard<C, E>>,
    actions: HashMap<String, Action<C, E>>,
    effects: HashMap<String, EffectFn<C, E>>,
}

impl<C, E> Registry<C, E> {
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
            actions: HashMap::new(),
            effects: HashMap::new(),
        }
    }

    /// Register a guard predicate. A later registration under the same
    /// name replaces the earlier one.
    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Guard::new(predicate));
        self
    }

    /// Register a context-update action.
    pub fn action<F>(mut self, name: impl Into<String>, assign: F) -> Self
    where
        F: Fn(&mut C, Option<&E>) + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Action::new(assign));
        self
    }

    /// Register an effect start function.
    pub fn effect<F>(mut self, name: impl Into<String>, start: F) -> Self
    where
        F: Fn(&C, Injector<E>) -> Teardown + Send + Sync + 'static,
    {
        self.effects.insert(name.into(), Arc::new(start));
        self
    }

    pub fn has_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_effect(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub(crate) fn get_guard(&self, name: &str) -> Option<&Guard<C, E>> {
        self.guards.get(name)
    }

    pub(crate) fn get_action(&self, name: &str) -> Option<&Action<C, E>> {
        self.actions.get(name)
    }

    pub(crate) fn get_effect(&self, name: &str) -> Option<&EffectFn<C, E>> {
        self.effects.get(name)
    }
}

impl<C, E> Default for Registry<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> fmt::Debug for Registry<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut guards: Vec<_> = self.guards.keys().collect();
        let mut actions: Vec<_> = self.actions.keys().collect();
        let mut effects: Vec<_> = self.effects.keys().collect();
        guards.sort();
        actions.sort();
        effects.sort();
        f.debug_struct("Registry")
            .field("guards", &guards)
            .field("actions", &actions)
            .field("effects", &effects)
            .finish()
    }
}
