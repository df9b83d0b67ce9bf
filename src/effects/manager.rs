//! Lifecycle of the one effect an interpreter may have running.

use crate::core::Event;
use crate::effects::effect::{Dispatch, EffectFn, Injector, Teardown};
use std::sync::Weak;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An effect started on entry to a state.
///
/// Stopping cancels the injector's token before running the teardown, so
/// an event racing the teardown can no longer reach the interpreter.
/// Dropping an active effect stops it.
pub(crate) struct ActiveEffect {
    name: String,
    state: String,
    token: CancellationToken,
    teardown: Option<Teardown>,
}

impl ActiveEffect {
    pub(crate) fn start<C, E: Event>(
        name: &str,
        state: &str,
        start: &EffectFn<C, E>,
        context: &C,
        target: Weak<dyn Dispatch<E>>,
    ) -> Self {
        let token = CancellationToken::new();
        let injector = Injector::new(target, token.clone());

        debug!(effect = name, state, "starting effect");
        let teardown = start(context, injector);

        Self {
            name: name.to_string(),
            state: state.to_string(),
            token,
            teardown: Some(teardown),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Cancel and tear down. Later calls do nothing.
    pub(crate) fn stop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            self.token.cancel();
            debug!(effect = %self.name, state = %self.state, "tearing down effect");
            teardown.run();
        }
    }
}

impl Drop for ActiveEffect {
    fn drop(&mut self) {
        self.stop();
    }
}
