//! Timer: elapsed time ticking toward an adjustable duration.
//!
//! `Running` owns an interval effect that injects `TICK` every
//! `interval` seconds. Automatic transitions pause the timer once
//! `elapsed >= duration` and resume it as soon as a duration update or a
//! reset makes `elapsed < duration` again. `DURATION.UPDATE` and `RESET`
//! are accepted in every state.

use crate::builder::{MachineDefinition, Registry, StateNode, TransitionDef};
use crate::core::Event;
use crate::effects::{self, Teardown};
use crate::error::MachineError;
use crate::machine::{create_machine, MachineBlueprint};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

state_enum! {
    pub enum TimerState {
        Running,
        Paused,
    }
}

/// All values are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerContext {
    pub elapsed: f64,
    pub duration: f64,
    /// Period between ticks, also the amount each tick adds.
    pub interval: f64,
}

impl Default for TimerContext {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            duration: 5.0,
            interval: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimerEvent {
    Tick,
    DurationUpdate(f64),
    Reset,
}

impl Event for TimerEvent {
    fn kind(&self) -> &str {
        match self {
            Self::Tick => "TICK",
            Self::DurationUpdate(_) => "DURATION.UPDATE",
            Self::Reset => "RESET",
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Gauge fill ratio in `[0, 1]`.
pub fn progress(context: &TimerContext) -> f64 {
    if context.elapsed >= context.duration {
        return 1.0;
    }
    (context.elapsed / context.duration).clamp(0.0, 1.0)
}

/// Elapsed over duration with one decimal, e.g. `"1.5s / 5.0s"`.
pub fn label(context: &TimerContext) -> String {
    format!("{:.1}s / {:.1}s", context.elapsed, context.duration)
}

pub fn definition() -> MachineDefinition<TimerState, TimerContext> {
    definition_with(TimerContext::default())
}

/// Timer definition starting from `context`.
pub fn definition_with(context: TimerContext) -> MachineDefinition<TimerState, TimerContext> {
    MachineDefinition::new("timer", TimerState::Running, context)
        .state(
            StateNode::new(TimerState::Running)
                .invoke("ticker")
                .always(TransitionDef::to(TimerState::Paused).guard("isFinished"))
                .on("TICK", TransitionDef::internal().action("advance")),
        )
        .state(
            StateNode::new(TimerState::Paused)
                .always(TransitionDef::to(TimerState::Running).guard("isUnfinished")),
        )
        .on(
            "DURATION.UPDATE",
            TransitionDef::internal().action("assignDuration"),
        )
        .on("RESET", TransitionDef::internal().action("resetElapsed"))
}

pub fn registry() -> Registry<TimerContext, TimerEvent> {
    Registry::<TimerContext, TimerEvent>::new()
        .guard("isFinished", |ctx: &TimerContext, _| {
            ctx.elapsed >= ctx.duration
        })
        .guard("isUnfinished", |ctx: &TimerContext, _| {
            ctx.elapsed < ctx.duration
        })
        .action("advance", |ctx: &mut TimerContext, _| {
            ctx.elapsed = round2(ctx.elapsed + ctx.interval);
        })
        .action("assignDuration", |ctx: &mut TimerContext, event| {
            if let Some(TimerEvent::DurationUpdate(duration)) = event {
                ctx.duration = *duration;
            }
        })
        .action("resetElapsed", |ctx: &mut TimerContext, _| ctx.elapsed = 0.0)
        .effect(
            "ticker",
            effects::interval(
                |ctx: &TimerContext| effects::seconds(ctx.interval),
                || TimerEvent::Tick,
            ),
        )
}

pub fn machine(
) -> Result<Arc<MachineBlueprint<TimerState, TimerContext, TimerEvent>>, MachineError> {
    machine_with(TimerContext::default())
}

pub fn machine_with(
    context: TimerContext,
) -> Result<Arc<MachineBlueprint<TimerState, TimerContext, TimerEvent>>, MachineError> {
    create_machine(definition_with(context), registry())
}

/// Registry with the ticker replaced by a no-op, for driving ticks by hand.
pub fn manual_registry() -> Registry<TimerContext, TimerEvent> {
    registry().effect("ticker", |_: &TimerContext, _| Teardown::noop())
}
