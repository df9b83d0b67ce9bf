//! Counter: one state, an increment and a guarded decrement.
//!
//! The definition ships as JSON and is loaded through
//! [`MachineDefinition::from_json`].

use crate::builder::{MachineDefinition, Registry};
use crate::core::Event;
use crate::error::MachineError;
use crate::machine::{create_machine, MachineBlueprint};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

state_enum! {
    pub enum CounterState {
        Active,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterContext {
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CounterEvent {
    Increment,
    Decrease,
}

impl Event for CounterEvent {
    fn kind(&self) -> &str {
        match self {
            Self::Increment => "INCREMENT",
            Self::Decrease => "DECREASE",
        }
    }
}

const DEFINITION: &str = r#"{
    "id": "counter",
    "initial": "Active",
    "context": { "count": 0 },
    "states": [
        {
            "state": "Active",
            "on": {
                "INCREMENT": [
                    { "actions": ["increaseCounter"] }
                ],
                "DECREASE": [
                    { "guard": "isGreaterThanZero", "actions": ["decreaseCounter"] }
                ]
            }
        }
    ]
}"#;

pub fn definition() -> Result<MachineDefinition<CounterState, CounterContext>, MachineError> {
    MachineDefinition::from_json(DEFINITION)
}

pub fn registry() -> Registry<CounterContext, CounterEvent> {
    Registry::<CounterContext, CounterEvent>::new()
        .guard("isGreaterThanZero", |ctx: &CounterContext, _| ctx.count > 0)
        .action("increaseCounter", |ctx: &mut CounterContext, _| {
            ctx.count = ctx.count.saturating_add(1);
        })
        .action("decreaseCounter", |ctx: &mut CounterContext, _| ctx.count -= 1)
}

pub fn machine() -> Result<Arc<MachineBlueprint<CounterState, CounterContext, CounterEvent>>, MachineError> {
    create_machine(definition()?, registry())
}
