//! Temperature Converter: two text fields kept in sync.
//!
//! Each input event stores the raw text in its own field and writes the
//! converted value into the other one. Text that is not a finite number
//! clears the other field instead of leaving a stale value behind.

use crate::builder::{MachineDefinition, Registry, StateNode, TransitionDef};
use crate::core::Event;
use crate::error::MachineError;
use crate::machine::{create_machine, MachineBlueprint};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

state_enum! {
    pub enum ConverterState {
        Active,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterContext {
    pub celsius: String,
    pub fahrenheit: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConverterEvent {
    Celsius(String),
    Fahrenheit(String),
}

impl Event for ConverterEvent {
    fn kind(&self) -> &str {
        match self {
            Self::Celsius(_) => "CELSIUS",
            Self::Fahrenheit(_) => "FAHRENHEIT",
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Parse user input; surrounding whitespace is ignored.
pub fn parse_temperature(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Shortest text that reads back as `value`. Negative zero prints as `0`.
pub fn format_temperature(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

fn convert(input: &str, conversion: fn(f64) -> f64) -> String {
    parse_temperature(input)
        .map(|value| format_temperature(conversion(value)))
        .unwrap_or_default()
}

pub fn definition() -> MachineDefinition<ConverterState, ConverterContext> {
    MachineDefinition::new(
        "temperature",
        ConverterState::Active,
        ConverterContext::default(),
    )
    .state(
        StateNode::new(ConverterState::Active)
            .on("CELSIUS", TransitionDef::internal().action("onCelsius"))
            .on("FAHRENHEIT", TransitionDef::internal().action("onFahrenheit")),
    )
}

pub fn registry() -> Registry<ConverterContext, ConverterEvent> {
    Registry::<ConverterContext, ConverterEvent>::new()
        .action("onCelsius", |ctx: &mut ConverterContext, event| {
            if let Some(ConverterEvent::Celsius(value)) = event {
                ctx.fahrenheit = convert(value, celsius_to_fahrenheit);
                ctx.celsius = value.clone();
            }
        })
        .action("onFahrenheit", |ctx: &mut ConverterContext, event| {
            if let Some(ConverterEvent::Fahrenheit(value)) = event {
                ctx.celsius = convert(value, fahrenheit_to_celsius);
                ctx.fahrenheit = value.clone();
            }
        })
}

pub fn machine(
) -> Result<Arc<MachineBlueprint<ConverterState, ConverterContext, ConverterEvent>>, MachineError>
{
    create_machine(definition(), registry())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::interpret;

    #[test]
    fn freezing_point_both_ways() {
        let converter = interpret(machine().unwrap()).unwrap();

        let snapshot = converter.send(ConverterEvent::Celsius("0".into())).unwrap();
        assert_eq!(snapshot.context.fahrenheit, "32");

        let snapshot = converter
            .send(ConverterEvent::Fahrenheit("32".into()))
            .unwrap();
        assert_eq!(snapshot.context.celsius, "0");
        assert_eq!(snapshot.context.fahrenheit, "32");
    }

    #[test]
    fn invalid_input_clears_the_other_field() {
        let converter = interpret(machine().unwrap()).unwrap();
        converter.send(ConverterEvent::Celsius("100".into())).unwrap();
        assert_eq!(converter.snapshot().context.fahrenheit, "212");

        let snapshot = converter.send(ConverterEvent::Celsius("abc".into())).unwrap();

        assert_eq!(snapshot.context.celsius, "abc");
        assert_eq!(snapshot.context.fahrenheit, "");
    }

    #[test]
    fn empty_input_clears_the_other_field() {
        let converter = interpret(machine().unwrap()).unwrap();
        converter
            .send(ConverterEvent::Fahrenheit("212".into()))
            .unwrap();
        assert_eq!(converter.snapshot().context.celsius, "100");

        let snapshot = converter.send(ConverterEvent::Fahrenheit(String::new())).unwrap();

        assert_eq!(snapshot.context, ConverterContext::default());
    }

    #[test]
    fn parsing_trims_and_rejects_non_finite() {
        assert_eq!(parse_temperature(" 21.5 "), Some(21.5));
        assert_eq!(parse_temperature("-40"), Some(-40.0));
        assert_eq!(parse_temperature("NaN"), None);
        assert_eq!(parse_temperature("inf"), None);
        assert_eq!(parse_temperature("   "), None);
    }

    #[test]
    fn formatting_is_shortest_round_trip() {
        assert_eq!(format_temperature(-0.0), "0");
        assert_eq!(format_temperature(32.0), "32");
        assert_eq!(format_temperature(-40.0), "-40");
        assert_eq!(format_temperature(celsius_to_fahrenheit(-40.0)), "-40");
        assert_eq!(format_temperature(0.5), "0.5");
    }
}
