//! Flight Booker: constraints between a trip type and two dates.
//!
//! `Editing` accepts field updates unconditionally and a trip type only
//! when it is a known value. `SUBMIT` moves to the final `Submitted` state
//! when the start date is a valid `YYYY-MM-DD` date and, for round trips,
//! the return date is valid and strictly after it.

use crate::builder::{MachineDefinition, Registry, StateNode, TransitionDef};
use crate::core::Event;
use crate::error::MachineError;
use crate::interpreter::Interpreter;
use crate::machine::{create_machine, MachineBlueprint};
use crate::state_enum;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

state_enum! {
    pub enum BookingState {
        Editing,
        Submitted,
    }
    final: [Submitted]
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trip {
    #[default]
    OneWay,
    RoundTrip,
}

impl Trip {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trip::OneWay => "oneWay",
            Trip::RoundTrip => "roundTrip",
        }
    }
}

impl fmt::Display for Trip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trip type '{0}'")]
pub struct UnknownTrip(pub String);

impl FromStr for Trip {
    type Err = UnknownTrip;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "oneWay" => Ok(Trip::OneWay),
            "roundTrip" => Ok(Trip::RoundTrip),
            other => Err(UnknownTrip(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingContext {
    pub start_date: Option<String>,
    pub return_date: Option<String>,
    pub trip: Trip,
}

/// Events carry raw field values; the trip type is validated by a guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingEvent {
    SetTrip(String),
    StartDate(String),
    ReturnDate(String),
    Submit,
}

impl Event for BookingEvent {
    fn kind(&self) -> &str {
        match self {
            Self::SetTrip(_) => "SET_TRIP",
            Self::StartDate(_) => "startDate.UPDATE",
            Self::ReturnDate(_) => "returnDate.UPDATE",
            Self::Submit => "SUBMIT",
        }
    }
}

/// Parse a `YYYY-MM-DD` field.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Whether `context` describes a bookable flight.
pub fn is_bookable(context: &BookingContext) -> bool {
    let start = context.start_date.as_deref().and_then(parse_date);
    match context.trip {
        Trip::OneWay => start.is_some(),
        Trip::RoundTrip => {
            let back = context.return_date.as_deref().and_then(parse_date);
            matches!((start, back), (Some(start), Some(back)) if back > start)
        }
    }
}

pub fn definition() -> MachineDefinition<BookingState, BookingContext> {
    MachineDefinition::new("flight", BookingState::Editing, BookingContext::default())
        .state(
            StateNode::new(BookingState::Editing)
                .on(
                    "startDate.UPDATE",
                    TransitionDef::internal().action("assignStartDate"),
                )
                .on(
                    "returnDate.UPDATE",
                    TransitionDef::internal().action("assignReturnDate"),
                )
                .on(
                    "SET_TRIP",
                    TransitionDef::internal()
                        .guard("isKnownTrip")
                        .action("assignTrip"),
                )
                .on(
                    "SUBMIT",
                    TransitionDef::to(BookingState::Submitted).guard("isBookable"),
                ),
        )
        .state(StateNode::new(BookingState::Submitted))
}

pub fn registry() -> Registry<BookingContext, BookingEvent> {
    Registry::<BookingContext, BookingEvent>::new()
        .guard("isKnownTrip", |_, event: Option<&BookingEvent>| {
            matches!(event, Some(BookingEvent::SetTrip(value)) if value.parse::<Trip>().is_ok())
        })
        .guard("isBookable", |ctx: &BookingContext, _| is_bookable(ctx))
        .action("assignStartDate", |ctx: &mut BookingContext, event| {
            if let Some(BookingEvent::StartDate(value)) = event {
                ctx.start_date = Some(value.clone());
            }
        })
        .action("assignReturnDate", |ctx: &mut BookingContext, event| {
            if let Some(BookingEvent::ReturnDate(value)) = event {
                ctx.return_date = Some(value.clone());
            }
        })
        .action("assignTrip", |ctx: &mut BookingContext, event| {
            if let Some(BookingEvent::SetTrip(value)) = event {
                if let Ok(trip) = value.parse() {
                    ctx.trip = trip;
                }
            }
        })
}

pub fn machine(
) -> Result<Arc<MachineBlueprint<BookingState, BookingContext, BookingEvent>>, MachineError> {
    create_machine(definition(), registry())
}

/// Whether the submit control should be enabled right now.
pub fn can_submit(
    booker: &Interpreter<BookingState, BookingContext, BookingEvent>,
) -> Result<bool, MachineError> {
    booker.can(&BookingEvent::Submit)
}

/// Confirmation shown once a flight is booked, `None` before that.
pub fn confirmation(context: &BookingContext) -> Option<String> {
    let start = context.start_date.as_deref().and_then(parse_date)?;
    match context.trip {
        Trip::OneWay => Some(format!(
            "You have booked a one-way flight on {}.",
            start.format("%d.%m.%Y")
        )),
        Trip::RoundTrip => {
            let back = context.return_date.as_deref().and_then(parse_date)?;
            Some(format!(
                "You have booked a return flight on {}, returning {}.",
                start.format("%d.%m.%Y"),
                back.format("%d.%m.%Y")
            ))
        }
    }
}
