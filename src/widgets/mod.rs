//! The four reference widgets, each a definition plus its registry.
//!
//! - [`counter`]: increment and a guarded decrement
//! - [`flight_booker`]: cross-field date constraints and a final state
//! - [`temperature`]: two fields converted into each other
//! - [`timer`]: an interval effect with automatic pause and resume

pub mod counter;
pub mod flight_booker;
pub mod temperature;
pub mod timer;
