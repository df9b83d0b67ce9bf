//! Events and context data.

use std::fmt::Debug;

/// An event fed to a machine.
///
/// Events are tagged values: `kind` is the tag the transition table is
/// keyed by, the variant carries the payload.
///
/// # Example
///
/// ```rust
/// use widget_machines::core::Event;
///
/// #[derive(Clone, Debug)]
/// enum DoorEvent {
///     Open,
///     Label(String),
/// }
///
/// impl Event for DoorEvent {
///     fn kind(&self) -> &str {
///         match self {
///             Self::Open => "OPEN",
///             Self::Label(_) => "LABEL",
///         }
///     }
/// }
///
/// assert_eq!(DoorEvent::Label("front".into()).kind(), "LABEL");
/// ```
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// The event type used for transition lookup.
    fn kind(&self) -> &str;
}

/// Data owned by one machine instance.
///
/// Blanket-implemented for every type with the required bounds. `PartialEq`
/// lets a dry run report whether a step would change anything.
pub trait Context: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> Context for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}
