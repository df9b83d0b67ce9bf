//! Macros for ergonomic machine construction.

/// Generate a `State` implementation for a plain enum.
///
/// Each variant's name is its identifier. Variants listed under `final:`
/// are terminal.
///
/// # Example
///
/// ```
/// use widget_machines::state_enum;
/// use widget_machines::core::State;
///
/// state_enum! {
///     pub enum BookingState {
///         Editing,
///         Submitted,
///     }
///     final: [Submitted]
/// }
///
/// assert_eq!(BookingState::Editing.name(), "Editing");
/// assert!(BookingState::Submitted.is_final());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}
