//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A stored or configured string did not name a known variant.
    #[error("invalid {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },

    /// A ratio or score was outside \[0.0, 1.0\] or NaN.
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    /// A load percentage was outside \[0.0, 100.0\] or NaN.
    #[error("load percentage must be between 0 and 100, got {value}")]
    LoadOutOfRange { value: f64 },
}

/// Generates a closed string enum with storage/display conversions.
///
/// The string forms are part of the on-disk format, so they are spelled out
/// per variant rather than derived.
macro_rules! define_string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// String representation for database storage.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ValidationError::UnknownVariant {
                        field: $field_name,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }
    };
}

define_string_enum!(
    /// What kind of application a foreground window belongs to.
    Category, "category" {
        Work => "Work",
        Distraction => "Distraction",
        Neutral => "Neutral",
    }
);

define_string_enum!(
    /// Whether the machine was in use when a sample was taken.
    ActivityStatus, "status" {
        Active => "Active",
        Idle => "Idle",
    }
);

define_string_enum!(
    /// Burnout risk band derived from the burnout index.
    ///
    /// The index measures health, so a high index means low risk.
    StatusBand, "status band" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
);

impl ActivityStatus {
    /// Derives the status from a load reading.
    ///
    /// Loads strictly below `idle_threshold` count as idle.
    pub fn from_load(load_pct: f64, idle_threshold: f64) -> Self {
        if load_pct < idle_threshold {
            Self::Idle
        } else {
            Self::Active
        }
    }
}

/// Returns `value` if it lies within \[0.0, 1.0\].
pub fn unit_interval(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfUnitRange { field, value });
    }
    Ok(value)
}

/// Clamps `value` into \[0.0, 1.0\]; NaN becomes 0.0.
#[must_use]
pub const fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else if value > 1.0 {
        1.0
    } else {
        value
    }
}
