//! Core type definitions with validation.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing core types from raw input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid split mode value.
    #[error("invalid split mode: {value} (expected equal, percent or amount)")]
    UnknownSplitMode { value: String },
}

/// How an expense total is divided among participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Divide evenly; the last participant absorbs the rounding remainder.
    #[default]
    Equal,
    /// Divide by user-specified percentages summing to 100.
    Percent,
    /// Divide by user-specified fixed amounts summing to the total.
    Amount,
}

impl SplitMode {
    /// String representation used on the command line and in config files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percent => "percent",
            Self::Amount => "amount",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SplitMode {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "percent" => Ok(Self::Percent),
            "amount" => Ok(Self::Amount),
            _ => Err(InvalidInput::UnknownSplitMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, InvalidInput> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(InvalidInput::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidInput;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated participant (person) identifier.
    ParticipantId, "participant ID"
);

define_string_id!(
    /// A validated expense (entry) identifier.
    ExpenseId, "expense ID"
);

define_string_id!(
    /// A validated group identifier.
    GroupId, "group ID"
);

/// Someone who may receive a share of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// The expense an allocation session divides.
///
/// `name` seeds the default line-item description; `group_id` is what a
/// participant source resolves eligible members from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseContext {
    pub expense_id: ExpenseId,
    pub name: String,
    pub total_amount: Decimal,
    pub group_id: Option<GroupId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_rejects_empty() {
        assert!(ParticipantId::new("").is_err());
        assert!(ParticipantId::new("   ").is_err());
        assert!(ParticipantId::new("alice").is_ok());
    }

    #[test]
    fn expense_id_serde_roundtrip() {
        let id = ExpenseId::new("entry-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"entry-1\"");
        let parsed: ExpenseId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn participant_id_serde_rejects_empty() {
        let result: Result<ParticipantId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn empty_id_error_names_field() {
        let err = GroupId::new("").unwrap_err();
        assert_eq!(err.to_string(), "group ID cannot be empty");
    }

    #[test]
    fn split_mode_from_str() {
        assert_eq!("equal".parse::<SplitMode>().unwrap(), SplitMode::Equal);
        assert_eq!("percent".parse::<SplitMode>().unwrap(), SplitMode::Percent);
        assert_eq!("amount".parse::<SplitMode>().unwrap(), SplitMode::Amount);
        let err = "shares".parse::<SplitMode>().unwrap_err();
        assert!(err.to_string().contains("shares"));
    }

    #[test]
    fn split_mode_serde_uses_lowercase() {
        let json = serde_json::to_string(&SplitMode::Percent).unwrap();
        assert_eq!(json, "\"percent\"");
        let parsed: SplitMode = serde_json::from_str("\"amount\"").unwrap();
        assert_eq!(parsed, SplitMode::Amount);
    }

    #[test]
    fn split_mode_defaults_to_equal() {
        assert_eq!(SplitMode::default(), SplitMode::Equal);
        assert_eq!(SplitMode::default().to_string(), "equal");
    }
}
