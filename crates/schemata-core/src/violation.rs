//! Naming-convention violations
//!
//! IMPORTANT: Violation codes are versioned and stable.
//! NEVER rename or remove codes - downstream reports match on them.

use serde::{Deserialize, Serialize};

/// Violation code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    /// Value is not a valid SQL identifier
    InvalidSqlIdentifier,

    /// Value is not UpperCamelCase
    InvalidUpperCamelCase,

    /// Value is not lowerCamelCase
    InvalidLowerCamelCase,
}

impl ViolationCode {
    /// Get the violation code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSqlIdentifier => "INVALID_SQL_IDENTIFIER",
            Self::InvalidUpperCamelCase => "INVALID_UPPER_CAMEL_CASE",
            Self::InvalidLowerCamelCase => "INVALID_LOWER_CAMEL_CASE",
        }
    }

    /// Human-readable message for an offending value
    pub fn message_for(&self, value: &str) -> String {
        match self {
            Self::InvalidSqlIdentifier => {
                format!("The string \"{}\" should be valid SQL Identifier", value)
            }
            Self::InvalidUpperCamelCase => {
                format!("The string \"{}\" should be UpperCamelCase", value)
            }
            Self::InvalidLowerCamelCase => {
                format!("The string \"{}\" should be lowerCamelCase", value)
            }
        }
    }
}

impl std::fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single failed naming rule on an entity or column property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable violation code
    pub code: ViolationCode,

    /// Property the rule was applied to (`name` or `alias`)
    pub property: String,

    /// Offending value
    pub value: String,

    /// Human-readable message
    pub message: String,
}

impl Violation {
    pub fn new(code: ViolationCode, property: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            code,
            property: property.into(),
            message: code.message_for(&value),
            value,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.property, self.message)
    }
}
