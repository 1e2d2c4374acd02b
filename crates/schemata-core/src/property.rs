//! Custom property definitions

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Schema element classes a property can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyClass {
    Schema,
    Type,
    Field,
}

impl PropertyClass {
    /// Map a class name (case-insensitive, trimmed)
    pub fn from_name(name: &str) -> Result<Self, SchemaError> {
        match name.trim().to_uppercase().as_str() {
            "SCHEMA" => Ok(Self::Schema),
            "TYPE" => Ok(Self::Type),
            "FIELD" => Ok(Self::Field),
            other => Err(SchemaError::UnknownPropertyClass(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "SCHEMA",
            Self::Type => "TYPE",
            Self::Field => "FIELD",
        }
    }
}

/// Declares a custom property name and where it may be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,

    pub localized: bool,

    pub indexed: bool,

    pub classes: BTreeSet<PropertyClass>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            localized: false,
            indexed: false,
            classes: BTreeSet::new(),
        }
    }

    pub fn has_class(&self, class: PropertyClass) -> bool {
        self.classes.contains(&class)
    }

    /// Comma-separated class names, e.g. `TYPE, FIELD`
    pub fn classes_as_string(&self) -> String {
        self.classes
            .iter()
            .map(PropertyClass::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
