//! Fatal structural errors
//!
//! These abort a hydration pass. Naming problems are never reported here;
//! they are recorded as [`Violation`](crate::Violation)s on the entity.

/// Schema graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Table duplication: \"{0}\"")]
    DuplicateEntity(String),

    #[error("Codelist duplication: \"{0}\"")]
    DuplicateCodelist(String),

    #[error("Missing required \"@name\" attribute in {context}")]
    MissingName { context: String },

    #[error("Table does not exist: \"{0}\"")]
    UnknownEntity(String),

    #[error("Can't map class name: \"{0}\"")]
    UnknownPropertyClass(String),
}
