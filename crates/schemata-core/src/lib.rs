//! Schemata Core
//!
//! Domain model for hydrated schemas: entities, codelists, issues,
//! naming validators and the schema graph that owns them.
//! Violation codes are part of the public API - never rename them.

pub mod config;
pub mod entity;
pub mod error;
pub mod issue;
pub mod property;
pub mod report;
pub mod schema;
pub mod validator;
pub mod violation;

pub use config::{AliasWhitelist, Config, ConfigError, PropertyOptions};
pub use entity::{codelist_table_name, Codelist, CodelistItem, Column, Table, Tag, CODELIST_TABLE_PREFIX};
pub use error::SchemaError;
pub use issue::{Issue, IssueParent, IssueStatus, Note};
pub use property::{PropertyClass, PropertyDefinition};
pub use report::{ReportVersion, ValidationReport};
pub use schema::{IssueBuckets, IssueRef, Schema, TableId};
pub use validator::{IdentifierRule, LowerCamelCase, SqlIdentifier, UpperCamelCase, ValidationRules, Validator};
pub use violation::{Violation, ViolationCode};
