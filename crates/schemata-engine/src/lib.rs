//! Schemata engine - Core business logic
//!
//! This crate implements the main business logic for Schemata:
//! - Hydration of raw fragments into a validated schema graph
//! - Structural diff between two schema graphs
//! - Type normalization for output backends

pub mod diff;
pub mod hydrate;
pub mod normalize;

pub use diff::{compare, Change, ChangeKind, SchemaDiff};
pub use hydrate::{hydrate, load_and_hydrate, HydrationError, Hydrator, SystemColumn, DEFAULT_COLUMN, EXTENDED_COLUMNS};
pub use normalize::{
    fold_type, ContextTypes, BUNDLE_NAME, EntityMap, FieldMap, GraphQlTypes, NormalizeError, ReferenceMap, SchemaMap, TypeTable,
};
