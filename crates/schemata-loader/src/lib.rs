//! Schema source loading
//!
//! This crate handles:
//! - Decoding XML table/type declarations into generic fragment records
//! - Decoding semicolon-delimited CSV codelists
//! - Discovering both under a schema directory

pub mod codelist;
pub mod error;
pub mod fragment;
pub mod loader;

pub use codelist::{clean_csv, decode_codelist};
pub use error::LoadError;
pub use fragment::{decode_fragments, Fragment, Record};
pub use loader::{FragmentLoader, SchemaSources};
