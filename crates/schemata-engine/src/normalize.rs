//! Type normalization for output backends
//!
//! Each backend owns a [`TypeTable`] mapping folded column types to its own
//! vocabulary. A type missing from the table is an error for that build;
//! hydration is never affected.

use schemata_core::{codelist_table_name, Column, Schema, Table};
use serde::Serialize;
use std::collections::BTreeMap;

/// Backend-normalization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Unknown type '{raw}' (folded '{folded}') for {table}.{column} in {backend} backend")]
    UnknownType {
        backend: String,
        table: String,
        column: String,
        raw: String,
        folded: String,
    },
}

/// Fold parameterized types onto their base key.
///
/// `varchar(255)` becomes `varchar`, `enum(...)` becomes `enum` and any
/// `int*` becomes `int`. An absent type folds to the empty key.
pub fn fold_type(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default();
    ["varchar", "enum", "int"]
        .into_iter()
        .find(|prefix| raw.starts_with(prefix))
        .unwrap_or(raw)
        .to_string()
}

/// Name of the single artifact in bundle mode
pub const BUNDLE_NAME: &str = "schema";

/// Types that every backend maps onto its string type
const STRING_TYPES: [&str; 21] = [
    "date", "price", "datetime", "password", "uuid", "email", "mobile", "phone", "fax", "code",
    "weight", "money", "blob", "null", "color", "text", "string", "usergroup", "varchar", "enum", "",
];

/// A backend's mapping from folded types to target types
pub trait TypeTable {
    /// Backend name used in error messages
    fn name(&self) -> &'static str;

    fn lookup(&self, folded: &str) -> Option<&'static str>;

    /// Lookup key for a column
    fn column_type_key(&self, column: &Column) -> String {
        fold_type(column.column_type.as_deref())
    }

    /// Resolve a column's target type
    fn normalize(&self, table: &str, column: &Column) -> Result<&'static str, NormalizeError> {
        let folded = self.column_type_key(column);
        self.lookup(&folded).ok_or_else(|| NormalizeError::UnknownType {
            backend: self.name().to_string(),
            table: table.to_string(),
            column: column.name.clone(),
            raw: column.column_type.clone().unwrap_or_default(),
            folded,
        })
    }
}

/// GraphQL scalar types
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQlTypes;

impl TypeTable for GraphQlTypes {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn lookup(&self, folded: &str) -> Option<&'static str> {
        match folded {
            "double" => Some("Float"),
            "boolean" | "bool" => Some("Boolean"),
            "stamp" | "int" => Some("Int"),
            "id" => Some("ID"),
            t if STRING_TYPES.contains(&t) => Some("String"),
            _ => None,
        }
    }

    /// The primary key is always an `ID`
    fn column_type_key(&self, column: &Column) -> String {
        if column.name == "id" {
            return "id".to_string();
        }
        fold_type(column.column_type.as_deref())
    }
}

/// Plain data-context types (`integer` / `string`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextTypes;

impl TypeTable for ContextTypes {
    fn name(&self) -> &'static str {
        "context"
    }

    fn lookup(&self, folded: &str) -> Option<&'static str> {
        match folded {
            "stamp" | "int" => Some("integer"),
            "double" | "boolean" | "bool" | "id" => Some("string"),
            t if STRING_TYPES.contains(&t) => Some("string"),
            _ => None,
        }
    }
}

/// A plain column in backend terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub name: String,

    /// Label, or the upper-cased column name
    pub description: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
}

/// A foreign-key or codelist column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceMap {
    /// `<column>_ref`
    pub name: String,

    pub local: String,

    /// `table.column` on the other side
    pub remote: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
}

/// One table in backend terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMap {
    /// Fields in column order
    pub fields: Vec<FieldMap>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceMap>,
}

impl EntityMap {
    fn build(table: &Table, types: &dyn TypeTable) -> Result<Self, NormalizeError> {
        let mut entity = EntityMap {
            fields: Vec::new(),
            references: Vec::new(),
        };

        for column in &table.columns {
            if let Some(remote) = reference_target(column) {
                entity.references.push(ReferenceMap {
                    name: format!("{}_ref", column.name),
                    local: column.name.clone(),
                    remote,
                    reverse: column.foreign_table.as_ref().map(|t| format!("{}_reverse", t)),
                });
                continue;
            }

            entity.fields.push(FieldMap {
                name: column.name.clone(),
                description: column.label.clone().unwrap_or_else(|| column.name.to_uppercase()),
                field_type: types.normalize(&table.name, column)?.to_string(),
                unique: column.unique,
            });
        }

        Ok(entity)
    }

    /// Render as a GraphQL `type` block
    pub fn render_graphql_type(&self, name: &str) -> String {
        let mut output = format!("type {} {{\n", name);
        for field in &self.fields {
            output.push_str(&format!("  {}: {}\n", field.name, field.field_type));
        }
        for reference in &self.references {
            output.push_str(&format!("  {}: {}\n", reference.name, reference.remote));
        }
        output.push_str("}\n");
        output
    }
}

fn reference_target(column: &Column) -> Option<String> {
    if let Some(foreign_key) = &column.foreign_key {
        return Some(foreign_key.clone());
    }
    column
        .codelist
        .as_ref()
        .map(|codelist| format!("{}.code", codelist_table_name(codelist)))
}

/// Every table of a schema mapped through one backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaMap {
    /// Table name -> mapping, sorted by name
    pub types: BTreeMap<String, EntityMap>,
}

impl SchemaMap {
    /// Map every table; the first unknown type aborts the build
    pub fn build(schema: &Schema, types: &dyn TypeTable) -> Result<Self, NormalizeError> {
        let mut map = SchemaMap::default();

        for table in schema.tables_sorted() {
            map.types.insert(table.name.clone(), EntityMap::build(table, types)?);
        }

        tracing::debug!(backend = types.name(), types = map.types.len(), "schema mapped");
        Ok(map)
    }

    pub fn get(&self, name: &str) -> Option<&EntityMap> {
        self.types.get(name)
    }

    /// GraphQL SDL: one `(name, text)` per table, or a single
    /// [`BUNDLE_NAME`] entry with blocks separated by a blank line.
    pub fn to_graphql_sdl(&self, bundle: bool) -> Vec<(String, String)> {
        let rendered = self
            .types
            .iter()
            .map(|(name, entity)| (name.clone(), entity.render_graphql_type(name)));

        if bundle {
            let blocks: Vec<String> = rendered.map(|(_, text)| text).collect();
            vec![(BUNDLE_NAME.to_string(), blocks.join("\n"))]
        } else {
            rendered.collect()
        }
    }
}
