//! Tables, columns, tags and codelists

use crate::issue::Issue;
use crate::violation::Violation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name prefix of tables synthesized from codelists
pub const CODELIST_TABLE_PREFIX: &str = "codelist__";

/// Name of the table a codelist is materialized as (or referenced through)
pub fn codelist_table_name(codelist: &str) -> String {
    format!("{}{}", CODELIST_TABLE_PREFIX, codelist)
}

/// A tag attached to a table or column
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A column (field) of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within the owning table
    pub name: String,

    /// Declared type, free text until a backend normalizes it
    #[serde(rename = "type")]
    pub column_type: Option<String>,

    pub label: Option<String>,

    pub doc: Option<String>,

    /// Raw `table.column` reference
    pub foreign_key: Option<String>,

    /// Table this column points at, derived from the foreign key or codelist
    pub foreign_table: Option<String>,

    /// Referenced codelist
    pub codelist: Option<String>,

    pub alias: Option<String>,

    pub unique: bool,

    /// True for system-injected columns
    pub generated: bool,

    /// Custom `@p:` properties
    pub properties: BTreeMap<String, String>,

    pub tags: Vec<Tag>,

    pub violations: Vec<Violation>,

    pub issues: Vec<Issue>,
}

impl Column {
    /// Create a bare column with no type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: None,
            label: None,
            doc: None,
            foreign_key: None,
            foreign_table: None,
            codelist: None,
            alias: None,
            unique: false,
            generated: false,
            properties: BTreeMap::new(),
            tags: Vec::new(),
            violations: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Set the declared type
    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Set the alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set uniqueness
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Mark as system generated
    pub fn with_generated(mut self, generated: bool) -> Self {
        self.generated = generated;
        self
    }

    /// Record a foreign key.
    ///
    /// Only a two-segment `table.column` reference yields a foreign table.
    pub fn set_foreign_key(&mut self, foreign_key: impl Into<String>) {
        let foreign_key = foreign_key.into();
        let segments: Vec<&str> = foreign_key.split('.').collect();
        if segments.len() == 2 {
            self.foreign_table = Some(segments[0].to_string());
        }
        self.foreign_key = Some(foreign_key);
    }

    /// Link to a codelist, rewriting the type to `codelist`
    pub fn set_codelist(&mut self, codelist: impl Into<String>) {
        let codelist = codelist.into();
        self.column_type = Some("codelist".to_string());
        self.foreign_table = Some(codelist_table_name(&codelist));
        self.codelist = Some(codelist);
    }

    /// Attach a tag; returns false if a tag of that name is already present
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.tags.iter().any(|t| t.name == tag.name) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn add_violations(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn clean_up_violations(&mut self) {
        self.violations.clear();
    }

    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    /// Whether this column carries violations or manual issues
    pub fn has_issues(&self) -> bool {
        !self.violations.is_empty() || !self.issues.is_empty()
    }
}

/// A table (type) assembled from one or more fragments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,

    pub alias: Option<String>,

    /// Columns in insertion order
    pub columns: Vec<Column>,

    pub tags: Vec<Tag>,

    /// Custom `@p:` properties
    pub properties: BTreeMap<String, String>,

    pub violations: Vec<Violation>,

    pub issues: Vec<Issue>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            columns: Vec::new(),
            tags: Vec::new(),
            properties: BTreeMap::new(),
            violations: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Set the alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn find_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Append a column unless one with the same name exists (first wins).
    ///
    /// Returns whether the column was added.
    pub fn add_column(&mut self, column: Column) -> bool {
        if self.has_column(&column.name) {
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Attach a tag; returns false if a tag of that name is already present
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(&tag.name) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    pub fn add_violations(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    /// Drop this table's own violations (columns are untouched)
    pub fn clean_up_violations(&mut self) {
        self.violations.clear();
    }

    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    /// Total automatic violations on the table and all its columns
    pub fn violation_count(&self) -> usize {
        self.violations.len() + self.columns.iter().map(|c| c.violations.len()).sum::<usize>()
    }

    /// Percentage of non-generated columns carrying an alias
    pub fn column_alias_percentage(&self) -> u32 {
        let declared: Vec<&Column> = self.columns.iter().filter(|c| !c.generated).collect();
        if declared.is_empty() {
            return 100;
        }
        let aliased = declared.iter().filter(|c| c.alias.is_some()).count();
        (100.0 * aliased as f64 / declared.len() as f64).round() as u32
    }

    /// Badge class for the alias coverage
    pub fn column_alias_class(&self) -> &'static str {
        match self.column_alias_percentage() {
            0 => "secondary",
            100 => "success",
            _ => "warning",
        }
    }
}

/// One codelist row, keyed by CSV header
pub type CodelistItem = BTreeMap<String, String>;

/// A named ordered list of code/label rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codelist {
    pub name: String,

    pub items: Vec<CodelistItem>,
}

impl Codelist {
    pub fn new(name: impl Into<String>, items: Vec<CodelistItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Codes in declaration order (rows without a `code` are skipped)
    pub fn codes(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| item.get("code").map(String::as_str))
            .collect()
    }

    /// Materialize as a two-column `codelist__<name>` table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(codelist_table_name(&self.name));
        table.add_column(Column::new("code").with_type("string").with_unique(true));
        table.add_column(Column::new("label").with_type("string"));
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_derivation() {
        let mut column = Column::new("order_id");
        column.set_foreign_key("orders.id");
        assert_eq!(column.foreign_table.as_deref(), Some("orders"));

        let mut column = Column::new("order_id");
        column.set_foreign_key("id");
        assert_eq!(column.foreign_table, None);
        assert_eq!(column.foreign_key.as_deref(), Some("id"));
    }

    #[test]
    fn codelist_rewrites_type() {
        let mut column = Column::new("country").with_type("varchar(2)");
        column.set_codelist("countries");

        assert_eq!(column.column_type.as_deref(), Some("codelist"));
        assert_eq!(column.foreign_table.as_deref(), Some("codelist__countries"));
        assert_eq!(column.codelist.as_deref(), Some("countries"));
    }

    #[test]
    fn first_column_wins() {
        let mut table = Table::new("users");
        assert!(table.add_column(Column::new("name").with_type("string")));
        assert!(!table.add_column(Column::new("name").with_type("text")));

        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.find_column("name").unwrap().column_type.as_deref(), Some("string"));
    }

    #[test]
    fn alias_percentage() {
        let mut table = Table::new("users");
        assert_eq!(table.column_alias_percentage(), 100);

        table.add_column(Column::new("id").with_generated(true));
        table.add_column(Column::new("first_name").with_alias("firstName"));
        table.add_column(Column::new("last_name"));
        table.add_column(Column::new("email"));

        assert_eq!(table.column_alias_percentage(), 33);
        assert_eq!(table.column_alias_class(), "warning");
    }

    #[test]
    fn codelist_as_table() {
        let codelist = Codelist::new("countries", Vec::new());
        let table = codelist.to_table();

        assert_eq!(table.name, "codelist__countries");
        assert_eq!(table.column_names(), vec!["code", "label"]);
        assert!(table.find_column("code").unwrap().unique);
        assert!(!table.find_column("label").unwrap().unique);
    }
}
