//! The schema graph
//!
//! Owns every table in an arena. The tag index and the issues index only
//! hold [`TableId`] handles into that arena, so a table mutated during
//! hydration is seen the same way through every index.

use crate::entity::{Codelist, Table};
use crate::error::SchemaError;
use crate::issue::{Issue, IssueParent};
use crate::property::{PropertyClass, PropertyDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle to a table owned by a [`Schema`].
///
/// A handle is only meaningful for the schema that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(usize);

/// A manual issue located in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRef<'a> {
    pub parent: &'a IssueParent,

    /// Position of the issue within its parent's issue list
    pub index: usize,

    pub issue: &'a Issue,
}

/// Manual issues split by lifecycle state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueBuckets<'a> {
    pub open: Vec<IssueRef<'a>>,
    pub closed: Vec<IssueRef<'a>>,
}

/// All hydrated tables, codelists and their derived indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Table arena, in insertion order
    tables: Vec<Table>,

    /// Table name -> handle
    table_index: BTreeMap<String, TableId>,

    codelists: BTreeMap<String, Codelist>,

    /// Tag name -> table name -> handle
    tagged_tables: BTreeMap<String, BTreeMap<String, TableId>>,

    /// Tables with violations or issues, in first-detection order
    tables_with_issues: Vec<TableId>,

    property_definitions: Vec<PropertyDefinition>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declared table; a duplicate name is an error
    pub fn add_table(&mut self, table: Table) -> Result<TableId, SchemaError> {
        if self.table_index.contains_key(&table.name) {
            return Err(SchemaError::DuplicateEntity(table.name));
        }
        Ok(self.insert_table(table))
    }

    /// Add a table synthesized from a codelist; a duplicate name is an error
    pub fn add_synthetic_table(&mut self, table: Table) -> Result<TableId, SchemaError> {
        if self.table_index.contains_key(&table.name) {
            return Err(SchemaError::DuplicateCodelist(table.name));
        }
        Ok(self.insert_table(table))
    }

    fn insert_table(&mut self, table: Table) -> TableId {
        let id = TableId(self.tables.len());
        self.table_index.insert(table.name.clone(), id);
        self.tables.push(table);
        id
    }

    /// Add a codelist; a duplicate name is an error
    pub fn add_codelist(&mut self, codelist: Codelist) -> Result<(), SchemaError> {
        if self.codelists.contains_key(&codelist.name) {
            return Err(SchemaError::DuplicateCodelist(codelist.name));
        }
        self.codelists.insert(codelist.name.clone(), codelist);
        Ok(())
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.table_index.get(name).copied()
    }

    /// Table behind a handle issued by this schema.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range, which only happens for a handle issued
    /// by another schema. A foreign handle that is in range resolves to
    /// whatever table sits at that slot; use [`Schema::try_table`] for handles
    /// of unknown origin.
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    /// Mutable counterpart of [`Schema::table`], with the same panic condition
    pub fn table_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id.0]
    }

    pub fn try_table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0)
    }

    /// Look up a table by name
    pub fn entity(&self, name: &str) -> Option<&Table> {
        self.table_id(name).map(|id| self.table(id))
    }

    /// Look up a table by name, failing when absent
    pub fn require_entity(&self, name: &str) -> Result<&Table, SchemaError> {
        self.entity(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    /// Tables in insertion order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Tables ordered by name
    pub fn tables_sorted(&self) -> impl Iterator<Item = &Table> {
        self.table_index.values().map(|id| self.table(*id))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Codelists ordered by name
    pub fn codelists(&self) -> impl Iterator<Item = &Codelist> {
        self.codelists.values()
    }

    pub fn codelist(&self, name: &str) -> Option<&Codelist> {
        self.codelists.get(name)
    }

    pub fn codelist_count(&self) -> usize {
        self.codelists.len()
    }

    /// Index a table under a tag; the first registration wins
    pub fn add_tagged_table(&mut self, tag: &str, id: TableId) {
        let name = self.table(id).name.clone();
        self.tagged_tables
            .entry(tag.to_string())
            .or_default()
            .entry(name)
            .or_insert(id);
    }

    /// All known tag names, sorted
    pub fn tags_all(&self) -> Vec<&str> {
        self.tagged_tables.keys().map(String::as_str).collect()
    }

    /// Tables carrying a tag, ordered by name
    pub fn tagged_tables(&self, tag: &str) -> Vec<&Table> {
        self.tagged_tables
            .get(tag)
            .map(|tables| tables.values().map(|id| self.table(*id)).collect())
            .unwrap_or_default()
    }

    /// Register a table in the issues index (idempotent)
    pub fn mark_with_issues(&mut self, id: TableId) {
        if !self.tables_with_issues.contains(&id) {
            self.tables_with_issues.push(id);
        }
    }

    /// Tables in the issues index, in first-detection order
    pub fn tables_with_issues(&self) -> Vec<&Table> {
        self.tables_with_issues.iter().map(|id| self.table(*id)).collect()
    }

    pub fn has_issues(&self) -> bool {
        !self.tables_with_issues.is_empty()
    }

    pub fn set_property_definitions(&mut self, definitions: Vec<PropertyDefinition>) {
        self.property_definitions = definitions;
    }

    pub fn property_definitions(&self) -> &[PropertyDefinition] {
        &self.property_definitions
    }

    /// Property definitions applicable to a class
    pub fn definitions_for(&self, class: PropertyClass) -> Vec<&PropertyDefinition> {
        self.property_definitions
            .iter()
            .filter(|d| d.has_class(class))
            .collect()
    }

    /// Split the manual issues of every indexed table into open and closed
    pub fn issues_by_state(&self) -> IssueBuckets<'_> {
        let mut buckets = IssueBuckets::default();

        for table in self.tables_with_issues() {
            let column_issues = table.columns.iter().flat_map(|c| c.issues.iter().enumerate());
            for (index, issue) in table.issues.iter().enumerate().chain(column_issues) {
                let entry = IssueRef {
                    parent: &issue.parent,
                    index,
                    issue,
                };
                if issue.is_open() {
                    buckets.open.push(entry);
                } else {
                    buckets.closed.push(entry);
                }
            }
        }

        buckets
    }

    /// Drop indices and violations so two graphs compare structurally.
    ///
    /// Tables, columns and their manual issues are kept.
    pub fn clean_up_for_diff(&mut self) {
        self.tagged_tables.clear();
        self.tables_with_issues.clear();

        for table in &mut self.tables {
            table.clean_up_violations();
            for column in &mut table.columns {
                column.clean_up_violations();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Column;
    use crate::issue::IssueStatus;
    use crate::violation::{Violation, ViolationCode};

    fn schema_with_users() -> (Schema, TableId) {
        let mut schema = Schema::new();
        let id = schema.add_table(Table::new("users")).unwrap();
        (schema, id)
    }

    #[test]
    fn handles_from_another_schema() {
        let mut big = Schema::new();
        big.add_table(Table::new("users")).unwrap();
        let orders = big.add_table(Table::new("orders")).unwrap();

        let mut small = Schema::new();
        small.add_table(Table::new("tags")).unwrap();

        assert_eq!(big.try_table(orders).map(|t| t.name.as_str()), Some("orders"));
        assert!(small.try_table(orders).is_none());
    }

    #[test]
    #[should_panic]
    fn foreign_handle_panics() {
        let mut big = Schema::new();
        big.add_table(Table::new("users")).unwrap();
        let orders = big.add_table(Table::new("orders")).unwrap();

        Schema::new().table(orders);
    }

    #[test]
    fn duplicate_table_rejected() {
        let (mut schema, _) = schema_with_users();
        assert_eq!(
            schema.add_table(Table::new("users")),
            Err(SchemaError::DuplicateEntity("users".to_string()))
        );
        assert_eq!(
            schema.add_synthetic_table(Table::new("users")),
            Err(SchemaError::DuplicateCodelist("users".to_string()))
        );
    }

    #[test]
    fn duplicate_codelist_rejected() {
        let mut schema = Schema::new();
        schema.add_codelist(Codelist::new("countries", Vec::new())).unwrap();
        assert!(schema.add_codelist(Codelist::new("countries", Vec::new())).is_err());
        assert_eq!(schema.codelist_count(), 1);
    }

    #[test]
    fn indices_see_mutations() {
        let (mut schema, id) = schema_with_users();
        schema.add_tagged_table("core", id);
        schema.mark_with_issues(id);

        schema.table_mut(id).add_column(Column::new("email"));

        assert!(schema.tagged_tables("core")[0].has_column("email"));
        assert!(schema.tables_with_issues()[0].has_column("email"));
    }

    #[test]
    fn mark_with_issues_is_idempotent() {
        let (mut schema, id) = schema_with_users();
        schema.mark_with_issues(id);
        schema.mark_with_issues(id);
        assert_eq!(schema.tables_with_issues().len(), 1);
    }

    #[test]
    fn clean_up_for_diff() {
        let (mut schema, id) = schema_with_users();
        let violation = Violation::new(ViolationCode::InvalidSqlIdentifier, "name", "1x");
        {
            let table = schema.table_mut(id);
            table.add_violations([violation.clone()]);
            table.add_column(Column::new("1x"));
            table.find_column_mut("1x").unwrap().add_violations([violation]);
            table.add_issues([Issue::new(IssueParent::table("users"))]);
        }
        schema.add_tagged_table("core", id);
        schema.mark_with_issues(id);

        schema.clean_up_for_diff();
        let once = schema.clone();
        schema.clean_up_for_diff();

        assert_eq!(schema, once);
        assert!(schema.tags_all().is_empty());
        assert!(!schema.has_issues());
        let users = schema.entity("users").unwrap();
        assert_eq!(users.violation_count(), 0);
        assert_eq!(users.issues.len(), 1);
    }

    #[test]
    fn issues_by_state() {
        let (mut schema, id) = schema_with_users();
        {
            let table = schema.table_mut(id);
            table.add_column(Column::new("email"));
            table.add_issues([Issue::new(IssueParent::table("users")).with_status(IssueStatus::Closed)]);
            table
                .find_column_mut("email")
                .unwrap()
                .add_issues([Issue::new(IssueParent::column("users", "email"))]);
        }
        schema.mark_with_issues(id);

        let buckets = schema.issues_by_state();
        assert_eq!(buckets.closed.len(), 1);
        assert_eq!(buckets.open.len(), 1);
        assert_eq!(buckets.open[0].parent, &IssueParent::column("users", "email"));
        assert_eq!(buckets.open[0].index, 0);
    }
}
