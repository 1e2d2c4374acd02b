//! Validation report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::entity::Table;
use crate::error::SchemaError;
use crate::issue::Issue;
use crate::schema::{IssueRef, Schema};
use crate::violation::Violation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of tables in the schema
    pub tables: usize,

    /// Number of codelists (not counting codelists materialized as tables)
    pub codelists: usize,

    /// Number of tables in the issues index
    pub tables_with_issues: usize,

    /// Automatic naming violations across indexed tables and their columns
    pub violations: usize,

    /// Manual issues that are not closed
    pub open_issues: usize,

    /// Manual issues that are closed
    pub closed_issues: usize,
}

/// Everything recorded against one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    pub name: String,

    pub violations: Vec<Violation>,

    /// Column name -> violations (columns without violations are omitted)
    pub column_violations: BTreeMap<String, Vec<Violation>>,

    /// Table and column issues
    pub issues: Vec<Issue>,
}

/// Validation report (validation.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Tables in the issues index
    pub tables: Vec<TableReport>,
}

impl ValidationReport {
    /// Summarize the issues index of a hydrated schema
    pub fn from_schema(schema: &Schema) -> Self {
        Self::from_tables(schema, schema.tables_with_issues())
    }

    /// Report restricted to one table; fails if the table does not exist
    pub fn for_table(schema: &Schema, name: &str) -> Result<Self, SchemaError> {
        let table = schema.require_entity(name)?;
        let flagged = schema
            .tables_with_issues()
            .into_iter()
            .filter(|t| t.name == table.name)
            .collect();
        Ok(Self::from_tables(schema, flagged))
    }

    fn from_tables(schema: &Schema, flagged: Vec<&Table>) -> Self {
        let buckets = schema.issues_by_state();
        let included = |entry: &&IssueRef<'_>| flagged.iter().any(|t| t.name == entry.parent.table_name());

        let mut summary = ReportSummary {
            tables: schema.table_count(),
            codelists: schema.codelist_count(),
            tables_with_issues: 0,
            violations: 0,
            open_issues: buckets.open.iter().filter(included).count(),
            closed_issues: buckets.closed.iter().filter(included).count(),
        };

        let mut tables = Vec::new();
        for table in &flagged {
            summary.tables_with_issues += 1;
            summary.violations += table.violation_count();

            let column_violations = table
                .columns
                .iter()
                .filter(|c| !c.violations.is_empty())
                .map(|c| (c.name.clone(), c.violations.clone()))
                .collect();

            let issues = table
                .issues
                .iter()
                .chain(table.columns.iter().flat_map(|c| c.issues.iter()))
                .cloned()
                .collect();

            tables.push(TableReport {
                name: table.name.clone(),
                violations: table.violations.clone(),
                column_violations,
                issues,
            });
        }

        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary,
            tables,
        }
    }

    /// True when any table landed in the issues index
    pub fn has_issues(&self) -> bool {
        self.summary.tables_with_issues > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
