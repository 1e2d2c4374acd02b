//! Structural diff between two schema graphs
//!
//! Both graphs are treated as a two-level tree: tables (then codelists) at
//! depth 0, columns at depth 1. Columns are only visited below a modified
//! table. Unchanged nodes are never emitted.
//!
//! Call [`Schema::clean_up_for_diff`] on both inputs first, otherwise
//! violations and indices show up as modifications.

use schemata_core::{Codelist, Column, Schema, Table};
use std::fmt;

/// Classification of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Deleted,
    Modified,
    TypeChanged,
    Unchanged,
}

impl ChangeKind {
    /// Single-letter symbol used in change lines
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeKind::Created => "+",
            ChangeKind::Deleted => "-",
            ChangeKind::Modified => "M",
            ChangeKind::TypeChanged => "T",
            ChangeKind::Unchanged => "=",
        }
    }

    fn of<T: PartialEq>(a: Option<&T>, b: Option<&T>) -> Self {
        match (a, b) {
            (None, Some(_)) => ChangeKind::Created,
            (Some(_), None) => ChangeKind::Deleted,
            (Some(a), Some(b)) if a != b => ChangeKind::Modified,
            _ => ChangeKind::Unchanged,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One emitted node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// 0 for tables and codelists, 1 for columns
    pub depth: usize,

    pub identifier: String,

    pub kind: ChangeKind,
}

impl Change {
    fn new(depth: usize, identifier: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            depth,
            identifier: identifier.into(),
            kind,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:indent$}* {} ({})", "", self.identifier, self.kind, indent = self.depth * 2)
    }
}

/// Ordered changes from schema A to schema B
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    changes: Vec<Change>,
}

impl SchemaDiff {
    pub const LEGEND: &'static str = "+ created, - deleted, M modified, T type changed";

    /// Compare two cleaned-up schema graphs
    pub fn compare(a: &Schema, b: &Schema) -> Self {
        let mut changes = Vec::new();

        for name in merged_names(a.tables_sorted().map(|t| t.name.as_str()), b.tables_sorted().map(|t| t.name.as_str())) {
            let (old, new) = (a.entity(name), b.entity(name));
            let kind = ChangeKind::of(old, new);
            if kind == ChangeKind::Unchanged {
                continue;
            }

            changes.push(Change::new(0, name, kind));
            if let (Some(old), Some(new)) = (old, new) {
                compare_columns(old, new, &mut changes);
            }
        }

        let codelist_names = merged_names(a.codelists().map(|c| c.name.as_str()), b.codelists().map(|c| c.name.as_str()));
        for name in codelist_names {
            let kind = ChangeKind::of::<Codelist>(a.codelist(name), b.codelist(name));
            if kind != ChangeKind::Unchanged {
                changes.push(Change::new(0, format!("codelist:{}", name), kind));
            }
        }

        tracing::debug!(changes = changes.len(), "schema diff computed");

        Self { changes }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Rendered change lines, in traversal order
    pub fn lines(&self) -> Vec<String> {
        self.changes.iter().map(Change::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Columns of A in order, then columns only present in B
fn compare_columns(old: &Table, new: &Table, changes: &mut Vec<Change>) {
    let names = old
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .chain(new.columns.iter().map(|c| c.name.as_str()).filter(|n| !old.has_column(n)));

    for name in names {
        let kind = column_change(old.find_column(name), new.find_column(name));
        if kind != ChangeKind::Unchanged {
            changes.push(Change::new(1, name, kind));
        }
    }
}

fn column_change(old: Option<&Column>, new: Option<&Column>) -> ChangeKind {
    match (old, new) {
        (Some(a), Some(b)) if a.column_type != b.column_type => ChangeKind::TypeChanged,
        _ => ChangeKind::of(old, new),
    }
}

/// Sorted union of two sorted name sequences
fn merged_names<'a>(a: impl Iterator<Item = &'a str>, b: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = a.chain(b).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Change lines from A to B
pub fn compare(a: &Schema, b: &Schema) -> Vec<String> {
    SchemaDiff::compare(a, b).lines()
}
