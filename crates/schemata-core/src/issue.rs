//! Manually curated issues and their notes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Issue lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl IssueStatus {
    /// Map a raw status string; absent or unrecognized values are `Unknown`
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("open") => Self::Open,
            Some("closed") => Self::Closed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The entity an issue is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IssueParent {
    Table { table: String },
    Column { table: String, column: String },
}

impl IssueParent {
    pub fn table(table: impl Into<String>) -> Self {
        Self::Table { table: table.into() }
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Name of the owning table
    pub fn table_name(&self) -> &str {
        match self {
            Self::Table { table } | Self::Column { table, .. } => table,
        }
    }

    /// Name of the parent itself (table or column name)
    pub fn name(&self) -> &str {
        match self {
            Self::Table { table } => table,
            Self::Column { column, .. } => column,
        }
    }
}

impl std::fmt::Display for IssueParent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table { table } => write!(f, "{}", table),
            Self::Column { table, column } => write!(f, "{}.{}", table, column),
        }
    }
}

/// A dated comment on an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub author: Option<String>,

    /// Parsed from a `YYYYMMDD` literal; `None` when unparsable
    pub created_at: Option<NaiveDate>,

    pub message: Option<String>,
}

impl Note {
    pub fn new(author: Option<String>, created_at: Option<&str>, message: Option<String>) -> Self {
        Self {
            author,
            created_at: created_at.and_then(Self::parse_date),
            message,
        }
    }

    /// Parse an 8-digit `YYYYMMDD` literal
    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
    }
}

/// A tracked issue on a table or column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub parent: IssueParent,

    /// Free-text classification
    #[serde(rename = "type")]
    pub issue_type: String,

    pub status: IssueStatus,

    /// Notes in the order they were recorded
    pub notes: Vec<Note>,
}

impl Issue {
    pub fn new(parent: IssueParent) -> Self {
        Self {
            parent,
            issue_type: String::new(),
            status: IssueStatus::Unknown,
            notes: Vec::new(),
        }
    }

    pub fn with_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = issue_type.into();
        self
    }

    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }

    /// Set notes as given; callers own the ordering
    pub fn with_notes(mut self, notes: Vec<Note>) -> Self {
        self.notes = notes;
        self
    }

    /// Everything except `closed` counts as open
    pub fn is_open(&self) -> bool {
        self.status != IssueStatus::Closed
    }
}
