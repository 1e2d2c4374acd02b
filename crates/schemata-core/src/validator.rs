//! Identifier naming rules
//!
//! Table and column names must be SQL identifiers. Table aliases must be
//! UpperCamelCase and column aliases lowerCamelCase, unless the alias is
//! whitelisted.

use crate::config::AliasWhitelist;
use crate::entity::{Column, Table};
use crate::violation::{Violation, ViolationCode};
use regex::Regex;
use std::sync::OnceLock;

/// A predicate over identifier strings
pub trait IdentifierRule: Send + Sync {
    /// Code recorded when the rule fails
    fn code(&self) -> ViolationCode;

    fn is_valid(&self, value: &str) -> bool;
}

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static identifier pattern"))
}

/// Letters, digits and underscores, not starting with a digit
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlIdentifier;

impl IdentifierRule for SqlIdentifier {
    fn code(&self) -> ViolationCode {
        ViolationCode::InvalidSqlIdentifier
    }

    fn is_valid(&self, value: &str) -> bool {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        compiled(&PATTERN, r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpperCamelCase;

impl IdentifierRule for UpperCamelCase {
    fn code(&self) -> ViolationCode {
        ViolationCode::InvalidUpperCamelCase
    }

    fn is_valid(&self, value: &str) -> bool {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        compiled(&PATTERN, r"^[A-Z][A-Za-z0-9]*$").is_match(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCamelCase;

impl IdentifierRule for LowerCamelCase {
    fn code(&self) -> ViolationCode {
        ViolationCode::InvalidLowerCamelCase
    }

    fn is_valid(&self, value: &str) -> bool {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        compiled(&PATTERN, r"^[a-z][A-Za-z0-9]*$").is_match(value)
    }
}

/// The rule applied to each validated property
pub struct ValidationRules {
    pub table_name: Box<dyn IdentifierRule>,
    pub table_alias: Box<dyn IdentifierRule>,
    pub column_name: Box<dyn IdentifierRule>,
    pub column_alias: Box<dyn IdentifierRule>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            table_name: Box::new(SqlIdentifier),
            table_alias: Box::new(UpperCamelCase),
            column_name: Box::new(SqlIdentifier),
            column_alias: Box::new(LowerCamelCase),
        }
    }
}

impl std::fmt::Debug for ValidationRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRules")
            .field("table_name", &self.table_name.code())
            .field("table_alias", &self.table_alias.code())
            .field("column_name", &self.column_name.code())
            .field("column_alias", &self.column_alias.code())
            .finish()
    }
}

/// Applies [`ValidationRules`] to tables and columns
#[derive(Debug, Default)]
pub struct Validator {
    rules: ValidationRules,
    whitelist: AliasWhitelist,
}

impl Validator {
    /// Default rules with an alias whitelist
    pub fn new(whitelist: AliasWhitelist) -> Self {
        Self {
            rules: ValidationRules::default(),
            whitelist,
        }
    }

    /// Replace the rule set
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn whitelist(&self) -> &AliasWhitelist {
        &self.whitelist
    }

    /// Check a table's own name and alias (columns are validated separately)
    pub fn validate_table(&self, table: &Table) -> Vec<Violation> {
        let mut violations = Vec::new();
        violations.extend(check(self.rules.table_name.as_ref(), "name", &table.name));
        if let Some(alias) = self.checked_alias(table.alias.as_deref()) {
            violations.extend(check(self.rules.table_alias.as_ref(), "alias", alias));
        }
        violations
    }

    pub fn validate_column(&self, column: &Column) -> Vec<Violation> {
        let mut violations = Vec::new();
        violations.extend(check(self.rules.column_name.as_ref(), "name", &column.name));
        if let Some(alias) = self.checked_alias(column.alias.as_deref()) {
            violations.extend(check(self.rules.column_alias.as_ref(), "alias", alias));
        }
        violations
    }

    /// The alias to validate, if any: empty and whitelisted aliases are skipped
    fn checked_alias<'a>(&self, alias: Option<&'a str>) -> Option<&'a str> {
        alias.filter(|a| !a.is_empty() && !self.whitelist.contains(a))
    }
}

fn check(rule: &dyn IdentifierRule, property: &str, value: &str) -> Option<Violation> {
    if rule.is_valid(value) {
        None
    } else {
        Some(Violation::new(rule.code(), property, value))
    }
}
