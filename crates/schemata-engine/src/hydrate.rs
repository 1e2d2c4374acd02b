//! Hydration of raw fragments into a schema graph
//!
//! Fragments are processed in load order. The first fragment naming a table
//! creates it; later fragments only contribute columns, tags and issues.
//! A column name already present on the table is silently ignored.

use schemata_core::{
    Codelist, Column, Config, Issue, IssueParent, IssueStatus, Note, PropertyDefinition, Schema,
    SchemaError, Table, TableId, Tag, Validator,
};
use schemata_loader::{Fragment, FragmentLoader, LoadError, Record};
use std::path::Path;

/// A column injected by the engine rather than declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemColumn {
    pub name: &'static str,
    pub column_type: &'static str,
    pub alias: &'static str,
    pub unique: bool,
}

impl SystemColumn {
    pub fn to_column(&self) -> Column {
        Column::new(self.name)
            .with_type(self.column_type)
            .with_alias(self.alias)
            .with_unique(self.unique)
            .with_generated(true)
    }
}

/// Primary key added to every declared table
pub const DEFAULT_COLUMN: SystemColumn = SystemColumn {
    name: "id",
    column_type: "int",
    alias: "id",
    unique: true,
};

/// Audit columns appended to `extended` tables, in this order
pub const EXTENDED_COLUMNS: [SystemColumn; 7] = [
    SystemColumn { name: "xuid", column_type: "uuid", alias: "xuid", unique: false },
    SystemColumn { name: "created_at", column_type: "stamp", alias: "createdAt", unique: false },
    SystemColumn { name: "updated_at", column_type: "stamp", alias: "updatedAt", unique: false },
    SystemColumn { name: "deleted_at", column_type: "stamp", alias: "deletedAt", unique: false },
    SystemColumn { name: "created_by", column_type: "uuid", alias: "createdBy", unique: false },
    SystemColumn { name: "updated_by", column_type: "uuid", alias: "updatedBy", unique: false },
    SystemColumn { name: "deleted_by", column_type: "uuid", alias: "deletedBy", unique: false },
];

/// Fatal hydration errors
#[derive(Debug, thiserror::Error)]
pub enum HydrationError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Builds a [`Schema`] from fragments and codelists
#[derive(Debug, Default)]
pub struct Hydrator {
    validator: Validator,

    /// Materialize codelists as `codelist__<name>` tables
    codelists_as_tables: bool,

    property_definitions: Vec<PropertyDefinition>,
}

impl Hydrator {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            codelists_as_tables: false,
            property_definitions: Vec::new(),
        }
    }

    /// Whitelist, property definitions and codelist mode from a config
    pub fn from_config(config: &Config) -> Result<Self, HydrationError> {
        Ok(Self {
            validator: Validator::new(config.alias_whitelist()),
            codelists_as_tables: config.codelists_as_tables,
            property_definitions: config.property_definitions()?,
        })
    }

    pub fn with_codelists_as_tables(mut self, enabled: bool) -> Self {
        self.codelists_as_tables = enabled;
        self
    }

    /// Run one hydration pass. The first fatal error aborts it.
    pub fn hydrate(&self, fragments: &[Fragment], codelists: Vec<Codelist>) -> Result<Schema, HydrationError> {
        let mut schema = Schema::new();
        schema.set_property_definitions(self.property_definitions.clone());

        for fragment in fragments {
            self.hydrate_fragment(&mut schema, fragment)?;
        }

        for codelist in codelists {
            if self.codelists_as_tables {
                schema.add_synthetic_table(codelist.to_table())?;
            } else {
                schema.add_codelist(codelist)?;
            }
        }

        tracing::info!(
            tables = schema.table_count(),
            codelists = schema.codelist_count(),
            tables_with_issues = schema.tables_with_issues().len(),
            "schema hydrated"
        );

        Ok(schema)
    }

    fn hydrate_fragment(&self, schema: &mut Schema, fragment: &Fragment) -> Result<(), HydrationError> {
        let name = fragment.attr_str("name").ok_or_else(|| SchemaError::MissingName {
            context: "table declaration".to_string(),
        })?;

        let mut columns = fragment
            .children_in_order(&["column", "field"])
            .into_iter()
            .map(|record| build_column(&name, record))
            .collect::<Result<Vec<_>, _>>()?;

        if fragment.attr_flag("extended") {
            columns.extend(EXTENDED_COLUMNS.iter().map(SystemColumn::to_column));
        }

        let id = match schema.table_id(&name) {
            Some(id) => {
                tracing::debug!(table = %name, "merging fragment into existing table");
                id
            }
            None => self.create_table(schema, &name, fragment)?,
        };

        self.merge_columns(schema, id, columns);

        for tag in fragment.tag_list() {
            schema.table_mut(id).add_tag(Tag::new(tag.as_str()));
            schema.add_tagged_table(&tag, id);
        }

        let issues = build_issues(fragment.children("issue"), &IssueParent::table(name.as_str()));
        if !issues.is_empty() {
            schema.table_mut(id).add_issues(issues);
            schema.mark_with_issues(id);
        }

        Ok(())
    }

    fn create_table(&self, schema: &mut Schema, name: &str, fragment: &Fragment) -> Result<TableId, HydrationError> {
        let mut table = Table::new(name);
        table.alias = fragment.attr_str("alias");
        table.properties = fragment.custom_properties();

        let mut default_column = DEFAULT_COLUMN.to_column();
        let default_violations = self.validator.validate_column(&default_column);
        let default_flagged = !default_violations.is_empty();
        default_column.add_violations(default_violations);
        table.add_column(default_column);

        let violations = self.validator.validate_table(&table);
        let flagged = default_flagged || !violations.is_empty();
        table.add_violations(violations);

        let id = schema.add_table(table)?;
        if flagged {
            schema.mark_with_issues(id);
        }

        tracing::debug!(table = %name, "created table");
        Ok(id)
    }

    fn merge_columns(&self, schema: &mut Schema, id: TableId, columns: Vec<Column>) {
        for mut column in columns {
            let table = schema.table_mut(id);
            if table.has_column(&column.name) {
                tracing::debug!(table = %table.name, column = %column.name, "column already declared, keeping first");
                continue;
            }

            let violations = self.validator.validate_column(&column);
            column.add_violations(violations);
            let flagged = column.has_issues();
            table.add_column(column);

            if flagged {
                schema.mark_with_issues(id);
            }
        }
    }
}

fn build_column(table: &str, record: &Fragment) -> Result<Column, SchemaError> {
    let name = record.attr_str("name").ok_or_else(|| SchemaError::MissingName {
        context: format!("column of table \"{}\"", table),
    })?;

    let mut column = Column::new(name.as_str());
    column.properties = record.custom_properties();
    column.column_type = record.attr_str("type");
    column.label = record.attr_str("label");
    column.alias = record.attr_str("alias");
    column.generated = record.attr_flag("generated");
    column.doc = record.attr_str("doc");

    if let Some(foreign_key) = record.attr_str("foreignkey") {
        column.set_foreign_key(foreign_key);
    }

    if let Some(codelist) = record.attr_str("codelist") {
        column.set_codelist(codelist);
    }

    if let Some(unique) = record.attr_bool("unique") {
        column.unique = unique;
    }

    for tag in record.tag_list() {
        column.add_tag(Tag::new(tag));
    }

    column.add_issues(build_issues(record.children("issue"), &IssueParent::column(table, name.as_str())));

    Ok(column)
}

fn build_issues(records: Vec<&Fragment>, parent: &IssueParent) -> Vec<Issue> {
    records
        .into_iter()
        .map(|record| {
            let mut notes = record.children("note");
            notes.sort_by_key(|note| note.attr_str("createdAt"));

            let notes = notes.into_iter().map(|note| build_note(note, parent)).collect();

            Issue::new(parent.clone())
                .with_type(record.attr_str("type").unwrap_or_default())
                .with_status(IssueStatus::parse(record.attr_str("status").as_deref()))
                .with_notes(notes)
        })
        .collect()
}

fn build_note(record: &Fragment, parent: &IssueParent) -> Note {
    let created_at = record.attr_str("createdAt");
    let message = record.attr_str("message").or_else(|| record.text());
    let note = Note::new(record.attr_str("author"), created_at.as_deref(), message);

    if let (Some(raw), None) = (&created_at, &note.created_at) {
        tracing::warn!(parent = %parent, created_at = %raw, "note date is not YYYYMMDD, keeping it undated");
    }

    note
}

/// Hydrate with the default rules and an empty alias whitelist
pub fn hydrate(fragments: &[Fragment], codelists: Vec<Codelist>, codelists_as_tables: bool) -> Result<Schema, HydrationError> {
    Hydrator::default()
        .with_codelists_as_tables(codelists_as_tables)
        .hydrate(fragments, codelists)
}

/// Load a schema directory and hydrate it with the given config
pub fn load_and_hydrate(dir: &Path, config: &Config) -> Result<Schema, HydrationError> {
    let sources = FragmentLoader::new(dir).load()?;
    Hydrator::from_config(config)?.hydrate(&sources.fragments, sources.codelists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_core::{AliasWhitelist, PropertyClass, ViolationCode};
    use serde_json::{json, Value};

    fn fragment(value: Value) -> Fragment {
        value.as_object().cloned().unwrap()
    }

    fn fragments(values: Vec<Value>) -> Vec<Fragment> {
        values.into_iter().map(fragment).collect()
    }

    #[test]
    fn default_column_injected() {
        let schema = hydrate(&fragments(vec![json!({"@name": "users"})]), Vec::new(), false).unwrap();
        let users = schema.entity("users").unwrap();

        let id = users.find_column("id").unwrap();
        assert!(id.unique);
        assert!(id.generated);
        assert_eq!(id.alias.as_deref(), Some("id"));
        assert!(!schema.has_issues());
    }

    #[test]
    fn first_declaration_wins() {
        let input = fragments(vec![
            json!({"@name": "users", "column": {"@name": "email", "@type": "varchar(255)", "@label": "E-mail"}}),
            json!({"@name": "users", "column": [
                {"@name": "email", "@type": "text", "@label": "Mail", "@unique": true},
                {"@name": "phone", "@type": "phone"}
            ]}),
        ]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let users = schema.entity("users").unwrap();

        assert_eq!(users.column_names(), vec!["id", "email", "phone"]);
        let email = users.find_column("email").unwrap();
        assert_eq!(email.column_type.as_deref(), Some("varchar(255)"));
        assert_eq!(email.label.as_deref(), Some("E-mail"));
        assert!(!email.unique);
    }

    #[test]
    fn extended_columns_appended() {
        let input = fragments(vec![json!({
            "@name": "orders",
            "@extended": true,
            "column": {"@name": "total", "@type": "money"}
        })]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let orders = schema.entity("orders").unwrap();

        assert_eq!(
            orders.column_names(),
            vec!["id", "total", "xuid", "created_at", "updated_at", "deleted_at", "created_by", "updated_by", "deleted_by"]
        );
        assert!(orders.columns[2..].iter().all(|c| c.generated));
        assert!(!orders.find_column("total").unwrap().generated);
    }

    #[test]
    fn declared_column_beats_extended() {
        let input = fragments(vec![json!({
            "@name": "orders",
            "@extended": "true",
            "column": {"@name": "created_at", "@type": "datetime"}
        })]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let created_at = schema.entity("orders").unwrap().find_column("created_at").unwrap();
        assert_eq!(created_at.column_type.as_deref(), Some("datetime"));
        assert!(!created_at.generated);
    }

    #[test]
    fn alias_and_properties_from_first_fragment() {
        let input = fragments(vec![
            json!({"@name": "users", "@alias": "User", "@p:owner": "crm"}),
            json!({"@name": "users", "@alias": "Person", "@p:owner": "hr"}),
        ]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let users = schema.entity("users").unwrap();
        assert_eq!(users.alias.as_deref(), Some("User"));
        assert_eq!(users.properties.get("owner").map(String::as_str), Some("crm"));
    }

    #[test]
    fn column_attributes() {
        let input = fragments(vec![json!({"@name": "orders", "column": [
            {"@name": "user_id", "@foreignkey": "users.id", "@alias": "userId", "@doc": "Buyer"},
            {"@name": "legacy_ref", "@foreignkey": "id"},
            {"@name": "country", "@type": "varchar(2)", "@codelist": "countries", "@tags": "geo, ,iso"},
            {"@name": "code", "@unique": "true", "@generated": "true", "@p:width": "10"}
        ]})]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let orders = schema.entity("orders").unwrap();

        let user_id = orders.find_column("user_id").unwrap();
        assert_eq!(user_id.foreign_table.as_deref(), Some("users"));
        assert_eq!(user_id.doc.as_deref(), Some("Buyer"));

        assert_eq!(orders.find_column("legacy_ref").unwrap().foreign_table, None);

        let country = orders.find_column("country").unwrap();
        assert_eq!(country.column_type.as_deref(), Some("codelist"));
        assert_eq!(country.foreign_table.as_deref(), Some("codelist__countries"));
        let tags: Vec<_> = country.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, vec!["geo", "iso"]);

        // unique only when explicitly boolean; generated is lenient
        let code = orders.find_column("code").unwrap();
        assert!(!code.unique);
        assert!(code.generated);
        assert_eq!(code.properties.get("width").map(String::as_str), Some("10"));
    }

    #[test]
    fn naming_violations_recorded() {
        let input = fragments(vec![json!({
            "@name": "order-items",
            "@alias": "orderItems",
            "column": {"@name": "Unit Price", "@alias": "UnitPrice"}
        })]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let table = schema.entity("order-items").unwrap();

        let codes: Vec<_> = table.violations.iter().map(|v| v.code).collect();
        assert_eq!(codes, vec![ViolationCode::InvalidSqlIdentifier, ViolationCode::InvalidUpperCamelCase]);
        assert_eq!(table.find_column("Unit Price").unwrap().violations.len(), 2);
        assert_eq!(schema.tables_with_issues().len(), 1);
    }

    #[test]
    fn alias_whitelist() {
        let input = fragments(vec![json!({
            "@name": "users",
            "column": {"@name": "legacy", "@alias": "oldLegacy_Name"}
        })]);

        let whitelisted = Hydrator::new(Validator::new(AliasWhitelist::from_entries(["oldLegacy_Name"])))
            .hydrate(&input, Vec::new())
            .unwrap();
        assert!(whitelisted.entity("users").unwrap().find_column("legacy").unwrap().violations.is_empty());
        assert!(!whitelisted.has_issues());

        let plain = hydrate(&input, Vec::new(), false).unwrap();
        let violations = &plain.entity("users").unwrap().find_column("legacy").unwrap().violations;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::InvalidLowerCamelCase);
        assert_eq!(plain.tables_with_issues()[0].name, "users");
    }

    #[test]
    fn tags_indexed_once() {
        let input = fragments(vec![
            json!({"@name": "users", "@tags": "core, people"}),
            json!({"@name": "users", "@tags": "core"}),
            json!({"@name": "accounts", "@tags": "core"}),
        ]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        assert_eq!(schema.tags_all(), vec!["core", "people"]);

        let core: Vec<_> = schema.tagged_tables("core").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(core, vec!["accounts", "users"]);
        assert_eq!(schema.entity("users").unwrap().tags.len(), 2);
    }

    #[test]
    fn manual_issues_with_sorted_notes() {
        let input = fragments(vec![json!({
            "@name": "users",
            "issue": {
                "@type": "naming",
                "@status": "closed",
                "note": [
                    {"@author": "carol", "@createdAt": "20200301", "#": "third"},
                    {"@author": "alice", "@createdAt": "20200101", "@message": "first"},
                    {"@author": "bob", "@createdAt": "20200101", "#": "second"}
                ]
            },
            "column": {"@name": "email", "issue": [{"@status": "open"}, {"@status": "bogus"}]}
        })]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let users = schema.entity("users").unwrap();

        let issue = &users.issues[0];
        assert!(!issue.is_open());
        assert_eq!(issue.issue_type, "naming");
        assert_eq!(issue.parent, IssueParent::table("users"));
        let authors: Vec<_> = issue.notes.iter().map(|n| n.author.as_deref().unwrap()).collect();
        assert_eq!(authors, vec!["alice", "bob", "carol"]);
        assert_eq!(issue.notes[0].message.as_deref(), Some("first"));
        assert!(issue.notes.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let email = users.find_column("email").unwrap();
        assert_eq!(email.issues.len(), 2);
        assert_eq!(email.issues[1].status, IssueStatus::Unknown);
        assert!(email.issues[1].is_open());
        assert_eq!(email.issues[0].parent, IssueParent::column("users", "email"));

        assert_eq!(schema.tables_with_issues().len(), 1);
    }

    #[test]
    fn undated_notes_sort_by_raw_string() {
        let input = fragments(vec![json!({
            "@name": "users",
            "issue": {"note": [
                {"@createdAt": "garbage", "#": "late"},
                {"@createdAt": "20200101", "#": "early"}
            ]}
        })]);

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let notes = &schema.entity("users").unwrap().issues[0].notes;

        let messages: Vec<_> = notes.iter().map(|n| n.message.as_deref().unwrap()).collect();
        assert_eq!(messages, vec!["early", "late"]);
        assert_eq!(notes[1].created_at, None);
    }

    #[test]
    fn types_with_fields() {
        let xml = r#"<schema>
    <type name="account" alias="Account">
        <field name="handle" type="string" alias="handle"/>
        <column name="balance" type="money" alias="balance"/>
        <field name="active" type="bool" alias="active"/>
    </type>
    <table name="account">
        <column name="handle" type="text"/>
        <field name="opened_at" type="date" alias="openedAt"/>
    </table>
</schema>"#;
        let input = schemata_loader::decode_fragments("account.xml", xml).unwrap();

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let account = schema.entity("account").unwrap();

        assert_eq!(account.alias.as_deref(), Some("Account"));
        assert_eq!(account.column_names(), vec!["id", "handle", "balance", "active", "opened_at"]);
        assert_eq!(account.find_column("handle").unwrap().column_type.as_deref(), Some("string"));
        assert!(!schema.has_issues());
    }

    #[test]
    fn entity_first_declared_as_type_wins() {
        let xml = r#"<schema>
    <type name="profile"><field name="bio" type="text"/></type>
    <table name="profile" alias="Ignored"><column name="bio" type="varchar(10)"/></table>
</schema>"#;
        let input = schemata_loader::decode_fragments("profile.xml", xml).unwrap();

        let schema = hydrate(&input, Vec::new(), false).unwrap();
        let profile = schema.entity("profile").unwrap();
        assert_eq!(profile.alias, None);
        assert_eq!(profile.find_column("bio").unwrap().column_type.as_deref(), Some("text"));
    }

    #[test]
    fn missing_name_is_fatal() {
        let result = hydrate(&fragments(vec![json!({"@alias": "User"})]), Vec::new(), false);
        assert!(matches!(result, Err(HydrationError::Schema(SchemaError::MissingName { .. }))));

        let result = hydrate(
            &fragments(vec![json!({"@name": "users", "column": {"@type": "int"}})]),
            Vec::new(),
            false,
        );
        assert!(matches!(result, Err(HydrationError::Schema(SchemaError::MissingName { .. }))));
    }

    #[test]
    fn codelists_kept_or_materialized() {
        let countries = || Codelist::new("countries", Vec::new());

        let schema = hydrate(&[], vec![countries()], false).unwrap();
        assert!(schema.codelist("countries").is_some());
        assert_eq!(schema.table_count(), 0);

        let schema = hydrate(&[], vec![countries()], true).unwrap();
        let table = schema.entity("codelist__countries").unwrap();
        assert_eq!(table.column_names(), vec!["code", "label"]);
        assert!(table.find_column("code").unwrap().unique);
        assert_eq!(schema.codelist_count(), 0);
    }

    #[test]
    fn codelist_collisions_are_fatal() {
        let countries = || Codelist::new("countries", Vec::new());

        let result = hydrate(&[], vec![countries(), countries()], false);
        assert!(matches!(result, Err(HydrationError::Schema(SchemaError::DuplicateCodelist(_)))));

        let declared = fragments(vec![json!({"@name": "codelist__countries"})]);
        let result = hydrate(&declared, vec![countries()], true);
        assert!(matches!(result, Err(HydrationError::Schema(SchemaError::DuplicateCodelist(_)))));
    }

    #[test]
    fn from_config() {
        let config = Config::from_toml(
            r#"
            codelists_as_tables = true
            alias_whitelist = ["Legacy_Alias"]

            [properties.description]
            classes = ["FIELD"]
            "#,
        )
        .unwrap();

        let input = fragments(vec![json!({"@name": "users", "column": {"@name": "old", "@alias": "Legacy_Alias"}})]);
        let schema = Hydrator::from_config(&config)
            .unwrap()
            .hydrate(&input, vec![Codelist::new("countries", Vec::new())])
            .unwrap();

        assert!(!schema.has_issues());
        assert!(schema.entity("codelist__countries").is_some());
        assert_eq!(schema.definitions_for(PropertyClass::Field).len(), 1);
    }
}
