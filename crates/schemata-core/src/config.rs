//! Configuration schema (schemata.toml)

use crate::error::SchemaError;
use crate::property::{PropertyClass, PropertyDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Default config file name, looked up next to the schema directory
pub const CONFIG_FILE_NAME: &str = "schemata.toml";

/// Aliases exempt from the camel-case rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasWhitelist(BTreeSet<String>);

/// On-disk shape of a whitelist file
#[derive(Debug, Deserialize)]
struct WhitelistFile {
    #[serde(default)]
    alias_whitelist: Vec<String>,
}

impl AliasWhitelist {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(Into::into).collect())
    }

    /// Load a whitelist file, falling back to an empty list on any failure
    pub fn load_best_effort(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "alias whitelist not readable, using empty whitelist");
                return Self::default();
            }
        };

        match toml::from_str::<WhitelistFile>(&contents) {
            Ok(file) => Self::from_entries(file.alias_whitelist),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "alias whitelist not parsable, using empty whitelist");
                Self::default()
            }
        }
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.0.contains(alias)
    }

    pub fn extend(&mut self, other: AliasWhitelist) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options of one `[properties.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyOptions {
    #[serde(default)]
    pub localized: bool,

    #[serde(default)]
    pub indexed: bool,

    /// Class names (SCHEMA, TYPE, FIELD)
    #[serde(default)]
    pub classes: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Materialize codelists as `codelist__<name>` tables
    #[serde(default)]
    pub codelists_as_tables: bool,

    /// Inline alias whitelist entries
    #[serde(default)]
    pub alias_whitelist: Vec<String>,

    /// Additional whitelist file, relative to the project root
    #[serde(default)]
    pub alias_whitelist_file: Option<PathBuf>,

    /// Custom property definitions
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyOptions>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            codelists_as_tables: false,
            alias_whitelist: Vec::new(),
            alias_whitelist_file: None,
            properties: BTreeMap::new(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Find `schemata.toml` inside the schema directory or next to it
    pub fn discover(schema_dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [
            Some(schema_dir.join(CONFIG_FILE_NAME)),
            schema_dir.parent().map(|p| p.join(CONFIG_FILE_NAME)),
        ];

        for candidate in candidates.into_iter().flatten() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "using config file");
                return Self::from_file(&candidate);
            }
        }

        Ok(Self {
            project_root: schema_dir.to_path_buf(),
            ..Self::default()
        })
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Inline entries merged with the whitelist file, loaded best-effort
    pub fn alias_whitelist(&self) -> AliasWhitelist {
        let mut whitelist = AliasWhitelist::from_entries(self.alias_whitelist.iter().cloned());

        if let Some(file) = &self.alias_whitelist_file {
            let path = if file.is_relative() {
                self.project_root.join(file)
            } else {
                file.clone()
            };
            whitelist.extend(AliasWhitelist::load_best_effort(&path));
        }

        whitelist
    }

    /// Build property definitions from the `[properties]` tables
    pub fn property_definitions(&self) -> Result<Vec<PropertyDefinition>, SchemaError> {
        self.properties
            .iter()
            .map(|(name, options)| {
                let classes = options
                    .classes
                    .iter()
                    .map(|class| PropertyClass::from_name(class))
                    .collect::<Result<_, _>>()?;

                Ok(PropertyDefinition {
                    name: name.clone(),
                    localized: options.localized,
                    indexed: options.indexed,
                    classes,
                })
            })
            .collect()
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
