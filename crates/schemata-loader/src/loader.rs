//! Schema directory discovery and loading

use crate::codelist::decode_codelist;
use crate::error::LoadError;
use crate::fragment::{decode_fragments, Fragment};
use schemata_core::Codelist;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything read from a schema directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSources {
    /// Entity fragments in file order, then document order
    pub fragments: Vec<Fragment>,

    /// One codelist per CSV file
    pub codelists: Vec<Codelist>,
}

/// Reads XML fragments and CSV codelists below a root directory
pub struct FragmentLoader {
    /// Root directory of the schema
    root: PathBuf,
}

impl FragmentLoader {
    /// Create a loader for a schema directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every `*.xml` and `*.csv` below the root.
    ///
    /// Any unreadable or malformed file fails the whole load.
    pub fn load(&self) -> Result<SchemaSources, LoadError> {
        if !self.root.is_dir() {
            return Err(LoadError::MissingDirectory(self.root.display().to_string()));
        }

        let mut sources = SchemaSources::default();

        for path in self.discover("xml")? {
            let fragments = Self::load_xml_file(&path)?;
            tracing::debug!(path = %path.display(), fragments = fragments.len(), "loaded xml");
            sources.fragments.extend(fragments);
        }

        for path in self.discover("csv")? {
            let codelist = Self::load_csv_file(&path)?;
            tracing::debug!(path = %path.display(), items = codelist.items.len(), "loaded codelist");
            sources.codelists.push(codelist);
        }

        tracing::info!(
            root = %self.root.display(),
            fragments = sources.fragments.len(),
            codelists = sources.codelists.len(),
            "schema sources loaded"
        );

        Ok(sources)
    }

    /// Read one XML file into fragments
    pub fn load_xml_file(path: &Path) -> Result<Vec<Fragment>, LoadError> {
        let contents = read(path)?;
        decode_fragments(&path.display().to_string(), &contents)
    }

    /// Read one CSV file into a codelist named after the file stem
    pub fn load_csv_file(path: &Path) -> Result<Codelist, LoadError> {
        let contents = read(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LoadError::Io {
                path: path.display().to_string(),
                message: "file name is not valid UTF-8".to_string(),
            })?;

        decode_codelist(name, &contents).map_err(|e| LoadError::Csv {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Files with the given extension, recursively, sorted by path
    fn discover(&self, extension: &str) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| LoadError::Io {
                path: self.root.display().to_string(),
                message: e.to_string(),
            })?;
            let path = entry.path();

            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(extension) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
