/// Source loading errors. Any of these aborts the whole pass.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Schema path does not exist: {0}")]
    MissingDirectory(String),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse XML in {path}: {message}")]
    Xml { path: String, message: String },

    #[error("Failed to parse CSV in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("Unknown table format in {path}: {message}")]
    Format { path: String, message: String },
}
