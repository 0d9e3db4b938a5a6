use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for WingMorph
#[derive(Error, Debug)]
pub enum WingMorphError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Structure incomplete: {0}")]
    StructureIncomplete(String),

    #[error("Invalid parameter: {0}")]
    Parameter(String),

    #[error("Ambiguous role assignment: {0}")]
    AmbiguousRoleAssignment(String),

    #[error("Unresolved arc: {0}")]
    UnresolvedArc(String),

    #[error("Grid format error: {0}")]
    GridFormat(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Structure file error: {0}")]
    StructureFile(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, WingMorphError>;
