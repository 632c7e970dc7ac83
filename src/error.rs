use thiserror::Error;

/// Main error type for jsonapi-render
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failure reported by a resource (relationship resolution, serialization, cache key)
    #[error("Resource error: {0}")]
    Resource(String),

    /// Unsupported primary data shape or unknown resource reference
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Include specification that cannot be turned into a tree
    #[error("Invalid include: {0}")]
    InvalidInclude(String),

    /// Fragment cache store errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML decoding errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient Result type using RenderError
pub type Result<T> = std::result::Result<T, RenderError>;
