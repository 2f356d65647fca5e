//! Error types for TriageKit

/// Result type alias using TriageKit's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for TriageKit operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rule-set configuration errors (fatal, raised at load time)
    #[error("configuration error: {0}")]
    Config(String),

    /// Evaluation errors (structurally invalid evaluation input)
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// IO errors (reading rule documents)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new evaluation error
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}
