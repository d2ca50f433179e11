use std::fmt;

/// Top-level error for crate entry points.
///
/// Granular per-component errors live in `orchestration::errors`; this enum
/// only covers concerns with no owner there.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    ConfigurationError(String),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OrchestratorError {}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
