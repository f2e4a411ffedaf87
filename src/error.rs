use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid config value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },
}

/// Reasons an orchestration operation left state unchanged.
///
/// None of these are fatal. The [`crate::orchestration::Workbench`] facade
/// turns them into `false`/`None` results and logs them at debug level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} `{id}` while {state}")]
    InvalidTransition {
        id: String,
        action: &'static str,
        state: String,
    },

    #[error("Discarded stale completion for `{sub_agent_id}` (attempt {attempt}, current {current})")]
    StaleCompletion {
        sub_agent_id: String,
        attempt: u64,
        current: u64,
    },

    #[error("Id already registered: {0}")]
    DuplicateId(String),
}

/// Errors writing the JSONL audit trail.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize audit entry: {0}")]
    Serialize(#[from] serde_json::Error),
}
