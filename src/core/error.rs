//! Error types for pane-pm

use thiserror::Error;

use crate::identity::ActorSource;

/// Errors that can occur while running a pane-pm command
#[derive(Error, Debug)]
pub enum PmError {
    /// A permission check was built from invalid parts
    #[error("Invalid permission check: {0}")]
    InvalidCheck(String),

    /// Permission denied for the resolved actor
    #[error("Permission denied: {actor} ({basis}) may not {path}{}", blocked_by(.rule))]
    PermissionDenied {
        actor: String,
        basis: ActorSource,
        path: String,
        rule: Option<String>,
        warning: Option<String>,
    },

    /// Agent is not in the pane registry
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Agent is already registered
    #[error("Agent already registered: {0}")]
    AgentExists(String),

    /// Board record not found
    #[error("{resource} not found: {id}")]
    RecordNotFound { resource: String, id: u64 },

    /// Pane transport failure on an explicit operation
    #[error("Transport error: {0}")]
    Transport(String),

    /// Problem with config.json
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bad command line argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PmError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        PmError::Transport(msg.into())
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        PmError::InvalidConfig(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        PmError::InvalidInput(msg.into())
    }

    /// Process exit status the CLI uses for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            PmError::PermissionDenied { .. } => 3,
            PmError::UnknownAgent(_) | PmError::RecordNotFound { .. } => 4,
            _ => 1,
        }
    }
}

fn blocked_by(rule: &Option<String>) -> String {
    rule.as_ref()
        .map(|r| format!(" [blocked by {}]", r))
        .unwrap_or_default()
}

/// Result type alias for pane-pm operations
pub type PmResult<T> = Result<T, PmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PmError::UnknownAgent("codex".into());
        assert_eq!(err.to_string(), "Unknown agent: codex");

        let err = PmError::RecordNotFound {
            resource: "task".into(),
            id: 7,
        };
        assert_eq!(err.to_string(), "task not found: 7");
    }

    #[test]
    fn test_permission_denied_display() {
        let err = PmError::PermissionDenied {
            actor: "codex".into(),
            basis: ActorSource::Pane,
            path: "pm:task:update(status)".into(),
            rule: Some("pm:task:update(*)".into()),
            warning: None,
        };
        assert_eq!(
            err.to_string(),
            "Permission denied: codex (pane) may not pm:task:update(status) [blocked by pm:task:update(*)]"
        );
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_input_errors_are_not_config_errors() {
        let err = PmError::invalid_input("nothing to update");
        assert!(matches!(err, PmError::InvalidInput(_)));
        assert_eq!(err.to_string(), "Invalid input: nothing to update");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PmError = io_err.into();
        assert!(matches!(err, PmError::Io(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
