//! Error taxonomy shared by every mcpi operation.
//!
//! All variants are ordinary failures: the router turns them into a
//! `{success: false, message}` envelope instead of letting them escape.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpiError {
    #[error("Server '{0}' is not registered")]
    NotRegistered(String),

    #[error("Could not extract a repository path from '{0}'")]
    InvalidRepoUrl(String),

    #[error("Host config path is not set (export MCP_CLIENT_CONFIG_PATH or set host_config_path)")]
    MissingConfigPath,

    #[error("{context}: {source}")]
    ExternalIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed: {detail}")]
    ShellStepFailure { step: String, detail: String },

    #[error("Invalid config: {0}")]
    ValidationFailure(String),

    #[error("Package index unavailable after {attempts} attempts: {last_error}")]
    DiscoveryUnavailable { attempts: u32, last_error: String },

    #[error("Registry file {} is corrupt: {reason}", path.display())]
    CorruptRegistry { path: PathBuf, reason: String },
}

impl McpiError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::ExternalIo {
            context: context.into(),
            source,
        }
    }

    /// Wrap a JSON (de)serialization error as an external I/O failure.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::ExternalIo {
            context: context.into(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
        }
    }

    pub fn shell(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ShellStepFailure {
            step: step.into(),
            detail: detail.into(),
        }
    }

    /// Stable identifier reported alongside failure messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotRegistered(_) => "NOT_REGISTERED",
            Self::InvalidRepoUrl(_) => "INVALID_REPO_URL",
            Self::MissingConfigPath => "MISSING_CONFIG_PATH",
            Self::ExternalIo { .. } => "EXTERNAL_IO_FAILURE",
            Self::ShellStepFailure { .. } => "SHELL_STEP_FAILURE",
            Self::ValidationFailure(_) => "VALIDATION_FAILURE",
            Self::DiscoveryUnavailable { .. } => "DISCOVERY_UNAVAILABLE",
            Self::CorruptRegistry { .. } => "CORRUPT_REGISTRY",
        }
    }
}

pub type McpiResult<T> = Result<T, McpiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_failure_keeps_tool_output_verbatim() {
        let err = McpiError::shell("npm run build", "error TS2304: Cannot find name 'x'");
        assert_eq!(
            err.to_string(),
            "npm run build failed: error TS2304: Cannot find name 'x'"
        );
        assert_eq!(err.code(), "SHELL_STEP_FAILURE");
    }

    #[test]
    fn not_registered_names_the_server() {
        let err = McpiError::NotRegistered("@scope/foo".to_string());
        assert!(err.to_string().contains("@scope/foo"));
    }
}
