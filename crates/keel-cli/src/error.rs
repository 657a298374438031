//! CLI error types with exit code handling

use keel_core::{CoreError, PartitionError};
use keel_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A rendered document is not valid YAML
    #[error("Parse error: {message}")]
    #[diagnostic(code(keel::cli::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Resources not ready before the deadline
    #[error("Timed out: {message}")]
    #[diagnostic(
        code(keel::cli::timeout),
        help("raise --timeout or inspect the listed resources with kubectl describe")
    )]
    Timeout { message: String },

    /// Interrupted before the wait finished
    #[error("Cancelled: {message}")]
    #[diagnostic(code(keel::cli::cancelled))]
    Cancelled { message: String },

    /// Cluster access failed
    #[error("Cluster error: {message}")]
    #[diagnostic(code(keel::cli::cluster))]
    Cluster { message: String },

    /// Invalid flags or flag combinations
    #[error("Invalid input: {message}")]
    #[diagnostic(code(keel::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(keel::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Parse { .. } => exit_codes::PARSE_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Cancelled { .. } => exit_codes::CANCELLED,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<walkdir::Error> for CliError {
    fn from(err: walkdir::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Io {
            message: format!("failed to encode output: {}", err),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Parse { .. } => CliError::Parse {
                message: err.to_string(),
                help: Some("render the chart again and check the named file".to_string()),
            },
            other => CliError::input(other.to_string()),
        }
    }
}

impl From<PartitionError> for CliError {
    fn from(err: PartitionError) -> Self {
        let (error, partial) = err.into_parts();
        let mut cli = CliError::from(error);
        if let CliError::Parse { help, .. } = &mut cli {
            *help = Some(format!(
                "{} hook(s) and {} manifest(s) were read before the failure",
                partial.hooks.len(),
                partial.manifests.len()
            ));
        }
        cli
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Timeout(message) => CliError::Timeout { message },
            KubeError::WaitCancelled(message) => CliError::Cancelled { message },
            KubeError::InvalidConfig(message) => CliError::input(message),
            other => CliError::Cluster {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
