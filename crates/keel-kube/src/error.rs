//! Error types for keel-kube

use thiserror::Error;

/// Result type for keel-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while checking readiness
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// A cluster accessor could not fetch objects
    #[error("failed to list {kind} in namespace '{namespace}': {message}")]
    Fetch {
        kind: String,
        namespace: String,
        message: String,
    },

    /// Resources still not ready when the deadline passed
    #[error("timed out waiting for the condition: {0}")]
    Timeout(String),

    /// The caller cancelled the wait
    #[error("wait cancelled: {0}")]
    WaitCancelled(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KubeError {
    /// Whether the wait ended without the cluster converging
    pub fn is_timeout(&self) -> bool {
        matches!(self, KubeError::Timeout(_))
    }
}
