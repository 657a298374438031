//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("YAML parse error on {path}: {message}")]
    Parse { path: String, message: String },

    #[error("unknown {what}: {value:?}")]
    UnknownValue { what: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A failed partition, with everything accumulated before the failure
///
/// Manifests in `partial` are in discovery order, not kind order.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct PartitionError {
    #[source]
    pub error: CoreError,
    pub partial: Box<crate::partition::Partition>,
}

impl PartitionError {
    pub fn into_parts(self) -> (CoreError, crate::partition::Partition) {
        (self.error, *self.partial)
    }
}
