//! Error types for the audit pipeline.

use thiserror::Error;

use crate::admin::{CommandError, ConnectionError};
use rectifier_rbac::RequirementError;

/// Failures surfaced by the public pipeline operations.
///
/// Per-database and per-role command failures are never reported here;
/// they fold into an empty contribution for that item.
#[derive(Debug, Error)]
pub enum AuditError {
    /// No principal could be resolved, or the required permissions are
    /// malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The cluster could not be reached at all.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The cluster refused to enumerate its databases.
    #[error("Failed to list databases: {0}")]
    Listing(#[source] CommandError),
}

impl From<RequirementError> for AuditError {
    fn from(err: RequirementError) -> Self {
        AuditError::InvalidInput(err.to_string())
    }
}

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
