//! Migration engine error types.
//!
//! Partial-capture failures are not errors: they are recorded as gaps on the
//! snapshot. Execution failures are not errors either: they are per-operation
//! outcomes in the migration report. What remains here is the fatal taxonomy.

use sreg_client::RegistryError;
use thiserror::Error;

/// Fatal errors from the migration engine.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The source registry could not be listed at all.
    #[error("source registry unreachable: {0}")]
    SourceUnreachable(#[source] RegistryError),

    /// An explicitly named subject pattern matched nothing.
    #[error("no subject matches pattern '{pattern}'")]
    SubjectNotFound { pattern: String },

    /// A subject pattern is not a valid glob.
    #[error("invalid subject pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
