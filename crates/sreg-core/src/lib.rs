//! # sreg-core
//!
//! Data model shared across all sreg crates:
//! - Snapshot types (subjects, versions, contexts, capture gaps)
//! - Migration plan types (operations, risk classes, justifications)
//! - Migration report types (per-operation outcomes, counts)
//! - Schema/compatibility enums
//! - Schema canonicalization for identity comparison
//!
//! Everything here is plain serde data. The engine crates own behavior;
//! the CLI renders these types directly, so no formatting lives here.

pub mod canonical;
pub mod compat;
pub mod enums;
pub mod plan;
pub mod report;
pub mod snapshot;

pub use canonical::{canonicalize, schemas_equal};
pub use compat::{CompatViolation, predict_violations};
pub use enums::{CompatibilityMode, RiskClass, SchemaType};
pub use plan::{MigrationOperation, MigrationPlan, PlannedOperation};
pub use report::{MigrationReport, OperationOutcome, ReportEntry};
pub use snapshot::{
    CaptureGap, ContextSnapshot, DEFAULT_CONTEXT, MigrationSnapshot, SchemaReference,
    SchemaVersion, Subject,
};
