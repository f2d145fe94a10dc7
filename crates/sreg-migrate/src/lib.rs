//! Migration engine: snapshot capture, plan compilation, and plan execution.
//!
//! The three stages compose into the export/import/sync pipeline:
//!
//! 1. [`build_snapshot`] walks a source registry into an immutable
//!    [`sreg_core::MigrationSnapshot`];
//! 2. [`compile_plan`] diffs a snapshot against destination state into an
//!    ordered, idempotent [`sreg_core::MigrationPlan`] — pure, no I/O;
//! 3. [`execute_plan`] applies the plan with bounded concurrency, retries,
//!    and dry-run support, producing a [`sreg_core::MigrationReport`].

pub mod error;
pub mod execute;
pub mod plan;
pub mod snapshot;

pub use error::MigrateError;
pub use execute::{ExecuteMode, ExecuteOptions, RetryConfig, execute_plan};
pub use plan::{ConflictPolicy, PlanOptions, compile_plan};
pub use snapshot::{CaptureScope, build_snapshot};
