//! Migration plan model: ordered, idempotent operations with risk classes.

use serde::{Deserialize, Serialize};

use crate::enums::{CompatibilityMode, RiskClass, SchemaType};
use crate::snapshot::SchemaReference;

/// One reconciliation step against a destination registry.
///
/// Every operation is idempotent: re-applying it against a destination
/// already in the target state is detected as a no-op before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MigrationOperation {
    /// Register a schema as the next version of `subject`.
    RegisterSchema {
        subject: String,
        context: String,
        schema: String,
        schema_type: SchemaType,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        references: Vec<SchemaReference>,
        /// Version number this registration is expected to land on, derived
        /// from destination state at plan time. Used for drift detection at
        /// execution time, never sent to the registry.
        expected_version: u32,
    },
    /// Set the subject-level compatibility mode.
    SetCompatibility {
        subject: String,
        context: String,
        mode: CompatibilityMode,
    },
    /// Ensure a context exists at the destination.
    CreateContext { context: String },
    /// Nothing to do for this snapshot entry; the reason says why.
    Noop {
        subject: String,
        context: String,
        version: u32,
        reason: String,
    },
}

impl MigrationOperation {
    /// Context this operation touches.
    #[must_use]
    pub fn context(&self) -> &str {
        match self {
            Self::RegisterSchema { context, .. }
            | Self::SetCompatibility { context, .. }
            | Self::CreateContext { context }
            | Self::Noop { context, .. } => context,
        }
    }

    /// Subject this operation touches, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::RegisterSchema { subject, .. }
            | Self::SetCompatibility { subject, .. }
            | Self::Noop { subject, .. } => Some(subject),
            Self::CreateContext { .. } => None,
        }
    }

    /// Whether executing this operation mutates the destination.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Noop { .. })
    }

    /// Short operation name for logs and reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RegisterSchema { .. } => "register_schema",
            Self::SetCompatibility { .. } => "set_compatibility",
            Self::CreateContext { .. } => "create_context",
            Self::Noop { .. } => "noop",
        }
    }
}

/// An operation plus its risk classification and justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOperation {
    #[serde(flatten)]
    pub op: MigrationOperation,
    pub risk: RiskClass,
    /// Human-readable explanation of why the operation was emitted and why
    /// it carries its risk class. Plain text, no formatting.
    pub justification: String,
}

/// Ordered sequence of planned operations.
///
/// Invariants (enforced by the compiler, relied on by the executor):
/// - operations for a given subject appear in ascending version order;
/// - a `CreateContext` precedes every operation referencing that context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub operations: Vec<PlannedOperation>,
}

impl MigrationPlan {
    /// Number of operations that would mutate the destination.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.operations.iter().filter(|p| p.op.is_mutation()).count()
    }

    /// Number of operations classified as conflicts.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|p| p.risk == RiskClass::Conflict)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
