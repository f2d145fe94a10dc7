//! Migration report model: what actually happened during an execution run.

use serde::{Deserialize, Serialize};

use crate::plan::PlannedOperation;

/// Outcome of one executed (or dry-run simulated) operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// The mutation was applied (or, in dry-run, would be applied).
    Applied,
    /// Nothing was done; the reason says why (already satisfied, blocked by
    /// an earlier failure in the same subject chain, cancelled, ...).
    Skipped { reason: String },
    /// The operation failed terminally after any retries.
    Failed { cause: String },
}

impl OperationOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One report line: the planned operation and what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub operation: PlannedOperation,
    pub outcome: OperationOutcome,
}

/// Result of executing (or dry-running) a migration plan.
///
/// Sufficient to resume a partial run: re-executing the same plan turns
/// prior Applied operations into Skipped ones (idempotence), so only the
/// previously Failed tail does new work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Outcomes in plan order.
    pub entries: Vec<ReportEntry>,
    /// Plan index at which a cancellation signal cut the run short, if any.
    /// Operations before the cut point retain their real outcomes; the rest
    /// are recorded as Skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<usize>,
    /// Whether this report came from a dry run (no mutations performed).
    pub dry_run: bool,
}

impl MigrationReport {
    /// Record one outcome, keeping the counters consistent.
    pub fn record(&mut self, operation: PlannedOperation, outcome: OperationOutcome) {
        match &outcome {
            OperationOutcome::Applied => self.applied += 1,
            OperationOutcome::Skipped { .. } => self.skipped += 1,
            OperationOutcome::Failed { .. } => self.failed += 1,
        }
        self.entries.push(ReportEntry { operation, outcome });
    }

    /// Failed entries in plan order.
    #[must_use]
    pub fn failures(&self) -> Vec<&ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_failed())
            .collect()
    }

    /// Whether every operation completed without failure or cancellation.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.cancelled_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{RiskClass, SchemaType};
    use crate::plan::MigrationOperation;
    use pretty_assertions::assert_eq;

    fn planned(subject: &str) -> PlannedOperation {
        PlannedOperation {
            op: MigrationOperation::RegisterSchema {
                subject: subject.to_string(),
                context: ".".to_string(),
                schema: "{}".to_string(),
                schema_type: SchemaType::Avro,
                references: Vec::new(),
                expected_version: 1,
            },
            risk: RiskClass::Safe,
            justification: "missing at destination".to_string(),
        }
    }

    #[test]
    fn record_keeps_counters_consistent() {
        let mut report = MigrationReport::default();
        report.record(planned("a"), OperationOutcome::Applied);
        report.record(
            planned("b"),
            OperationOutcome::Skipped {
                reason: "already present".to_string(),
            },
        );
        report.record(
            planned("c"),
            OperationOutcome::Failed {
                cause: "409 conflict".to_string(),
            },
        );

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.failures().len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn clean_report_has_no_failures_or_cut_point() {
        let mut report = MigrationReport::default();
        report.record(planned("a"), OperationOutcome::Applied);
        assert!(report.is_clean());

        report.cancelled_at = Some(1);
        assert!(!report.is_clean());
    }
}
