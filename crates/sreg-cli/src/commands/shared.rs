//! Helpers shared by the migration-facing commands.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use sreg_core::{MigrationReport, OperationOutcome};
use sreg_config::SregConfig;
use sreg_migrate::{ExecuteMode, ExecuteOptions, PlanOptions, RetryConfig};

use crate::cli::root_commands::ConflictPolicyArg;

pub fn plan_options(
    conflict_policy: ConflictPolicyArg,
    no_compat_check: bool,
    sync_compat: bool,
) -> PlanOptions {
    PlanOptions {
        conflict_policy: conflict_policy.into(),
        check_compatibility: !no_compat_check,
        sync_compatibility: sync_compat,
    }
}

/// Execution options from config plus command-line overrides, with Ctrl-C
/// wired into run cancellation.
pub fn execute_options(
    config: &SregConfig,
    dry_run: bool,
    concurrency: Option<usize>,
) -> ExecuteOptions {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling remaining operations");
            let _ = tx.send(true);
        }
    });

    ExecuteOptions {
        mode: if dry_run {
            ExecuteMode::DryRun
        } else {
            ExecuteMode::Live
        },
        concurrency: concurrency.unwrap_or(config.migration.concurrency),
        retry: RetryConfig {
            max_attempts: config.migration.retry_attempts,
            base_delay: Duration::from_millis(config.migration.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.migration.retry_max_delay_ms),
        },
        cancel: Some(rx),
    }
}

/// One report entry flattened for rendering.
#[derive(Debug, Serialize)]
pub struct OperationLine {
    pub operation: &'static str,
    pub subject: String,
    pub context: String,
    pub risk: String,
    pub outcome: &'static str,
    pub detail: String,
}

/// Run result as plain serde data for the output layer.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<usize>,
    pub operations: Vec<OperationLine>,
}

impl RunSummary {
    #[must_use]
    pub fn from_report(report: &MigrationReport) -> Self {
        let operations = report
            .entries
            .iter()
            .map(|entry| {
                let (outcome, detail) = match &entry.outcome {
                    OperationOutcome::Applied => ("applied", String::new()),
                    OperationOutcome::Skipped { reason } => ("skipped", reason.clone()),
                    OperationOutcome::Failed { cause } => ("failed", cause.clone()),
                };
                OperationLine {
                    operation: entry.operation.op.kind(),
                    subject: entry
                        .operation
                        .op
                        .subject()
                        .unwrap_or("-")
                        .to_string(),
                    context: entry.operation.op.context().to_string(),
                    risk: entry.operation.risk.to_string(),
                    outcome,
                    detail,
                }
            })
            .collect();

        Self {
            dry_run: report.dry_run,
            applied: report.applied,
            skipped: report.skipped,
            failed: report.failed,
            cancelled_at: report.cancelled_at,
            operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sreg_core::{MigrationOperation, PlannedOperation, RiskClass, SchemaType};

    #[test]
    fn run_summary_flattens_report_entries() {
        let mut report = MigrationReport {
            dry_run: true,
            ..MigrationReport::default()
        };
        report.record(
            PlannedOperation {
                op: MigrationOperation::RegisterSchema {
                    subject: "user-value".to_string(),
                    context: ".".to_string(),
                    schema: "{}".to_string(),
                    schema_type: SchemaType::Avro,
                    references: Vec::new(),
                    expected_version: 1,
                },
                risk: RiskClass::Safe,
                justification: "missing at destination".to_string(),
            },
            OperationOutcome::Applied,
        );
        report.record(
            PlannedOperation {
                op: MigrationOperation::CreateContext {
                    context: "staging".to_string(),
                },
                risk: RiskClass::Safe,
                justification: "context missing at destination".to_string(),
            },
            OperationOutcome::Skipped {
                reason: "context already exists".to_string(),
            },
        );

        let summary = RunSummary::from_report(&report);
        assert!(summary.dry_run);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.operations.len(), 2);
        assert_eq!(summary.operations[0].operation, "register_schema");
        assert_eq!(summary.operations[0].outcome, "applied");
        assert_eq!(summary.operations[1].subject, "-");
        assert_eq!(summary.operations[1].detail, "context already exists");
    }
}
