//! Plan executor: apply a migration plan against a destination registry.
//!
//! Live mode mutates; dry-run re-validates every precondition against a
//! fresh read of the destination and reports what would happen, without a
//! single mutating call on any path.
//!
//! Subject chains run concurrently under a bounded semaphore; within a
//! chain, plan order is strict and a failed registration blocks the rest of
//! that subject's versions. Other subjects are unaffected — blast radius is
//! the failing subject's version chain.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use sreg_client::{RegistryApi, RegistryError};
use sreg_core::{
    MigrationOperation, MigrationPlan, MigrationReport, OperationOutcome, PlannedOperation,
    RiskClass, schemas_equal,
};

/// Whether execution mutates the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecuteMode {
    /// Re-validate preconditions and report; never mutate.
    #[default]
    DryRun,
    /// Apply operations.
    Live,
}

/// Bounded exponential backoff for transient registry failures.
///
/// 4xx rejections are never retried; see [`RegistryError::is_transient`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub mode: ExecuteMode,
    /// Upper bound on concurrently running subject chains; 0 reads as 1.
    pub concurrency: usize,
    pub retry: RetryConfig,
    /// Run-scoped cancellation: flipping the watch value to `true` aborts
    /// queued and in-flight operations promptly. Applied operations stay
    /// committed — registry mutations are not transactional.
    pub cancel: Option<watch::Receiver<bool>>,
}

impl ExecuteOptions {
    /// Live execution with default retry and the given concurrency bound.
    #[must_use]
    pub fn live(concurrency: usize) -> Self {
        Self {
            mode: ExecuteMode::Live,
            concurrency,
            ..Self::default()
        }
    }
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

/// Execute `plan` against the destination behind `client`.
///
/// Context operations run first in plan order; subject chains then run
/// concurrently. The returned report covers every plan operation in order
/// and is sufficient to resume: re-running the same plan turns prior
/// Applied/Skipped operations into Skipped ones.
pub async fn execute_plan(
    plan: &MigrationPlan,
    client: Arc<dyn RegistryApi>,
    options: &ExecuteOptions,
) -> MigrationReport {
    let dry_run = options.mode == ExecuteMode::DryRun;
    let mut outcomes: Vec<Option<OperationOutcome>> = vec![None; plan.len()];

    // Phase 1: context operations, sequential, before anything references
    // the contexts they create.
    for (idx, planned) in plan.operations.iter().enumerate() {
        if let MigrationOperation::CreateContext { context } = &planned.op {
            let outcome = if is_cancelled(options.cancel.as_ref()) {
                cancelled_outcome()
            } else {
                run_create_context(client.as_ref(), context, &options.retry).await
            };
            outcomes[idx] = Some(outcome);
        }
    }

    // Phase 2: subject chains, bounded concurrency, strict order inside a
    // chain.
    let mut chains: BTreeMap<(String, String), Vec<(usize, PlannedOperation)>> = BTreeMap::new();
    for (idx, planned) in plan.operations.iter().enumerate() {
        let Some(subject) = planned.op.subject() else {
            continue;
        };
        chains
            .entry((planned.op.context().to_string(), subject.to_string()))
            .or_default()
            .push((idx, planned.clone()));
    }

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut join_set: JoinSet<Vec<(usize, OperationOutcome)>> = JoinSet::new();
    for (_, ops) in chains {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let retry = options.retry.clone();
        let cancel = options.cancel.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            run_chain(client, ops, &retry, cancel.as_ref(), dry_run).await
        });
    }
    while let Some(chain_result) = join_set.join_next().await {
        let chain_outcomes = chain_result.expect("subject chain task panicked");
        for (idx, outcome) in chain_outcomes {
            outcomes[idx] = Some(outcome);
        }
    }

    // Assemble in plan order.
    let mut report = MigrationReport {
        dry_run,
        ..MigrationReport::default()
    };
    for (idx, planned) in plan.operations.iter().enumerate() {
        let outcome = outcomes[idx].take().unwrap_or_else(cancelled_outcome);
        report.record(planned.clone(), outcome);
    }
    report.cancelled_at = report.entries.iter().position(|e| {
        matches!(&e.outcome, OperationOutcome::Skipped { reason } if reason == CANCELLED)
    });
    tracing::info!(
        applied = report.applied,
        skipped = report.skipped,
        failed = report.failed,
        dry_run,
        "migration run finished"
    );
    report
}

const CANCELLED: &str = "cancelled";

fn cancelled_outcome() -> OperationOutcome {
    OperationOutcome::Skipped {
        reason: CANCELLED.to_string(),
    }
}

async fn run_chain(
    client: Arc<dyn RegistryApi>,
    ops: Vec<(usize, PlannedOperation)>,
    retry: &RetryConfig,
    cancel: Option<&watch::Receiver<bool>>,
    dry_run: bool,
) -> Vec<(usize, OperationOutcome)> {
    let mut results = Vec::with_capacity(ops.len());
    let mut blocked: Option<String> = None;

    for (idx, planned) in ops {
        if is_cancelled(cancel) {
            results.push((idx, cancelled_outcome()));
            continue;
        }
        if let Some(reason) = &blocked {
            results.push((
                idx,
                OperationOutcome::Skipped {
                    reason: reason.clone(),
                },
            ));
            continue;
        }

        let outcome = run_operation(client.as_ref(), &planned, retry, cancel, dry_run).await;
        // A failed registration invalidates every later version of the same
        // subject, and so does an unresolved conflict: registering on top of
        // a divergent occupant would half-resolve what the policy refused to
        // touch. Version order matters.
        if planned.risk == RiskClass::Conflict {
            blocked = Some("held back by unresolved conflict earlier in subject chain".to_string());
        } else if let (OperationOutcome::Failed { cause }, MigrationOperation::RegisterSchema { .. }) =
            (&outcome, &planned.op)
        {
            blocked = Some(format!("blocked by earlier failure in subject chain: {cause}"));
        }
        results.push((idx, outcome));
    }
    results
}

async fn run_operation(
    client: &dyn RegistryApi,
    planned: &PlannedOperation,
    retry: &RetryConfig,
    cancel: Option<&watch::Receiver<bool>>,
    dry_run: bool,
) -> OperationOutcome {
    if planned.risk == RiskClass::Conflict {
        return OperationOutcome::Skipped {
            reason: "unresolved conflict; re-plan with skip-existing or overwrite".to_string(),
        };
    }

    match &planned.op {
        MigrationOperation::Noop { reason, .. } => OperationOutcome::Skipped {
            reason: reason.clone(),
        },
        MigrationOperation::CreateContext { .. } => {
            // Handled in phase 1; unreachable through chains.
            OperationOutcome::Skipped {
                reason: "context handled before subject operations".to_string(),
            }
        }
        MigrationOperation::RegisterSchema {
            subject,
            context,
            schema,
            schema_type,
            references,
            expected_version,
        } => {
            run_register(
                client,
                retry,
                cancel,
                dry_run,
                subject,
                context,
                schema,
                *schema_type,
                references,
                *expected_version,
            )
            .await
        }
        MigrationOperation::SetCompatibility {
            subject,
            context,
            mode,
        } => {
            let current = match with_retry(retry, cancel, || {
                client.get_compatibility(subject, context)
            })
            .await
            {
                Ok(current) => current,
                Err(e) => {
                    return OperationOutcome::Failed {
                        cause: format!("precondition read failed: {e}"),
                    };
                }
            };
            if current == Some(*mode) {
                return OperationOutcome::Skipped {
                    reason: "already set".to_string(),
                };
            }
            if dry_run {
                return OperationOutcome::Applied;
            }
            match with_retry(retry, cancel, || {
                client.set_compatibility(subject, *mode, context)
            })
            .await
            {
                Ok(()) => OperationOutcome::Applied,
                Err(e) => OperationOutcome::Failed {
                    cause: e.to_string(),
                },
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_register(
    client: &dyn RegistryApi,
    retry: &RetryConfig,
    cancel: Option<&watch::Receiver<bool>>,
    dry_run: bool,
    subject: &str,
    context: &str,
    schema: &str,
    schema_type: sreg_core::SchemaType,
    references: &[sreg_core::SchemaReference],
    expected_version: u32,
) -> OperationOutcome {
    // Fresh precondition read: the destination may have drifted since the
    // plan was compiled.
    let current = match with_retry(retry, cancel, || fetch_subject_state(client, subject, context))
        .await
    {
        Ok(current) => current,
        Err(e) => {
            return OperationOutcome::Failed {
                cause: format!("precondition read failed: {e}"),
            };
        }
    };

    if current
        .iter()
        .any(|(_, existing)| schemas_equal(existing, schema, schema_type))
    {
        return OperationOutcome::Skipped {
            reason: "already present".to_string(),
        };
    }
    if current.last().is_some_and(|(n, _)| *n >= expected_version) {
        return OperationOutcome::Failed {
            cause: format!(
                "stale plan: destination version {expected_version} now holds a different schema"
            ),
        };
    }

    if dry_run {
        // Ask the destination itself whether it would accept the schema.
        return match with_retry(retry, cancel, || {
            client.check_compatibility(subject, schema, schema_type, context)
        })
        .await
        {
            Ok(true) => OperationOutcome::Applied,
            Ok(false) => OperationOutcome::Failed {
                cause: "destination would reject: incompatible with current versions".to_string(),
            },
            Err(e) => OperationOutcome::Failed {
                cause: format!("compatibility check failed: {e}"),
            },
        };
    }

    match with_retry(retry, cancel, || {
        client.register_schema(subject, context, schema, schema_type, references)
    })
    .await
    {
        Ok(id) => {
            tracing::debug!(subject, context, id, expected_version, "registered schema");
            OperationOutcome::Applied
        }
        Err(e) => OperationOutcome::Failed {
            cause: e.to_string(),
        },
    }
}

async fn run_create_context(
    client: &dyn RegistryApi,
    context: &str,
    retry: &RetryConfig,
) -> OperationOutcome {
    match with_retry(retry, None, || client.list_contexts()).await {
        Ok(existing) if existing.iter().any(|c| c == context) => OperationOutcome::Skipped {
            reason: "context already exists".to_string(),
        },
        // Contexts materialize implicitly with the first qualified
        // registration; nothing to send ahead of time.
        Ok(_) => OperationOutcome::Applied,
        Err(e) => OperationOutcome::Failed {
            cause: format!("precondition read failed: {e}"),
        },
    }
}

/// Destination subject state as `(version, schema)` pairs, ascending.
/// A subject that does not exist yet reads as empty.
async fn fetch_subject_state(
    client: &dyn RegistryApi,
    subject: &str,
    context: &str,
) -> Result<Vec<(u32, String)>, RegistryError> {
    let numbers = match client.list_versions(subject, context).await {
        Ok(numbers) => numbers,
        Err(RegistryError::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut state = Vec::with_capacity(numbers.len());
    for number in numbers {
        let version = client.get_schema(subject, number, context).await?;
        state.push((version.version, version.schema));
    }
    Ok(state)
}

/// Bounded retry with exponential backoff. Transient failures (transport,
/// 5xx, rate limiting) are retried up to `max_attempts`; anything else is
/// returned immediately. Rate-limit responses override the backoff delay
/// with the server's `Retry-After`, capped at `max_delay`.
async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    cancel: Option<&watch::Receiver<bool>>,
    mut call: F,
) -> Result<T, RegistryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RegistryError>>,
{
    let mut attempt = 1u32;
    let mut delay = retry.base_delay;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                let wait = match &e {
                    RegistryError::RateLimited { retry_after_secs } => {
                        Duration::from_secs(*retry_after_secs).min(retry.max_delay)
                    }
                    _ => delay,
                };
                tracing::warn!(attempt, error = %e, wait_ms = wait.as_millis() as u64,
                    "transient registry failure; backing off");
                tokio::time::sleep(wait).await;
                if is_cancelled(cancel) {
                    return Err(e);
                }
                delay = delay.saturating_mul(2).min(retry.max_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanOptions, compile_plan};
    use crate::snapshot::{CaptureScope, build_snapshot};
    use pretty_assertions::assert_eq;
    use sreg_client::{Fault, FaultPoint, MemoryRegistry};
    use sreg_core::{DEFAULT_CONTEXT, SchemaType};

    const V1: &str = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"}]}"#;
    const V2: &str = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"},{"name":"name","type":"string","default":""}]}"#;
    const OTHER: &str = r#"{"type":"record","name":"Other","fields":[{"name":"x","type":"int"}]}"#;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    async fn plan_against(
        source: &MemoryRegistry,
        destination: &MemoryRegistry,
    ) -> sreg_core::MigrationPlan {
        let snapshot = build_snapshot(source, "mem://source", &CaptureScope::everything())
            .await
            .unwrap();
        let dest_state = build_snapshot(destination, "mem://dest", &CaptureScope::everything())
            .await
            .unwrap();
        compile_plan(&snapshot, &dest_state, &PlanOptions::default())
    }

    fn live_options() -> ExecuteOptions {
        ExecuteOptions {
            mode: ExecuteMode::Live,
            concurrency: 4,
            retry: fast_retry(),
            cancel: None,
        }
    }

    #[tokio::test]
    async fn live_run_applies_then_replay_skips() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        source.seed("user-value", DEFAULT_CONTEXT, V2, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());

        let plan = plan_against(&source, &destination).await;
        let report = execute_plan(&plan, destination.clone(), &live_options()).await;
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed, 0);
        assert!(report.is_clean());
        assert_eq!(destination.version_count(), 2);

        // Idempotence: the same plan replayed does nothing new.
        let replay = execute_plan(&plan, destination.clone(), &live_options()).await;
        assert_eq!(replay.applied, 0);
        assert_eq!(replay.skipped, 2);
        assert_eq!(replay.failed, 0);
        assert_eq!(destination.version_count(), 2);
    }

    #[tokio::test]
    async fn dry_run_reports_without_mutating() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());

        let plan = plan_against(&source, &destination).await;
        let options = ExecuteOptions {
            mode: ExecuteMode::DryRun,
            ..live_options()
        };
        let report = execute_plan(&plan, destination.clone(), &options).await;

        assert!(report.dry_run);
        assert_eq!(report.applied, 1);
        assert_eq!(destination.version_count(), 0);
    }

    #[tokio::test]
    async fn failed_register_blocks_its_chain_only() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        source.seed("user-value", DEFAULT_CONTEXT, V2, SchemaType::Avro);
        source.seed("order-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());
        destination.inject_fault(Fault::terminal(
            FaultPoint::RegisterSchema,
            "user-value",
            1,
        ));

        let plan = plan_against(&source, &destination).await;
        let report = execute_plan(&plan, destination.clone(), &live_options()).await;

        assert_eq!(report.applied, 1); // order-value v1
        assert_eq!(report.failed, 1); // user-value v1
        assert_eq!(report.skipped, 1); // user-value v2, blocked

        let blocked = report
            .entries
            .iter()
            .find_map(|e| match &e.outcome {
                OperationOutcome::Skipped { reason } if reason.contains("blocked") => Some(reason),
                _ => None,
            })
            .expect("later version of the failing subject should be blocked");
        assert!(blocked.contains("blocked by earlier failure"));
        assert_eq!(destination.version_count(), 1);
    }

    #[tokio::test]
    async fn unresolved_conflict_holds_back_the_rest_of_the_chain() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        source.seed("user-value", DEFAULT_CONTEXT, V2, SchemaType::Avro);
        // Divergent occupant at the slot v1 would land in.
        let destination = Arc::new(MemoryRegistry::new());
        destination.seed("user-value", DEFAULT_CONTEXT, OTHER, SchemaType::Avro);

        let plan = plan_against(&source, &destination).await;
        assert_eq!(plan.conflict_count(), 1);

        let report = execute_plan(&plan, destination.clone(), &live_options()).await;
        // Nothing lands on top of the divergent history; v2 must not be
        // appended after the conflicted slot.
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(destination.version_count(), 1);

        let held = report
            .entries
            .iter()
            .find_map(|e| match &e.outcome {
                OperationOutcome::Skipped { reason } if reason.contains("held back") => {
                    Some(reason)
                }
                _ => None,
            })
            .expect("trailing version of the conflicted subject should be held back");
        assert!(held.contains("unresolved conflict"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());
        destination.inject_fault(Fault::transient(
            FaultPoint::RegisterSchema,
            "user-value",
            2,
        ));

        let plan = plan_against(&source, &destination).await;
        let report = execute_plan(&plan, destination.clone(), &live_options()).await;
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(destination.version_count(), 1);
    }

    #[tokio::test]
    async fn retries_exhaust_into_terminal_failure() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());
        destination.inject_fault(Fault::transient(
            FaultPoint::RegisterSchema,
            "user-value",
            5,
        ));

        let plan = plan_against(&source, &destination).await;
        let report = execute_plan(&plan, destination.clone(), &live_options()).await;
        assert_eq!(report.failed, 1);
        assert_eq!(destination.version_count(), 0);
    }

    #[tokio::test]
    async fn terminal_rejections_are_not_retried() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());
        // One terminal fault; a retry would succeed — and must not happen.
        destination.inject_fault(Fault::terminal(
            FaultPoint::RegisterSchema,
            "user-value",
            1,
        ));

        let plan = plan_against(&source, &destination).await;
        let report = execute_plan(&plan, destination.clone(), &live_options()).await;
        assert_eq!(report.failed, 1);
        assert_eq!(destination.version_count(), 0);
    }

    #[tokio::test]
    async fn pre_cancelled_run_skips_everything() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let plan = plan_against(&source, &destination).await;
        let options = ExecuteOptions {
            cancel: Some(rx),
            ..live_options()
        };
        let report = execute_plan(&plan, destination.clone(), &options).await;

        assert_eq!(report.applied, 0);
        assert_eq!(report.cancelled_at, Some(0));
        assert_eq!(destination.version_count(), 0);
    }

    #[tokio::test]
    async fn drift_after_planning_is_detected_as_stale() {
        let source = MemoryRegistry::new();
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::new());

        let plan = plan_against(&source, &destination).await;
        // Concurrent writer gets there first with a different schema.
        destination.seed("user-value", DEFAULT_CONTEXT, OTHER, SchemaType::Avro);

        let report = execute_plan(&plan, destination.clone(), &live_options()).await;
        assert_eq!(report.failed, 1);
        let cause = match &report.entries[0].outcome {
            OperationOutcome::Failed { cause } => cause,
            other => panic!("expected stale failure, got {other:?}"),
        };
        assert!(cause.contains("stale plan"));
        // The drifted version is untouched.
        assert_eq!(destination.version_count(), 1);
    }

    #[tokio::test]
    async fn dry_run_predicts_destination_rejection() {
        let source = MemoryRegistry::new();
        // Candidate drops a required field relative to what the destination
        // already holds.
        source.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        let destination = Arc::new(MemoryRegistry::with_default_compatibility(
            sreg_core::CompatibilityMode::Backward,
        ));
        let required = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"},{"name":"name","type":"string"}]}"#;
        destination.seed("user-value", DEFAULT_CONTEXT, required, SchemaType::Avro);

        let snapshot = build_snapshot(&source, "mem://source", &CaptureScope::everything())
            .await
            .unwrap();
        let dest_state = build_snapshot(
            destination.as_ref(),
            "mem://dest",
            &CaptureScope::everything(),
        )
        .await
        .unwrap();
        let plan = compile_plan(
            &snapshot,
            &dest_state,
            &PlanOptions {
                conflict_policy: crate::plan::ConflictPolicy::Overwrite,
                ..PlanOptions::default()
            },
        );

        let options = ExecuteOptions {
            mode: ExecuteMode::DryRun,
            ..live_options()
        };
        let report = execute_plan(&plan, destination.clone(), &options).await;
        assert_eq!(report.failed, 1);
        assert_eq!(destination.version_count(), 1);
    }
}
