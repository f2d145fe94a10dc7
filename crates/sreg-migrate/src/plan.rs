//! Plan compiler: diff a snapshot against destination state into an ordered,
//! idempotent migration plan.
//!
//! `compile_plan` is pure — no I/O, no clock, no randomness — so the same
//! snapshot and destination state always produce a byte-identical plan.
//! That is what makes dry-run output reproducible.

use sreg_core::{
    CompatibilityMode, MigrationOperation, MigrationPlan, MigrationSnapshot, PlannedOperation,
    RiskClass, SchemaVersion, Subject, predict_violations, schemas_equal,
};

/// How to handle a destination slot already holding a different schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Leave the destination as-is and move on.
    SkipExisting,
    /// Register the snapshot's schema anyway, appending a new version.
    Overwrite,
    /// Surface the conflict in the plan; never auto-resolve.
    #[default]
    FailOnConflict,
}

impl ConflictPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SkipExisting => "skip-existing",
            Self::Overwrite => "overwrite",
            Self::FailOnConflict => "fail-on-conflict",
        }
    }
}

/// Compilation options.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub conflict_policy: ConflictPolicy,
    /// Pre-validate registrations against the destination's compatibility
    /// mode, marking predicted violations as risks.
    pub check_compatibility: bool,
    /// Emit `SetCompatibility` when the snapshot's recorded mode differs
    /// from the destination's.
    pub sync_compatibility: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            check_compatibility: true,
            sync_compatibility: false,
        }
    }
}

/// Compile the ordered operation sequence that reconciles `destination`
/// toward `snapshot`.
///
/// `destination` is a snapshot of the destination registry taken by the same
/// builder (empty for a fresh registry). Operations for a subject appear in
/// ascending version order; a `CreateContext` precedes every operation
/// referencing its context.
#[must_use]
pub fn compile_plan(
    snapshot: &MigrationSnapshot,
    destination: &MigrationSnapshot,
    options: &PlanOptions,
) -> MigrationPlan {
    let mut plan = MigrationPlan::default();

    for context in &snapshot.contexts {
        let dest_context = destination.context(&context.name);

        if dest_context.is_none() && !context.is_default {
            plan.operations.push(PlannedOperation {
                op: MigrationOperation::CreateContext {
                    context: context.name.clone(),
                },
                risk: RiskClass::Safe,
                justification: "context missing at destination".to_string(),
            });
        }

        for subject in &context.subjects {
            let dest_subject = dest_context.and_then(|c| c.subject(&subject.name));
            compile_subject(&mut plan, subject, dest_subject, options);
        }
    }

    plan
}

fn compile_subject(
    plan: &mut MigrationPlan,
    subject: &Subject,
    dest_subject: Option<&Subject>,
    options: &PlanOptions,
) {
    let dest_versions: &[SchemaVersion] = dest_subject.map_or(&[], |s| &s.versions);
    let dest_mode = dest_subject.and_then(|s| s.compatibility);

    // Simulated destination history: real versions plus registrations this
    // plan will append, used for slot numbering and compatibility priors.
    let mut simulated: Vec<(u32, String)> = dest_versions
        .iter()
        .map(|v| (v.version, v.schema.clone()))
        .collect();
    // Cursor over destination positions, advanced by matches and skips, so
    // each source version is compared against the slot it would occupy.
    let mut cursor = 0usize;

    for version in &subject.versions {
        if let Some(existing) = dest_versions
            .iter()
            .find(|d| schemas_equal(&d.schema, &version.schema, version.schema_type))
        {
            let position = dest_versions
                .iter()
                .position(|d| d.version == existing.version)
                .unwrap_or(cursor);
            cursor = cursor.max(position + 1);
            plan.operations.push(PlannedOperation {
                op: MigrationOperation::Noop {
                    subject: subject.name.clone(),
                    context: subject.context.clone(),
                    version: version.version,
                    reason: "already present".to_string(),
                },
                risk: RiskClass::Safe,
                justification: format!(
                    "destination version {} holds an identical schema",
                    existing.version
                ),
            });
            continue;
        }

        if cursor < dest_versions.len() {
            let occupant = &dest_versions[cursor];
            cursor += 1;
            compile_conflict(plan, subject, version, occupant, &mut simulated, dest_mode, options);
            continue;
        }

        let expected_version = simulated.last().map_or(1, |(n, _)| n + 1);
        let (risk, justification) = classify_register(
            version,
            &simulated,
            dest_mode,
            options,
            format!("not present at destination; lands at version {expected_version}"),
        );
        simulated.push((expected_version, version.schema.clone()));
        plan.operations.push(PlannedOperation {
            op: register_op(subject, version, expected_version),
            risk,
            justification,
        });
    }

    if options.sync_compatibility {
        if let Some(mode) = subject.compatibility {
            if dest_mode != Some(mode) {
                plan.operations.push(PlannedOperation {
                    op: MigrationOperation::SetCompatibility {
                        subject: subject.name.clone(),
                        context: subject.context.clone(),
                        mode,
                    },
                    risk: RiskClass::Safe,
                    justification: match dest_mode {
                        Some(current) => format!("destination mode differs ({current})"),
                        None => "destination has no subject-level mode".to_string(),
                    },
                });
            }
        }
    }
}

fn compile_conflict(
    plan: &mut MigrationPlan,
    subject: &Subject,
    version: &SchemaVersion,
    occupant: &SchemaVersion,
    simulated: &mut Vec<(u32, String)>,
    dest_mode: Option<CompatibilityMode>,
    options: &PlanOptions,
) {
    match options.conflict_policy {
        ConflictPolicy::FailOnConflict => {
            plan.operations.push(PlannedOperation {
                op: register_op(subject, version, occupant.version),
                risk: RiskClass::Conflict,
                justification: format!(
                    "destination version {} holds a different schema; policy {} refuses to resolve",
                    occupant.version,
                    ConflictPolicy::FailOnConflict.as_str()
                ),
            });
        }
        ConflictPolicy::SkipExisting => {
            plan.operations.push(PlannedOperation {
                op: MigrationOperation::Noop {
                    subject: subject.name.clone(),
                    context: subject.context.clone(),
                    version: version.version,
                    reason: "skipped by policy".to_string(),
                },
                risk: RiskClass::Safe,
                justification: format!(
                    "destination version {} holds a different schema; policy {} keeps it",
                    occupant.version,
                    ConflictPolicy::SkipExisting.as_str()
                ),
            });
        }
        ConflictPolicy::Overwrite => {
            let expected_version = simulated.last().map_or(1, |(n, _)| n + 1);
            let (_, justification) = classify_register(
                version,
                simulated,
                dest_mode,
                options,
                format!(
                    "overwriting: destination version {} differs; appending as version {expected_version}",
                    occupant.version
                ),
            );
            simulated.push((expected_version, version.schema.clone()));
            plan.operations.push(PlannedOperation {
                op: register_op(subject, version, expected_version),
                // A forced overwrite is a compatibility risk by definition.
                risk: RiskClass::CompatibilityRisk,
                justification,
            });
        }
    }
}

fn register_op(subject: &Subject, version: &SchemaVersion, expected_version: u32) -> MigrationOperation {
    MigrationOperation::RegisterSchema {
        subject: subject.name.clone(),
        context: subject.context.clone(),
        schema: version.schema.clone(),
        schema_type: version.schema_type,
        references: version.references.clone(),
        expected_version,
    }
}

/// Risk-classify a registration against the destination's compatibility
/// mode. Predicted violations mark the operation as a risk with the violated
/// rule in the justification; they never block plan generation — only the
/// destination registry's own check at execution time rejects.
fn classify_register(
    version: &SchemaVersion,
    priors: &[(u32, String)],
    dest_mode: Option<CompatibilityMode>,
    options: &PlanOptions,
    base_justification: String,
) -> (RiskClass, String) {
    if !options.check_compatibility {
        return (RiskClass::Safe, base_justification);
    }
    let Some(mode) = dest_mode else {
        return (RiskClass::Safe, base_justification);
    };
    let violations = predict_violations(&version.schema, version.schema_type, priors, mode);
    match violations.first() {
        None => (RiskClass::Safe, base_justification),
        Some(first) => (
            RiskClass::CompatibilityRisk,
            format!("{base_justification}; predicted violation {first}"),
        ),
    }
}
