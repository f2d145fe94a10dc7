//! Snapshot builder: walk a source registry into an immutable capture.

use globset::{Glob, GlobMatcher};
use sreg_core::{
    CaptureGap, ContextSnapshot, DEFAULT_CONTEXT, MigrationSnapshot, Subject,
};
use sreg_client::{RegistryApi, RegistryError};

use crate::error::MigrateError;

/// What to capture from a source.
#[derive(Debug, Clone, Default)]
pub struct CaptureScope {
    /// Subject-name glob patterns; empty captures every subject.
    pub subjects: Vec<String>,
    /// Contexts to capture; empty captures every context the source reports.
    pub contexts: Vec<String>,
    /// Capture the entire version history instead of only the latest version.
    pub all_versions: bool,
}

impl CaptureScope {
    /// Everything, full history.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            all_versions: true,
            ..Self::default()
        }
    }
}

struct PatternMatcher {
    pattern: String,
    matcher: GlobMatcher,
    hits: usize,
}

fn build_matchers(patterns: &[String]) -> Result<Vec<PatternMatcher>, MigrateError> {
    patterns
        .iter()
        .map(|pattern| {
            Glob::new(pattern)
                .map(|glob| PatternMatcher {
                    pattern: pattern.clone(),
                    matcher: glob.compile_matcher(),
                    hits: 0,
                })
                .map_err(|e| MigrateError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Capture a point-in-time snapshot of `client` limited to `scope`.
///
/// `source` is a human-readable descriptor (registry URL) recorded on the
/// snapshot. Per-version fetch failures are recorded as gaps rather than
/// aborting the capture; listing failures are fatal
/// ([`MigrateError::SourceUnreachable`]).
///
/// Ordering is deterministic: default context first, remaining contexts
/// lexicographic, subjects lexicographic, versions ascending.
///
/// # Errors
///
/// - [`MigrateError::SourceUnreachable`] if contexts or subjects cannot be
///   listed.
/// - [`MigrateError::SubjectNotFound`] if an explicitly named pattern
///   matches nothing in any captured context.
/// - [`MigrateError::InvalidPattern`] for malformed glob patterns.
pub async fn build_snapshot(
    client: &dyn RegistryApi,
    source: &str,
    scope: &CaptureScope,
) -> Result<MigrationSnapshot, MigrateError> {
    let mut matchers = build_matchers(&scope.subjects)?;

    let mut context_names = if scope.contexts.is_empty() {
        client
            .list_contexts()
            .await
            .map_err(MigrateError::SourceUnreachable)?
    } else {
        scope.contexts.clone()
    };
    if !context_names.iter().any(|c| c == DEFAULT_CONTEXT) && scope.contexts.is_empty() {
        context_names.push(DEFAULT_CONTEXT.to_string());
    }
    context_names.sort_unstable();
    context_names.dedup();
    // Default context first, rest lexicographic.
    context_names.sort_by_key(|c| (c != DEFAULT_CONTEXT, c.clone()));

    let mut contexts = Vec::with_capacity(context_names.len());
    let mut gaps: Vec<CaptureGap> = Vec::new();

    for context_name in &context_names {
        let mut subject_names = client
            .list_subjects(context_name)
            .await
            .map_err(MigrateError::SourceUnreachable)?;
        subject_names.sort_unstable();

        let mut context = ContextSnapshot::empty(context_name.clone());
        for subject_name in subject_names {
            if !matches_scope(&mut matchers, &subject_name) {
                continue;
            }
            match capture_subject(client, &subject_name, context_name, scope.all_versions, &mut gaps)
                .await
            {
                Ok(subject) => context.subjects.push(subject),
                Err(e) => {
                    // The subject was listed but its history is unreadable;
                    // record the hole and keep capturing.
                    tracing::warn!(subject = %subject_name, context = %context_name, error = %e,
                        "failed to capture subject");
                    gaps.push(CaptureGap {
                        subject: subject_name.clone(),
                        context: context_name.clone(),
                        version: 0,
                        cause: e.to_string(),
                    });
                }
            }
        }
        contexts.push(context);
    }

    if let Some(unmatched) = matchers.iter().find(|m| m.hits == 0) {
        return Err(MigrateError::SubjectNotFound {
            pattern: unmatched.pattern.clone(),
        });
    }

    Ok(MigrationSnapshot {
        source: source.to_string(),
        captured_at: chrono::Utc::now(),
        contexts,
        gaps,
    })
}

fn matches_scope(matchers: &mut [PatternMatcher], subject: &str) -> bool {
    if matchers.is_empty() {
        return true;
    }
    let mut matched = false;
    for m in matchers.iter_mut() {
        if m.matcher.is_match(subject) {
            m.hits += 1;
            matched = true;
        }
    }
    matched
}

async fn capture_subject(
    client: &dyn RegistryApi,
    subject: &str,
    context: &str,
    all_versions: bool,
    gaps: &mut Vec<CaptureGap>,
) -> Result<Subject, RegistryError> {
    let compatibility = match client.get_compatibility(subject, context).await {
        Ok(mode) => mode,
        Err(e) => {
            tracing::warn!(subject, context, error = %e, "failed to read compatibility mode");
            None
        }
    };

    let mut version_numbers = client.list_versions(subject, context).await?;
    version_numbers.sort_unstable();
    if !all_versions {
        version_numbers = version_numbers.last().copied().into_iter().collect();
    }

    let mut versions = Vec::with_capacity(version_numbers.len());
    for number in version_numbers {
        match client.get_schema(subject, number, context).await {
            Ok(version) => versions.push(version),
            Err(e) => {
                tracing::warn!(subject, context, version = number, error = %e,
                    "failed to fetch version; recording gap");
                gaps.push(CaptureGap {
                    subject: subject.to_string(),
                    context: context.to_string(),
                    version: number,
                    cause: e.to_string(),
                });
            }
        }
    }

    Ok(Subject {
        name: subject.to_string(),
        context: context.to_string(),
        versions,
        compatibility,
    })
}
