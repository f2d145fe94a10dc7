use anyhow::Context;
use serde::Serialize;

use sreg_config::SregConfig;
use sreg_migrate::{CaptureScope, build_snapshot};

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::ExportArgs;
use crate::output::output;
use crate::progress::Progress;

#[derive(Debug, Serialize)]
struct GapLine {
    subject: String,
    context: String,
    version: u32,
    cause: String,
}

#[derive(Debug, Serialize)]
struct ExportSummary {
    archive: String,
    source: String,
    contexts: usize,
    subjects: usize,
    versions: usize,
    gaps: Vec<GapLine>,
}

pub async fn run(
    args: &ExportArgs,
    config: &SregConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let client = bootstrap::source_client(config)?;
    let scope = CaptureScope {
        subjects: args.subjects.clone(),
        contexts: args.contexts.clone(),
        all_versions: args.all_versions,
    };

    let progress = Progress::spinner(!flags.quiet, "capturing source registry");
    let snapshot = build_snapshot(&client, client.base_url(), &scope)
        .await
        .context("failed to capture source registry")?;
    progress.finish_clear();

    sreg_archive::write_archive(&args.output, &snapshot)
        .with_context(|| format!("failed to write archive {}", args.output.display()))?;

    let summary = ExportSummary {
        archive: args.output.display().to_string(),
        source: snapshot.source.clone(),
        contexts: snapshot.contexts.len(),
        subjects: snapshot.subject_count(),
        versions: snapshot.version_count(),
        gaps: snapshot
            .gaps
            .iter()
            .map(|gap| GapLine {
                subject: gap.subject.clone(),
                context: gap.context.clone(),
                version: gap.version,
                cause: gap.cause.clone(),
            })
            .collect(),
    };
    output(&summary, flags.format)
}
