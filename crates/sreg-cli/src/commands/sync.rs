use std::sync::Arc;

use anyhow::Context;

use sreg_config::SregConfig;
use sreg_migrate::{CaptureScope, build_snapshot, compile_plan, execute_plan};

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::SyncArgs;
use crate::commands::shared::{self, RunSummary};
use crate::output::output;
use crate::progress::Progress;

pub async fn run(args: &SyncArgs, config: &SregConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let source = bootstrap::source_client(config)?;
    let destination = bootstrap::destination_client(config)?;

    let progress = Progress::spinner(!flags.quiet, "capturing source registry");
    let scope = CaptureScope {
        subjects: args.subjects.clone(),
        contexts: args.contexts.clone(),
        all_versions: args.all_versions,
    };
    let snapshot = build_snapshot(&source, source.base_url(), &scope)
        .await
        .context("failed to capture source registry")?;

    progress.set_message("reading destination state");
    let dest_state = build_snapshot(
        &destination,
        destination.base_url(),
        &CaptureScope::everything(),
    )
    .await
    .context("failed to read destination registry")?;

    let plan = compile_plan(
        &snapshot,
        &dest_state,
        &shared::plan_options(args.conflict_policy, args.no_compat_check, args.sync_compat),
    );
    tracing::info!(
        operations = plan.len(),
        mutations = plan.mutation_count(),
        conflicts = plan.conflict_count(),
        dry_run = args.dry_run,
        "compiled sync plan"
    );

    progress.set_message(if args.dry_run {
        "validating plan (dry run)"
    } else {
        "applying plan"
    });
    let options = shared::execute_options(config, args.dry_run, args.concurrency);
    let report = execute_plan(&plan, Arc::new(destination), &options).await;
    progress.finish_clear();

    output(&RunSummary::from_report(&report), flags.format)?;

    if report.failed > 0 {
        anyhow::bail!("{} operation(s) failed", report.failed);
    }
    Ok(())
}
