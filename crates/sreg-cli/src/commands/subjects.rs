use anyhow::Context;

use sreg_client::RegistryApi;
use sreg_config::SregConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::SubjectsArgs;
use crate::output::output;

pub async fn run(
    args: &SubjectsArgs,
    config: &SregConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let client = bootstrap::source_client(config)?;
    let context = args
        .context
        .clone()
        .unwrap_or_else(|| config.general.default_context.clone());

    let subjects = client
        .list_subjects(&context)
        .await
        .with_context(|| format!("failed to list subjects in context '{context}'"))?;
    output(&subjects, flags.format)
}
