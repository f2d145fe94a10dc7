use anyhow::Context;
use serde::Serialize;

use sreg_client::RegistryApi;
use sreg_config::SregConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::VersionsArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct VersionLine {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u32>,
    schema_type: String,
    references: usize,
}

pub async fn run(
    args: &VersionsArgs,
    config: &SregConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let client = bootstrap::source_client(config)?;
    let context = args
        .context
        .clone()
        .unwrap_or_else(|| config.general.default_context.clone());

    let numbers = client
        .list_versions(&args.subject, &context)
        .await
        .with_context(|| format!("failed to list versions of '{}'", args.subject))?;

    let mut lines = Vec::with_capacity(numbers.len());
    for number in numbers {
        let version = client
            .get_schema(&args.subject, number, &context)
            .await
            .with_context(|| format!("failed to fetch '{}' version {number}", args.subject))?;
        lines.push(VersionLine {
            version: version.version,
            id: version.id,
            schema_type: version.schema_type.to_string(),
            references: version.references.len(),
        });
    }
    output(&lines, flags.format)
}
