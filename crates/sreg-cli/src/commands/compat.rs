use anyhow::Context;
use serde::Serialize;

use sreg_client::RegistryApi;
use sreg_config::SregConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::CompatCommands;
use crate::output::output;

#[derive(Debug, Serialize)]
struct CompatLine {
    subject: String,
    context: String,
    /// Wire mode name, or `null` when the subject inherits the registry
    /// default.
    mode: Option<String>,
}

pub async fn handle(
    action: &CompatCommands,
    config: &SregConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        CompatCommands::Get { subject, context } => {
            let client = bootstrap::source_client(config)?;
            let context = context
                .clone()
                .unwrap_or_else(|| config.general.default_context.clone());
            let mode = client
                .get_compatibility(subject, &context)
                .await
                .with_context(|| format!("failed to read compatibility mode of '{subject}'"))?;
            output(
                &CompatLine {
                    subject: subject.clone(),
                    context,
                    mode: mode.map(|m| m.to_string()),
                },
                flags.format,
            )
        }
        CompatCommands::Set {
            subject,
            mode,
            context,
        } => {
            let client = bootstrap::destination_client(config)?;
            let context = context
                .clone()
                .unwrap_or_else(|| config.general.default_context.clone());
            client
                .set_compatibility(subject, *mode, &context)
                .await
                .with_context(|| format!("failed to set compatibility mode of '{subject}'"))?;
            output(
                &CompatLine {
                    subject: subject.clone(),
                    context,
                    mode: Some(mode.to_string()),
                },
                flags.format,
            )
        }
    }
}
