use clap::Subcommand;

use sreg_core::CompatibilityMode;

/// Compatibility mode commands.
#[derive(Clone, Debug, Subcommand)]
pub enum CompatCommands {
    /// Get the compatibility mode of a subject at the source registry.
    Get {
        subject: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Set the compatibility mode of a subject at the destination registry.
    Set {
        subject: String,
        /// Mode wire name (e.g. BACKWARD, FULL_TRANSITIVE); case-insensitive.
        mode: CompatibilityMode,
        #[arg(long)]
        context: Option<String>,
    },
}
