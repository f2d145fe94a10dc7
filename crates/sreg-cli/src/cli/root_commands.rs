use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use sreg_migrate::ConflictPolicy;

use crate::cli::subcommands::CompatCommands;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Capture the source registry into an archive file.
    Export(ExportArgs),
    /// Apply an archive file to the destination registry.
    Import(ImportArgs),
    /// Mirror the source registry into the destination directly.
    Sync(SyncArgs),
    /// List subjects at the source registry.
    Subjects(SubjectsArgs),
    /// List versions of a subject at the source registry.
    Versions(VersionsArgs),
    /// Subject compatibility modes.
    Compat {
        #[command(subcommand)]
        action: CompatCommands,
    },
}

/// Conflict handling for destination slots already holding a different schema.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConflictPolicyArg {
    /// Leave the destination as-is and move on.
    SkipExisting,
    /// Register the snapshot's schema anyway, appending a new version.
    Overwrite,
    /// Surface the conflict in the plan; never auto-resolve.
    FailOnConflict,
}

impl From<ConflictPolicyArg> for ConflictPolicy {
    fn from(arg: ConflictPolicyArg) -> Self {
        match arg {
            ConflictPolicyArg::SkipExisting => Self::SkipExisting,
            ConflictPolicyArg::Overwrite => Self::Overwrite,
            ConflictPolicyArg::FailOnConflict => Self::FailOnConflict,
        }
    }
}

/// Arguments for `sreg export`.
#[derive(Clone, Debug, Args)]
pub struct ExportArgs {
    /// Archive file to write.
    pub output: PathBuf,

    /// Subject-name glob pattern to capture (repeatable; default: all).
    #[arg(long = "subject")]
    pub subjects: Vec<String>,

    /// Context to capture (repeatable; default: all contexts the source reports).
    #[arg(long = "context")]
    pub contexts: Vec<String>,

    /// Capture the entire version history instead of only the latest version.
    #[arg(long)]
    pub all_versions: bool,
}

/// Arguments for `sreg import`.
#[derive(Clone, Debug, Args)]
pub struct ImportArgs {
    /// Archive file to read.
    pub input: PathBuf,

    /// Conflict handling policy.
    #[arg(long, value_enum, default_value_t = ConflictPolicyArg::FailOnConflict)]
    pub conflict_policy: ConflictPolicyArg,

    /// Validate the plan against a fresh destination read without mutating.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip compatibility pre-validation when planning.
    #[arg(long)]
    pub no_compat_check: bool,

    /// Also carry subject compatibility modes to the destination.
    #[arg(long)]
    pub sync_compat: bool,

    /// Concurrently applied subject chains (default from config).
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for `sreg sync`.
#[derive(Clone, Debug, Args)]
pub struct SyncArgs {
    /// Subject-name glob pattern to sync (repeatable; default: all).
    #[arg(long = "subject")]
    pub subjects: Vec<String>,

    /// Context to sync (repeatable; default: all contexts the source reports).
    #[arg(long = "context")]
    pub contexts: Vec<String>,

    /// Sync the entire version history instead of only the latest version.
    #[arg(long)]
    pub all_versions: bool,

    /// Conflict handling policy.
    #[arg(long, value_enum, default_value_t = ConflictPolicyArg::FailOnConflict)]
    pub conflict_policy: ConflictPolicyArg,

    /// Validate the plan against a fresh destination read without mutating.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip compatibility pre-validation when planning.
    #[arg(long)]
    pub no_compat_check: bool,

    /// Also carry subject compatibility modes to the destination.
    #[arg(long)]
    pub sync_compat: bool,

    /// Concurrently applied subject chains (default from config).
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for `sreg subjects`.
#[derive(Clone, Debug, Args)]
pub struct SubjectsArgs {
    /// Context to list (default from config).
    #[arg(long)]
    pub context: Option<String>,
}

/// Arguments for `sreg versions`.
#[derive(Clone, Debug, Args)]
pub struct VersionsArgs {
    /// Subject name (unqualified).
    pub subject: String,

    /// Context the subject lives in (default from config).
    #[arg(long)]
    pub context: Option<String>,
}
