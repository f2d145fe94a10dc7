use sreg_config::SregConfig;

use crate::cli::{Commands, GlobalFlags};

pub mod compat;
pub mod export;
pub mod import;
pub mod shared;
pub mod subjects;
pub mod sync;
pub mod versions;

pub async fn dispatch(
    command: Commands,
    config: &SregConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Export(args) => export::run(&args, config, flags).await,
        Commands::Import(args) => import::run(&args, config, flags).await,
        Commands::Sync(args) => sync::run(&args, config, flags).await,
        Commands::Subjects(args) => subjects::run(&args, config, flags).await,
        Commands::Versions(args) => versions::run(&args, config, flags).await,
        Commands::Compat { action } => compat::handle(&action, config, flags).await,
    }
}
