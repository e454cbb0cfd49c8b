//! CLI command definitions and dispatch.

mod components;
mod environments;
mod pull;

use clap::{Parser, Subcommand};
use epi_core::config::{EpiHome, UserConfig};
use epi_runtime::EnvironmentStore;

/// Epi: manage environments and run their components in containers.
#[derive(Parser)]
#[command(name = "e", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Create, list and select environments
    #[command(subcommand, alias = "env")]
    Environments(environments::EnvironmentsCommand),
    /// Inspect and run components of the current environment
    #[command(subcommand, alias = "cmp")]
    Components(components::ComponentsCommand),
    /// Pull an image through the container engine
    Pull(pull::PullArgs),
}

fn resolve_home() -> EpiHome {
    let home = EpiHome::resolve();
    tracing::debug!(home = %home.root().display(), "Resolved home directory");
    home
}

/// Open the environment store under `home`.
pub(crate) fn open_store(home: &EpiHome) -> EnvironmentStore {
    EnvironmentStore::new(home.environments_dir())
}

/// Load the user configuration under `home`.
pub(crate) fn load_config(home: &EpiHome) -> Result<UserConfig, Box<dyn std::error::Error>> {
    Ok(UserConfig::load(&home.config_file())?)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Environments(cmd) => environments::execute(cmd, &resolve_home()).await,
        Command::Components(cmd) => components::execute(cmd, &resolve_home()).await,
        Command::Pull(args) => pull::execute(args).await,
    }
}
