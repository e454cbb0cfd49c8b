//! `e environments` commands.

use clap::{Args, Subcommand};
use epi_core::config::EpiHome;
use uuid::Uuid;

use crate::output;

use super::{load_config, open_store};

#[derive(Subcommand)]
pub enum EnvironmentsCommand {
    /// Create a new environment and make it current
    New(NewArgs),
    /// List environments
    List,
    /// Show an environment (the current one by default)
    Info(InfoArgs),
    /// Select the current environment
    Use(UseArgs),
}

#[derive(Args)]
pub struct NewArgs {
    /// Environment name
    pub name: String,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Environment UUID
    pub uuid: Option<Uuid>,
}

#[derive(Args)]
pub struct UseArgs {
    /// Environment UUID
    pub uuid: Uuid,
}

pub async fn execute(
    cmd: EnvironmentsCommand,
    home: &EpiHome,
) -> Result<(), Box<dyn std::error::Error>> {
    home.ensure()?;
    match cmd {
        EnvironmentsCommand::New(args) => {
            let id = create(home, &args.name)?;
            println!("{id}");
        }
        EnvironmentsCommand::List => {
            let config = load_config(home)?;
            let environments = open_store(home).list()?;

            let mut table = output::new_table(&["", "NAME", "UUID", "COMPONENTS"]);
            for env in &environments {
                table.add_row([
                    output::current_marker(config.current_environment == Some(env.id)).to_string(),
                    env.name.clone(),
                    env.id.to_string(),
                    env.installed.len().to_string(),
                ]);
            }
            println!("{table}");
        }
        EnvironmentsCommand::Info(args) => {
            let id = match args.uuid {
                Some(id) => id,
                None => load_config(home)?.require_current()?,
            };
            print!("{}", open_store(home).get(&id)?);
        }
        EnvironmentsCommand::Use(args) => {
            select(home, args.uuid)?;
        }
    }
    Ok(())
}

/// Create an environment and make it current.
fn create(home: &EpiHome, name: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    let env = open_store(home).create(name)?;
    select(home, env.id)?;
    Ok(env.id)
}

/// Make an existing environment current.
fn select(home: &EpiHome, id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    open_store(home).get(&id)?;

    let mut config = load_config(home)?;
    config.current_environment = Some(id);
    config.save(&home.config_file())?;
    tracing::debug!(%id, "Selected environment");
    Ok(())
}
