//! `e components` commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use epi_core::config::EpiHome;
use epi_core::{Environment, Job};
use epi_runtime::{DockerEngine, JobRunner, RunnerConfig};

use crate::output;

use super::{load_config, open_store};

#[derive(Subcommand)]
pub enum ComponentsCommand {
    /// List components installed in the current environment
    List,
    /// Run a component command in a container
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Component name
    pub component: String,

    /// Command name
    pub command: String,

    /// Host directory holding the component's mounts (default: ~/.e/mounts)
    #[arg(long)]
    pub mount_root: Option<PathBuf>,

    /// Pull the image before running
    #[arg(long)]
    pub pull: bool,

    /// Append container output as JSON lines to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn execute(
    cmd: ComponentsCommand,
    home: &EpiHome,
) -> Result<(), Box<dyn std::error::Error>> {
    home.ensure()?;
    let env = current_environment(home)?;

    match cmd {
        ComponentsCommand::List => {
            let mut table = output::new_table(&["NAME", "TYPE", "VERSION", "IMAGE", "COMMANDS"]);
            for component in &env.installed {
                let commands: Vec<&str> =
                    component.commands.iter().map(|c| c.name.as_str()).collect();
                table.add_row([
                    component.name.clone(),
                    component.component_type.clone(),
                    component.version.clone(),
                    component.image.clone(),
                    commands.join(","),
                ]);
            }
            println!("{table}");
        }
        ComponentsCommand::Run(args) => {
            let job = build_job(&env, &args, home)?;
            let config = RunnerConfig {
                pull_first: args.pull,
                timeout: args.timeout.map(Duration::from_secs),
                log_file: args.log_file,
            };

            let engine = Arc::new(DockerEngine::connect().await?);
            let runner = JobRunner::with_config(engine, config);
            let outcome = runner
                .run(&job, &mut tokio::io::stdout(), &mut tokio::io::stderr())
                .await?;

            tracing::debug!(
                container = %outcome.container_id,
                exit_code = outcome.exit_code,
                "Component command finished"
            );
            if !outcome.success() {
                std::process::exit(process_exit_code(outcome.exit_code));
            }
        }
    }
    Ok(())
}

/// Map a container exit status onto a process exit code. Statuses outside
/// the `i32` range become 1.
fn process_exit_code(status: i64) -> i32 {
    i32::try_from(status).unwrap_or(1)
}

fn current_environment(home: &EpiHome) -> Result<Environment, Box<dyn std::error::Error>> {
    let id = load_config(home)?.require_current()?;
    Ok(open_store(home).get(&id)?)
}

fn build_job(env: &Environment, args: &RunArgs, home: &EpiHome) -> epi_core::Result<Job> {
    let component = env.find_component(&args.component)?;
    let mount_root = args.mount_root.clone().unwrap_or_else(|| home.mounts_dir());
    Job::for_command(component, &args.command, mount_root)
}
