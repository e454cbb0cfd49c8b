//! `e pull` command.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use epi_runtime::{DockerEngine, ImagePuller};

#[derive(Args)]
pub struct PullArgs {
    /// Image reference (e.g., "alpine:3", "docker.io/hashicorp/terraform:0.12.28")
    pub image: String,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn execute(args: PullArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(DockerEngine::connect().await?);
    let puller = ImagePuller::new(engine).with_timeout(args.timeout.map(Duration::from_secs));

    if !args.quiet {
        println!("Pulling {}...", args.image);
    }
    let pulled = puller.pull(&args.image).await;

    if !args.quiet {
        print!("{}", pulled.output);
    }
    pulled.into_result()?;

    if !args.quiet {
        println!("Pulled: {}", args.image);
    }
    Ok(())
}
