//! Spigot - run a command and tap its output streams.
//!
//! Spawns the given command with piped stdio, echoes every output line as
//! it arrives, optionally feeds lines to the child's stdin, and exits with
//! the child's exit code.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("spigot=debug")
    } else {
        EnvFilter::new("spigot=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let code = execute(cli).await?;
    std::process::exit(code);
}
