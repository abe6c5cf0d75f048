//! CLI command execution.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use spigot::{LineObserver, Session, StdinHandle};

use super::args::Cli;

/// Echoes each drained line to stdout as it arrives.
struct EchoLine;

#[async_trait]
impl LineObserver for EchoLine {
    async fn on_line(&self, line: &str, _stdin: &StdinHandle) {
        println!("{line}");
    }
}

/// Run the command described by `cli` and return the exit code to report.
pub async fn execute(cli: Cli) -> Result<i32> {
    let mut session = Session::new(cli.command.join(" "));

    if !cli.quiet {
        session.add_observer(Arc::new(EchoLine));
    }

    let stdin = session
        .start_with_input(&cli.send)
        .await
        .context("failed to start command")?;
    if cli.close_stdin {
        stdin.close().await;
    }

    let status = session
        .wait()
        .await
        .context("failed waiting for command to finish")?;

    // Death by signal has no exit code; report plain failure.
    Ok(status.code().unwrap_or(1))
}
