//! CLI argument definitions.

use clap::Parser;

/// Spigot - run a command and tap its output streams
#[derive(Parser, Debug)]
#[command(name = "spigot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Line to write to the child's stdin after spawn (repeatable, sent in order)
    #[arg(short = 's', long = "send", value_name = "LINE")]
    pub send: Vec<String>,

    /// Close the child's stdin once the sent lines are written
    #[arg(long)]
    pub close_stdin: bool,

    /// Do not echo output lines as they arrive
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Command to run: program first, arguments after. Tokens are re-split
    /// on whitespace, so arguments with embedded spaces are not preserved.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}
