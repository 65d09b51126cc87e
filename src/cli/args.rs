//! Defines the command-line arguments and subcommands for the `conch` binary.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "conch",
    version,
    about = "Typed command-line parsing, binding and completion for embedded consoles."
)]
pub struct ConchArgs {
    /// Parser configuration file (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity: -v for debug, -vv for trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Run the demo commands as an operator.
    #[arg(long, global = true)]
    pub operator: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a line against the demo commands and print the bound commands as JSON.
    Parse {
        #[arg(required = true, allow_hyphen_values = true)]
        line: String,
    },
    /// Print completion suggestions for a partial line, one per line.
    Complete {
        #[arg(required = true, allow_hyphen_values = true)]
        line: String,
        /// Cursor offset in bytes; defaults to the end of the line.
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// Parse one literal value and print its input tree as JSON.
    Literal {
        #[arg(required = true, allow_hyphen_values = true)]
        text: String,
    },
    /// Parse a line and run its commands.
    Run {
        #[arg(required = true, allow_hyphen_values = true)]
        line: String,
    },
    /// Interactive console over the demo commands.
    Repl,
}
