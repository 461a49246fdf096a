//! Command-line surface. A bare invocation is the nightly run; `supervise`
//! is the hidden helper mode the run spawns for itself.

use clap::{Parser, Subcommand};

use crate::commands::{RunArgs, SuperviseArgs};

#[derive(Parser, Debug)]
#[command(author, version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Internal: keep the sync client alive until stdin closes
    #[command(hide = true)]
    Supervise(SuperviseArgs),
}
