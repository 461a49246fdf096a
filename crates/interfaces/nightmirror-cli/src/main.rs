use clap::Parser;
use nightmirror_cli::cli::{Cli, Commands};
use nightmirror_cli::commands;
use std::process::ExitCode;

fn main() -> ExitCode {
    match Cli::try_parse() {
        Ok(Cli {
            command: Some(Commands::Supervise(args)),
            ..
        }) => commands::cmd_supervise(args),
        Ok(cli) => commands::cmd_run(cli.run),
        Err(err) => {
            let raw: Vec<String> = std::env::args_os()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            commands::cmd_usage_error(err, &raw)
        }
    }
}
