//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name used in log events (e.g. "run", "index").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run(_) => "run",
        Commands::Compile { .. } => "compile",
        Commands::Index { .. } => "index",
        Commands::Config => "config",
    }
}

/// Output format requested by the command, if it takes one.
pub fn output_format(command: &Commands) -> &str {
    match command {
        Commands::Run(args) => args.format.as_str(),
        Commands::Compile { format, .. } | Commands::Index { format, .. } => format.as_str(),
        Commands::Config => "toml",
    }
}
