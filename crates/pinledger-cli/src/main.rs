//! pinledger - Package.resolved pins and release archive checks

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pinledger_cli::cmd;
use pinledger_cli::{ArtifactsCommands, Cli, Commands, PinsCommands, VersionCommands};

fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = cli.file;

    match cli.command {
        Commands::Pins { command } => match command {
            PinsCommands::List => cmd::pins::list(&file),
            PinsCommands::Show { name } => cmd::pins::show(&file, &name),
            PinsCommands::Set {
                name,
                location,
                branch,
                revision,
                version,
            } => cmd::pins::set(&file, &name, location.as_deref(), branch, revision, version),
        },
        Commands::Version { command } => match command {
            VersionCommands::Compare { a, b } => cmd::version::compare(&a, &b),
        },
        Commands::Artifacts { command } => match command {
            ArtifactsCommands::Validate { dir, tag } => cmd::artifacts::validate(&dir, &tag),
        },
    }
}
