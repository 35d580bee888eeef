//! pinledger - Package.resolved pins and release archive checks
#![allow(clippy::missing_errors_doc)]
//!
//! Command-line front end over `pinledger-core`:
//!
//! - `pins`: list, show and set dependency pins in a `Package.resolved`
//!   file of any generation.
//! - `version`: compare release versions the way release tooling orders
//!   tags.
//! - `artifacts`: check an unpacked release archive against the SDK's
//!   XCFramework rules.

pub mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(name = "pinledger")]
#[command(author, version, about = "pinledger - Package.resolved pins and release archive checks")]
pub struct Cli {
    /// Lock file to operate on
    #[arg(
        long,
        global = true,
        env = "PINLEDGER_FILE",
        default_value = "Package.resolved"
    )]
    pub file: PathBuf,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read or change dependency pins
    Pins {
        /// Pin operation.
        #[command(subcommand)]
        command: PinsCommands,
    },
    /// Work with release versions
    Version {
        /// Version operation.
        #[command(subcommand)]
        command: VersionCommands,
    },
    /// Validate release archives
    Artifacts {
        /// Artifact operation.
        #[command(subcommand)]
        command: ArtifactsCommands,
    },
}

/// `pins` subcommands.
#[derive(Debug, Subcommand)]
pub enum PinsCommands {
    /// List all pins in file order
    List,
    /// Show one pin
    Show {
        /// Package name (version 1) or identity (versions 2 and 3)
        name: String,
    },
    /// Update a pin, or add it when missing
    Set {
        /// Package name (version 1) or identity (versions 2 and 3)
        name: String,
        /// Repository URL, required when adding
        #[arg(long)]
        location: Option<String>,
        /// Branch to track
        #[arg(long, conflicts_with = "version")]
        branch: Option<String>,
        /// Commit to lock to
        #[arg(long)]
        revision: String,
        /// Version to track
        #[arg(long)]
        version: Option<String>,
    },
}

/// `version` subcommands.
#[derive(Debug, Subcommand)]
pub enum VersionCommands {
    /// Print `<`, `=` or `>` for the ordering of two versions
    Compare {
        /// Left-hand version, e.g. 1.7.0-rc1
        a: String,
        /// Right-hand version
        b: String,
    },
}

/// `artifacts` subcommands.
#[derive(Debug, Subcommand)]
pub enum ArtifactsCommands {
    /// Check an unpacked release archive against the SDK rules
    Validate {
        /// Directory the archive was unpacked into
        dir: PathBuf,
        /// Release tag the archive was built for
        #[arg(long)]
        tag: String,
    },
}
