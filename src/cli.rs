//! Command-line definitions, shared with `xtask` for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::session::FailurePolicy;

#[cfg(not(feature = "release"))]
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    " ",
    env!("MSGSIFT_BUILD_DATE"),
    ")"
);

#[cfg(feature = "release")]
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("MSGSIFT_BUILD_DATE"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "msgsift", version = VERSION)]
#[command(about = "Decode message archives and reconstruct game sessions")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconstruct game sessions from a message export
    Sessions(SessionsArgs),

    /// Decode the rich-text bodies of a message export
    Bodies(BodiesArgs),

    /// Dump the contents of one binary archive file
    Decode(DecodeArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Message export (JSON lines)
    pub input: PathBuf,

    /// Registry file with one application id per line
    #[arg(long, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Known application id (repeatable)
    #[arg(long = "app-id", value_name = "ID")]
    pub app_ids: Vec<String>,

    /// What to do when a session cannot be reconstructed
    #[arg(long, value_enum)]
    pub policy: Option<FailurePolicy>,

    /// Sessions store to insert into (JSON lines)
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,

    /// Resolve sessions on one thread
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug, Args)]
pub struct BodiesArgs {
    /// Message export (JSON lines)
    pub input: PathBuf,

    /// What to do when a body cannot be decoded
    #[arg(long, value_enum)]
    pub policy: Option<FailurePolicy>,

    /// Bodies store to insert into (JSON lines)
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Raw archive bytes
    pub file: PathBuf,

    /// Archive format; detected from the magic bytes when omitted
    #[arg(long, value_enum)]
    pub kind: Option<ArchiveKind>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Open the configuration file in $EDITOR
    Edit,
    /// Add missing fields to the configuration file
    Migrate {
        /// Apply without asking
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One session record per line
    Jsonl,
    /// Human-readable table
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchiveKind {
    /// Typed stream (rich-text body)
    Typedstream,
    /// Keyed archive binary plist (interactive payload)
    Keyed,
}
