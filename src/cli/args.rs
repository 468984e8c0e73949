//! CLI argument definitions using clap derive

use crate::mutation::MutationKind;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vulcan mutations - build mutation documents and patch cached list queries
///
/// Builds create/update/upsert/delete documents for configured collections and
/// applies mutation responses to a cache snapshot without refetching.
#[derive(Parser, Debug)]
#[command(name = "vulcan-mutations")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "VULCAN_MUTATIONS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .vulcan.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the mutation document for a collection
    Build(BuildArgs),

    /// Apply a mutation response to a cache snapshot
    Apply(ApplyArgs),

    /// Send a mutation and patch the cache snapshot with its result
    Mutate(MutateArgs),

    /// List configured collections
    Collections(CollectionsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Mutation kind: create, update, upsert or delete
    pub kind: MutationKind,

    /// Collection name or type name
    #[arg(long)]
    pub collection: String,

    /// Also print the SHA-256 hash of the document
    #[arg(long)]
    pub hash: bool,
}

/// Arguments for the apply command
#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Collection name or type name
    #[arg(long)]
    pub collection: String,

    /// Mutation kind, or the full operation name (createFoo)
    #[arg(long)]
    pub operation: MutationKind,

    /// JSON file holding the mutation response body
    #[arg(long)]
    pub response: PathBuf,

    /// Cache snapshot to patch (defaults to cache.snapshot from config)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Write the patched snapshot here instead of in place
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compute the report without writing the snapshot
    #[arg(long)]
    pub dry_run: bool,

    /// Output format for the report
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the mutate command
#[derive(Parser, Debug)]
pub struct MutateArgs {
    /// Mutation kind: create, update, upsert or delete
    pub kind: MutationKind,

    /// Collection name or type name
    #[arg(long)]
    pub collection: String,

    /// Document data as JSON
    #[arg(long)]
    pub data: Option<String>,

    /// Unique selector as JSON
    #[arg(long)]
    pub selector: Option<String>,

    /// Document id, shorthand for a documentId selector
    #[arg(long, conflicts_with = "selector")]
    pub document_id: Option<String>,

    /// Cache snapshot to patch (defaults to cache.snapshot from config)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// GraphQL endpoint (defaults to transport.endpoint from config)
    #[arg(long)]
    pub endpoint: Option<String>,
}

/// Arguments for the collections command
#[derive(Parser, Debug)]
pub struct CollectionsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for reports and listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
