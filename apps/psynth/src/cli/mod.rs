//! # Psynth CLI Module
//!
//! ## Available Commands
//!
//! - `create` - Create an empty graph
//! - `list` - List your graphs
//! - `show` - Load a graph and summarize it
//! - `draw` - Run the server layout on a graph
//! - `publish` - Publish a graph
//! - `request` - Send any allowed operation
//! - `demo` - Build a small ring graph

mod commands;

use clap::{Parser, Subcommand};
use psynth_core::PsynthError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Psynth graph client
///
/// Builds and inspects graphs on a Psynth server.
#[derive(Parser, Debug)]
#[command(name = "psynth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty graph
    Create {
        /// Graph name
        #[arg(short, long)]
        name: String,
    },

    /// List your graphs
    List,

    /// Load a graph and print a summary
    Show {
        /// Server-assigned graph filename
        #[arg(short, long)]
        filename: String,
    },

    /// Run the server layout and apply the new positions
    Draw {
        #[arg(short, long)]
        filename: String,
    },

    /// Publish a graph
    Publish {
        #[arg(short, long)]
        filename: String,
    },

    /// Send any allowed operation
    Request {
        #[arg(short, long)]
        filename: String,

        /// Operation name (e.g. getheat, shortestpath)
        #[arg(short, long)]
        op: String,

        /// Parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Create a ring graph with one comment per node
    Demo {
        #[arg(short, long)]
        name: String,

        /// Number of nodes in the ring
        #[arg(long, default_value = "6")]
        nodes: usize,
    },
}

/// Parse `key=value`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), PsynthError> {
    let config = psynth::ClientConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Create { name } => cmd_create(config, json_mode, name).await,
        Commands::List => cmd_list(config, json_mode).await,
        Commands::Show { filename } => cmd_show(config, json_mode, filename).await,
        Commands::Draw { filename } => cmd_draw(config, json_mode, filename).await,
        Commands::Publish { filename } => cmd_publish(config, json_mode, filename).await,
        Commands::Request {
            filename,
            op,
            params,
        } => cmd_request(config, json_mode, filename, op, params).await,
        Commands::Demo { name, nodes } => cmd_demo(config, json_mode, name, nodes).await,
    }
}
