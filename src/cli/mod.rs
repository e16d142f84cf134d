//! CLI argument parsing for holefill.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Holefill: fill `langda(...)` holes in ProbLog programs with generated code.
///
/// Holes are extracted from the source, generated by a language model,
/// checked by running the reconstructed program and reviewed by a critic.
/// Accepted code is cached by the hash of each hole's declared intent.
#[derive(Parser, Debug)]
#[command(name = "holefill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// HOLEFILL_LOG takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file (default: ./holefill.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for holefill.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default holefill.yaml in the current directory.
    ///
    /// Refuses to overwrite an existing file.
    Init,

    /// Show the holes, networks and template of a source file.
    ///
    /// Nothing is generated; useful to check hashes and markers.
    Parse(ParseArgs),

    /// Fill the holes of a source file.
    ///
    /// Writes the final program to stdout (or --out) and a summary to stderr.
    Solve(SolveArgs),

    /// Inspect or clear the fragment cache.
    Cache(CacheCommand),
}

/// Arguments for the `parse` command.
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Source file to parse.
    pub file: PathBuf,

    /// Print the parse result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `solve` command.
#[derive(Parser, Debug)]
pub struct SolveArgs {
    /// Source file to fill.
    pub file: PathBuf,

    /// Cache namespace (default: the file stem).
    #[arg(long)]
    pub namespace: Option<String>,

    /// Round budget (overrides max_rounds).
    #[arg(long)]
    pub rounds: Option<u32>,

    /// Accept the first complete generation without evaluating it.
    #[arg(long)]
    pub no_evaluate: bool,

    /// Try the cache for every hole, regardless of its FUP policy.
    #[arg(long)]
    pub load: bool,

    /// Value for a `/* Key */` slot in requirements (repeatable).
    #[arg(long = "ext", value_name = "KEY=VALUE")]
    pub ext: Vec<String>,

    /// Facts and queries used to evaluate sources without a query.
    #[arg(long, value_name = "TEXT")]
    pub query_ext: Option<String>,

    /// Write the final program here instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Cache subcommands.
#[derive(Parser, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Available cache actions.
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached fragments of a namespace, or all namespaces.
    List(CacheListArgs),

    /// Print one cached fragment.
    Show(CacheShowArgs),

    /// Store a fragment by hand, replacing any cached one.
    Put(CachePutArgs),

    /// Remove every fragment of a namespace.
    Clear(CacheClearArgs),
}

/// Arguments for the `cache list` command.
#[derive(Parser, Debug)]
pub struct CacheListArgs {
    /// Namespace to list. Lists namespaces when omitted.
    pub namespace: Option<String>,
}

/// Arguments for the `cache show` command.
#[derive(Parser, Debug)]
pub struct CacheShowArgs {
    pub namespace: String,

    /// Hole hash (case-insensitive).
    pub hash: String,
}

/// Arguments for the `cache put` command.
#[derive(Parser, Debug)]
pub struct CachePutArgs {
    pub namespace: String,

    /// Hole hash (case-insensitive), as shown by `holefill parse`.
    pub hash: String,

    /// File holding the fragment code.
    pub file: PathBuf,
}

/// Arguments for the `cache clear` command.
#[derive(Parser, Debug)]
pub struct CacheClearArgs {
    pub namespace: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
