//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Splice - embed library sources and expand consumer files
#[derive(Parser)]
#[command(name = "splice")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build manifest attributes from a library directory
    Pack(PackArgs),

    /// Show the contents of manifest attribute files
    Inspect(InspectArgs),

    /// Expand a consumer file with the library units it uses
    Expand(ExpandArgs),
}

#[derive(Args)]
pub struct PackArgs {
    /// Library root directory
    pub dir: PathBuf,

    /// Write attributes to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Payload shape: raw or compact
    #[arg(long)]
    pub mode: Option<String>,

    /// Minify unit bodies
    #[arg(long)]
    pub minify: bool,

    /// Withhold units declaring types matching this glob (repeatable)
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Minimum language level consumers need
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum characters per attribute value
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Attribute files (JSON objects of key/value strings)
    #[arg(required = true)]
    pub attrs: Vec<PathBuf>,

    /// Print each unit's declared types and dependencies
    #[arg(long)]
    pub units: bool,
}

#[derive(Args)]
pub struct ExpandArgs {
    /// Attribute files of the libraries to draw units from
    #[arg(required = true)]
    pub attrs: Vec<PathBuf>,

    /// Consumer file to expand
    #[arg(short, long)]
    pub root: PathBuf,

    /// Write the expanded file here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Emit empty declarations for imported library namespaces
    #[arg(long)]
    pub namespace_stubs: bool,

    /// Language level of the consuming project
    #[arg(long)]
    pub language: Option<String>,
}
