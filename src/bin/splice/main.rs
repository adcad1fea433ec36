//! Splice CLI - embed library sources and expand consumer files

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("splice=debug")
    } else {
        EnvFilter::new("splice=info")
    };

    // stdout carries command output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let color = !cli.no_color;
    match cli.command {
        Commands::Pack(args) => commands::pack::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args, color),
        Commands::Expand(args) => commands::expand::execute(args, color),
    }
}
