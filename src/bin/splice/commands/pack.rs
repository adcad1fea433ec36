//! `splice pack` command

use anyhow::{bail, Result};

use super::{emit_output, render_attributes};
use crate::cli::PackArgs;
use splice::ops::embed_dir;
use splice::util::config::{global_config_path, load_config, project_config_path};

pub fn execute(args: PackArgs) -> Result<()> {
    if !args.dir.is_dir() {
        bail!("library directory not found: {}", args.dir.display());
    }

    let global = global_config_path();
    let config = load_config(global.as_deref(), &project_config_path(&args.dir));

    let mut embed = config.embed;
    if let Some(mode) = &args.mode {
        embed.embedding_mode = mode.parse()?;
    }
    if args.minify {
        embed.minify = true;
    }
    if !args.exclude.is_empty() {
        embed.exclude_declarations.extend(args.exclude);
    }
    if let Some(level) = args.language {
        embed.language_level = Some(level);
    }
    if let Some(size) = args.chunk_size {
        embed.chunk_size = size;
    }

    let result = embed_dir(&args.dir, &embed)?;

    if result.unit_ids.is_empty() {
        tracing::warn!("no units found in {}", args.dir.display());
    }
    for id in &result.excluded {
        tracing::info!("Withheld {}", id);
    }
    tracing::info!(
        "Packed {} units ({} mode)",
        result.unit_ids.len(),
        embed.embedding_mode
    );

    emit_output(args.out.as_deref(), &render_attributes(result.entries)?)
}
