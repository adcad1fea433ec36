//! `splice expand` command

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::{emit_output, read_attributes, unreadable_attributes};
use crate::cli::ExpandArgs;
use splice::compat::{CompatibilityGate, LanguageLevel};
use splice::ops::{load_libraries, ExpandOptions, Expander, LoadOptions, ManifestSource};
use splice::util::config::{global_config_path, load_config, project_config_path};
use splice::util::diagnostic::emit;
use splice::util::fs::read_to_string;
use splice::util::CancellationToken;

pub fn execute(args: ExpandArgs, color: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let global = global_config_path();
    let config = load_config(global.as_deref(), &project_config_path(&cwd));

    let language_level = args
        .language
        .as_deref()
        .map(str::parse::<LanguageLevel>)
        .transpose()?;

    let mut sources = Vec::with_capacity(args.attrs.len());
    for path in &args.attrs {
        let name = path.display().to_string();
        match read_attributes(path) {
            Ok(entries) => sources.push(ManifestSource::new(name, entries)),
            Err(err) => emit(&unreadable_attributes(&name, &err), color),
        }
    }

    let options = LoadOptions {
        language_level,
        gate: CompatibilityGate::from_config(&config.compat),
        ..LoadOptions::default()
    };
    let loaded = load_libraries(sources, &options).map_err(|err| {
        emit(&err.to_diagnostic(), color);
        anyhow::Error::new(err)
    })?;

    for diagnostic in &loaded.diagnostics {
        emit(diagnostic, color);
    }
    if loaded.has_blocking() {
        bail!("library requirements are not met by this project");
    }

    let root = read_to_string(&args.root)?;
    let expander = Expander::new(Arc::new(loaded.store)).options(ExpandOptions {
        namespace_stubs: args.namespace_stubs,
    });
    let expansion = expander.expand(&root, &CancellationToken::new())?;

    for diagnostic in expansion.diagnostics() {
        emit(&diagnostic.with_origin(args.root.display().to_string()), color);
    }
    tracing::info!(
        "Expanded {} with {} units",
        args.root.display(),
        expansion.ids.len()
    );

    emit_output(args.out.as_deref(), &expansion.code)
}
