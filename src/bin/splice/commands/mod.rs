//! Command implementations

pub mod expand;
pub mod inspect;
pub mod pack;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use splice::util::diagnostic::{suggestions, Diagnostic};
use splice::util::fs::{read_to_string, write_string};

/// Read an attribute file: a JSON object mapping keys to string values.
pub fn read_attributes(path: &Path) -> Result<Vec<(String, String)>> {
    let contents = read_to_string(path)?;
    let map: BTreeMap<String, String> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not an attribute file", path.display()))?;
    Ok(map.into_iter().collect())
}

/// Diagnostic for an attribute file that could not be read at all.
pub fn unreadable_attributes(name: &str, err: &anyhow::Error) -> Diagnostic {
    tracing::warn!(source = %name, error = %err, "skipping unreadable attribute file");
    Diagnostic::error(format!("could not read manifest: {:#}", err))
        .with_origin(name)
        .with_suggestion(suggestions::REBUILD_LIBRARY)
}

/// Render attributes as a JSON object with sorted keys.
pub fn render_attributes(entries: Vec<(String, String)>) -> Result<String> {
    let map: BTreeMap<String, String> = entries.into_iter().collect();
    let mut json = serde_json::to_string_pretty(&map).context("failed to render attributes")?;
    json.push('\n');
    Ok(json)
}

/// Write `contents` to `out`, or print it when no path is given.
pub fn emit_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => write_string(path, contents),
        None => {
            print!("{}", contents);
            Ok(())
        }
    }
}
