//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Path of `path` relative to `base`, with `/` separators.
pub fn relative_id(path: &Path, base: &Path) -> Option<String> {
    let rel = pathdiff::diff_paths(path, base)?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Find files under `base` whose relative id matches any pattern.
///
/// Returns `(id, path)` pairs sorted by id. Hidden directories are skipped.
pub fn find_matching(base: &Path, patterns: &[glob::Pattern]) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    let options = glob::MatchOptions {
        require_literal_separator: true,
        ..glob::MatchOptions::new()
    };

    let walker = WalkDir::new(base).sort_by_file_name().into_iter().filter_entry(|e| {
        e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
    });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(id) = relative_id(entry.path(), base) else {
            continue;
        };
        if patterns.iter().any(|p| p.matches_with(&id, options)) {
            found.push((id, entry.into_path()));
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}
