//! Consumer side: manifest attributes from many libraries into one store.

use std::collections::BTreeSet;

use semver::Version;

use crate::compat::{Advisory, CompatibilityGate, LanguageLevel};
use crate::core::{SourceUnit, StoreError, UnitStore};
use crate::manifest;
use crate::util::diagnostic::Diagnostic;

/// Consumer capabilities checked against each manifest.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub consumer_version: Version,
    pub language_level: Option<LanguageLevel>,
    pub gate: CompatibilityGate,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            consumer_version: crate::tool_version(),
            language_level: None,
            gate: CompatibilityGate::default(),
        }
    }
}

/// One library's attributes, named for diagnostics.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl ManifestSource {
    pub fn new(name: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        ManifestSource {
            name: name.into(),
            entries,
        }
    }
}

/// Everything the consumer learned from its sources.
#[derive(Debug)]
pub struct LoadedLibraries {
    pub store: UnitStore,
    /// Namespaces declared by all loaded libraries
    pub namespaces: BTreeSet<String>,
    /// Names of sources that loaded
    pub loaded: Vec<String>,
    /// Names of sources that were skipped
    pub failed: Vec<String>,
    /// Advisories per source
    pub advisories: Vec<(String, Advisory)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedLibraries {
    /// Whether any source raised an advisory callers should stop on.
    pub fn has_blocking(&self) -> bool {
        self.advisories.iter().any(|(_, a)| a.is_blocking())
    }
}

/// Load every source, isolating per-source failures.
///
/// A manifest that fails to decode is skipped and reported with its source
/// name; the others still load. Only structural conflicts between the units
/// that did load (a type declared twice) fail the whole load.
pub fn load_libraries(
    sources: impl IntoIterator<Item = ManifestSource>,
    options: &LoadOptions,
) -> Result<LoadedLibraries, StoreError> {
    let mut units: Vec<SourceUnit> = Vec::new();
    let mut namespaces = BTreeSet::new();
    let mut loaded = Vec::new();
    let mut failed = Vec::new();
    let mut advisories = Vec::new();
    let mut diagnostics = Vec::new();

    for source in sources {
        let manifest = match manifest::deserialize(source.entries) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!(source = %source.name, error = %err, "skipping unreadable manifest");
                diagnostics.push(err.to_diagnostic(&source.name));
                failed.push(source.name);
                continue;
            }
        };

        for advisory in options.gate.check(
            &options.consumer_version,
            options.language_level,
            &manifest.metadata,
        ) {
            diagnostics.push(advisory.to_diagnostic().with_origin(&source.name));
            advisories.push((source.name.clone(), advisory));
        }

        tracing::debug!(source = %source.name, units = manifest.units.len(), "loaded manifest");
        namespaces.extend(manifest.metadata.namespaces.iter().cloned());
        units.extend(manifest.units);
        loaded.push(source.name);
    }

    let store = UnitStore::build(units)?;
    namespaces.extend(store.namespaces());

    Ok(LoadedLibraries {
        store,
        namespaces,
        loaded,
        failed,
        advisories,
        diagnostics,
    })
}
