//! Producer side: source files to manifest attributes.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::compat::LanguageLevel;
use crate::core::{SourceUnit, UnitStore};
use crate::imports::split_header;
use crate::manifest::{self, Manifest, ManifestMetadata, SerializeOptions};
use crate::symbols::{SymbolSource, SyntacticSymbols};
use crate::transform::{BodyTransform, Pipeline};
use crate::util::config::EmbedConfig;
use crate::util::fs::{find_matching, read_to_string};

/// A library source file, identified by its path relative to the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: String,
    pub code: String,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        SourceFile {
            id: id.into(),
            code: code.into(),
        }
    }
}

/// Result of packing a library.
#[derive(Debug)]
pub struct EmbedResult {
    /// Attribute key/value pairs to attach to the artifact
    pub entries: Vec<(String, String)>,
    /// Ids of the embedded units, in ordinal order
    pub unit_ids: Vec<String>,
    /// Ids of files withheld by `exclude_declarations`
    pub excluded: Vec<String>,
}

/// Read every file under `root` selected by `path_filter_globs`.
pub fn collect_files(root: &Path, config: &EmbedConfig) -> Result<Vec<SourceFile>> {
    let patterns = config.path_patterns()?;
    let mut files = Vec::new();
    for (id, path) in find_matching(root, &patterns)? {
        files.push(SourceFile::new(id, read_to_string(&path)?));
    }
    tracing::debug!(root = %root.display(), files = files.len(), "collected library files");
    Ok(files)
}

/// Turn source files into units.
///
/// Each file's leading imports are split off its body. Declared and used
/// types come from syntactic matching against every type the library
/// declares, and dependencies point at the units owning the used types.
/// Files whose declarations match `exclude_declarations` are withheld, as
/// are files that declare no types.
pub fn build_units(files: Vec<SourceFile>, config: &EmbedConfig) -> Result<BuiltUnits> {
    let excludes = config.exclude_patterns()?;
    let scanner = SyntacticSymbols::default();

    let scanned: Vec<(SourceFile, BTreeSet<String>)> = files
        .into_par_iter()
        .map(|file| {
            let declared = scanner.declared_types(split_header(&file.code).1);
            (file, declared)
        })
        .collect();

    let mut kept = Vec::with_capacity(scanned.len());
    let mut excluded = Vec::new();
    for (file, declared) in scanned {
        if declared.is_empty() {
            tracing::debug!(id = %file.id, "skipping file without type declarations");
            continue;
        }
        if let Some(type_id) = declared
            .iter()
            .find(|t| excludes.iter().any(|p| p.matches(t)))
        {
            tracing::info!(id = %file.id, type_id = %type_id, "withholding excluded unit");
            excluded.push(file.id);
            continue;
        }
        kept.push((file, declared));
    }

    let symbols = SyntacticSymbols::new(kept.iter().flat_map(|(_, d)| d.iter().cloned()));
    let units: Vec<SourceUnit> = kept
        .into_par_iter()
        .map(|(file, declared)| {
            let (imports, body) = split_header(&file.code);
            let used: BTreeSet<String> = symbols
                .referenced_types(&file.code)
                .into_iter()
                .filter(|t| !declared.contains(t))
                .collect();
            SourceUnit::new(file.id.clone(), body)
                .with_declared_types(declared)
                .with_imports(imports)
                .with_used_types(used)
        })
        .collect();

    // Index declarations once to link used types to their owners.
    let provisional = UnitStore::build(units.iter().cloned())?;
    let transform = Pipeline::from_config(config);

    let units = units
        .into_iter()
        .map(|unit| {
            let deps: BTreeSet<String> = unit
                .used_types()
                .iter()
                .filter_map(|t| provisional.find(t))
                .filter(|owner| *owner != unit.id())
                .map(str::to_string)
                .collect();
            unit.with_dependencies(deps)
                .map_body(|body| transform.apply(body))
        })
        .collect();

    Ok(BuiltUnits { units, excluded })
}

/// Units produced by [`build_units`].
#[derive(Debug, Default)]
pub struct BuiltUnits {
    pub units: Vec<SourceUnit>,
    pub excluded: Vec<String>,
}

/// Serialize units into manifest attributes.
///
/// The store is built first so duplicate declarations fail here rather
/// than at every consumer.
pub fn embed(units: Vec<SourceUnit>, config: &EmbedConfig) -> Result<Vec<(String, String)>> {
    let store = UnitStore::build(units.iter().cloned())?;

    let language_level = config
        .language_level
        .as_deref()
        .map(str::parse::<LanguageLevel>)
        .transpose()
        .context("invalid `language_level` in configuration")?;

    let metadata = ManifestMetadata {
        version: Some(crate::tool_version()),
        language_level,
        namespaces: store.namespaces().into_iter().collect(),
    };

    let units: Vec<SourceUnit> = store.units().cloned().collect();
    let entries = manifest::serialize(
        &Manifest::new(units, metadata),
        SerializeOptions::from(config),
    )?;
    Ok(entries)
}

/// Collect, build and serialize the library under `root`.
pub fn embed_dir(root: &Path, config: &EmbedConfig) -> Result<EmbedResult> {
    let files = collect_files(root, config)?;
    let built = build_units(files, config)?;

    let mut unit_ids: Vec<String> = built.units.iter().map(|u| u.id().to_string()).collect();
    unit_ids.sort();

    tracing::info!(
        units = unit_ids.len(),
        excluded = built.excluded.len(),
        "embedding library"
    );

    let entries = embed(built.units, config)?;
    Ok(EmbedResult {
        entries,
        unit_ids,
        excluded: built.excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::attributes::{NAMESPACES_KEY, VERSION_KEY};
    use tempfile::TempDir;

    fn library() -> Vec<SourceFile> {
        vec![
            SourceFile::new(
                "Put.cs",
                "using System;\n\nnamespace Lib\n{\n    public static class Put\n    {\n        \
                 // write a line\n        public static void Line(object o) => Console.WriteLine(o);\n    }\n}\n",
            ),
            SourceFile::new(
                "I/D.cs",
                "using System;\nusing Lib;\n\nnamespace Lib.I\n{\n    public static class D\n    {\n        \
                 public static void Dump(object o) => Put.Line(o);\n    }\n}\n",
            ),
            SourceFile::new(
                "Internal/Secret.cs",
                "namespace Lib.Internal\n{\n    class Secret { }\n}\n",
            ),
            SourceFile::new("AssemblyInfo.cs", "[assembly: System.CLSCompliant(true)]\n"),
        ]
    }

    fn unit<'a>(units: &'a [SourceUnit], id: &str) -> &'a SourceUnit {
        units.iter().find(|u| u.id() == id).unwrap()
    }

    #[test]
    fn test_build_units_links_dependencies() {
        let built = build_units(library(), &EmbedConfig::default()).unwrap();

        assert_eq!(built.units.len(), 3);
        let d = unit(&built.units, "I/D.cs");
        assert_eq!(d.imports(), ["using System;", "using Lib;"]);
        assert!(d.body().trim_start().starts_with("namespace Lib.I"));
        assert!(d.declared_types().contains("Lib.I.D"));
        assert!(d.used_types().contains("Lib.Put"));
        assert!(d.dependencies().contains("Put.cs"));

        let put = unit(&built.units, "Put.cs");
        assert!(put.dependencies().is_empty());
        assert!(put.body().contains("// write a line"));
    }

    #[test]
    fn test_excluded_declarations_are_withheld() {
        let config = EmbedConfig {
            exclude_declarations: vec!["Lib.Internal.*".to_string()],
            ..EmbedConfig::default()
        };
        let built = build_units(library(), &config).unwrap();

        assert_eq!(built.excluded, ["Internal/Secret.cs"]);
        assert!(built.units.iter().all(|u| u.id() != "Internal/Secret.cs"));
    }

    #[test]
    fn test_minify_applies_to_bodies() {
        let config = EmbedConfig {
            minify: true,
            ..EmbedConfig::default()
        };
        let built = build_units(library(), &config).unwrap();

        let put = unit(&built.units, "Put.cs");
        assert!(!put.body().contains("write a line"));
        assert!(put.body().starts_with("namespace Lib\n{"));
    }

    #[test]
    fn test_duplicate_declarations_fail() {
        let files = vec![
            SourceFile::new("A.cs", "namespace Lib { class Put {} }"),
            SourceFile::new("B.cs", "namespace Lib { class Put {} }"),
        ];
        let err = build_units(files, &EmbedConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Lib.Put"));
    }

    #[test]
    fn test_embed_records_metadata() {
        let config = EmbedConfig {
            language_level: Some("7.3".to_string()),
            ..EmbedConfig::default()
        };
        let built = build_units(library(), &config).unwrap();
        let entries = embed(built.units, &config).unwrap();

        let manifest = manifest::deserialize(entries.clone()).unwrap();
        assert_eq!(manifest.units.len(), 3);
        assert_eq!(manifest.metadata.version, Some(crate::tool_version()));
        assert_eq!(manifest.metadata.language_level, Some(LanguageLevel::new(7, 3)));

        let namespaces = entries
            .iter()
            .find(|(k, _)| k == NAMESPACES_KEY)
            .map(|(_, v)| v.as_str());
        assert_eq!(namespaces, Some("Lib,Lib.I,Lib.Internal"));
        assert!(entries.iter().any(|(k, _)| k == VERSION_KEY));
    }

    #[test]
    fn test_embed_rejects_bad_language_level() {
        let config = EmbedConfig {
            language_level: Some("seven".to_string()),
            ..EmbedConfig::default()
        };
        assert!(embed(Vec::new(), &config).is_err());
    }

    #[test]
    fn test_embed_dir() {
        let tmp = TempDir::new().unwrap();
        for file in library() {
            let path = tmp.path().join(&file.id);
            crate::util::fs::write_string(&path, &file.code).unwrap();
        }
        std::fs::write(tmp.path().join("notes.txt"), "class Nope {}").unwrap();

        let result = embed_dir(tmp.path(), &EmbedConfig::default()).unwrap();
        assert_eq!(result.unit_ids, ["I/D.cs", "Internal/Secret.cs", "Put.cs"]);
        assert!(result.excluded.is_empty());
    }
}
