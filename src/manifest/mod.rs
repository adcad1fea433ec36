//! Manifest serialization.
//!
//! A manifest is the unit set of one library plus a little metadata. It is
//! carried as string key/value attributes on the compiled artifact: the unit
//! records are JSON, optionally wrapped by the [codec](crate::codec), and
//! split across numbered keys when longer than the chunk size.

pub mod attributes;
pub mod record;

pub use record::UnitRecord;

use std::collections::HashMap;
use std::error::Error as _;

use miette::Diagnostic as MietteDiagnostic;
use semver::Version;
use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::compat::LanguageLevel;
use crate::core::{SourceUnit, StoreError, UnitStore};
use crate::util::config::{EmbedConfig, EmbeddingMode, DEFAULT_CHUNK_SIZE};
use crate::util::diagnostic::{suggestions, Diagnostic};
use attributes::{
    chunk_key, split_chunks, CHUNK_COUNT_KEY, LANGUAGE_KEY, MODE_KEY, NAMESPACES_KEY, UNITS_KEY,
    VERSION_KEY,
};

/// Error reading or writing a manifest.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ManifestError {
    #[error("no `{}` payload found", UNITS_KEY)]
    #[diagnostic(code(splice::manifest::missing_payload))]
    MissingPayload,

    #[error("chunk {index} of {count} is missing")]
    #[diagnostic(code(splice::manifest::missing_chunk))]
    MissingChunk { index: usize, count: usize },

    #[error("invalid chunk count `{0}`")]
    #[diagnostic(code(splice::manifest::bad_chunk_count))]
    BadChunkCount(String),

    #[error("unknown embedding mode `{0}`")]
    #[diagnostic(code(splice::manifest::unknown_mode))]
    UnknownMode(String),

    #[error("invalid value `{value}` for `{key}`")]
    #[diagnostic(code(splice::manifest::invalid_metadata))]
    InvalidMetadata { key: &'static str, value: String },

    #[error("malformed unit records")]
    #[diagnostic(code(splice::manifest::parse))]
    Parse(#[source] serde_json::Error),

    #[error("failed to write unit records")]
    #[diagnostic(code(splice::manifest::write))]
    Write(#[source] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),
}

impl ManifestError {
    /// Convert to a user-friendly diagnostic attributed to `source_name`.
    pub fn to_diagnostic(&self, source_name: &str) -> Diagnostic {
        let mut diag = Diagnostic::error(format!("could not read manifest: {}", self))
            .with_origin(source_name);

        let mut cause = self.source();
        while let Some(err) = cause {
            diag = diag.with_context(err.to_string());
            cause = err.source();
        }

        diag.with_suggestion(suggestions::REBUILD_LIBRARY)
    }
}

/// Scalar metadata stored next to the units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestMetadata {
    /// Version of the tool that produced the manifest
    pub version: Option<Version>,
    /// Minimum language level consumers need
    pub language_level: Option<LanguageLevel>,
    /// Top-level namespaces present in the library
    pub namespaces: Vec<String>,
}

/// A library's unit set plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub units: Vec<SourceUnit>,
    pub metadata: ManifestMetadata,
}

impl Manifest {
    pub fn new(units: Vec<SourceUnit>, metadata: ManifestMetadata) -> Self {
        Manifest { units, metadata }
    }

    /// Build a unit store from this manifest's units.
    pub fn to_store(&self) -> Result<UnitStore, StoreError> {
        UnitStore::build(self.units.iter().cloned())
    }
}

/// Options for [`serialize`].
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub mode: EmbeddingMode,
    /// Maximum characters per attribute value
    pub chunk_size: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            mode: EmbeddingMode::Compact,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl From<&EmbedConfig> for SerializeOptions {
    fn from(config: &EmbedConfig) -> Self {
        SerializeOptions {
            mode: config.embedding_mode,
            chunk_size: config.chunk_size,
        }
    }
}

/// Serialize a manifest to attribute key/value pairs.
pub fn serialize(
    manifest: &Manifest,
    options: SerializeOptions,
) -> Result<Vec<(String, String)>, ManifestError> {
    let records: Vec<UnitRecord> = manifest.units.iter().map(UnitRecord::from).collect();
    let json = serde_json::to_string(&records).map_err(ManifestError::Write)?;

    let payload = match options.mode {
        EmbeddingMode::Raw => json,
        EmbeddingMode::Compact => codec::encode(json.as_bytes())?,
    };

    let mut entries = vec![(MODE_KEY.to_string(), options.mode.to_string())];

    let metadata = &manifest.metadata;
    if let Some(version) = &metadata.version {
        entries.push((VERSION_KEY.to_string(), version.to_string()));
    }
    if let Some(level) = &metadata.language_level {
        entries.push((LANGUAGE_KEY.to_string(), level.to_string()));
    }
    if !metadata.namespaces.is_empty() {
        entries.push((NAMESPACES_KEY.to_string(), metadata.namespaces.join(",")));
    }

    let chunks = split_chunks(&payload, options.chunk_size);
    if chunks.len() == 1 {
        entries.push((UNITS_KEY.to_string(), payload.clone()));
    } else {
        entries.push((CHUNK_COUNT_KEY.to_string(), chunks.len().to_string()));
        for (index, chunk) in chunks.iter().enumerate() {
            entries.push((chunk_key(index), chunk.to_string()));
        }
    }

    tracing::debug!(
        units = manifest.units.len(),
        mode = %options.mode,
        chars = payload.chars().count(),
        chunks = chunks.len(),
        "serialized manifest"
    );

    Ok(entries)
}

/// Deserialize a manifest from attribute key/value pairs.
///
/// Keys may arrive in any order and unknown keys are ignored.
pub fn deserialize<I, K, V>(entries: I) -> Result<Manifest, ManifestError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let map: HashMap<String, String> = entries
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();

    let payload = reassemble(&map)?;

    let mode = match map.get(MODE_KEY).map(String::as_str) {
        Some("raw") => EmbeddingMode::Raw,
        Some("compact") => EmbeddingMode::Compact,
        Some(other) => return Err(ManifestError::UnknownMode(other.to_string())),
        None if payload.trim_start().starts_with('[') => EmbeddingMode::Raw,
        None => EmbeddingMode::Compact,
    };

    let records: Vec<UnitRecord> = match mode {
        EmbeddingMode::Raw => serde_json::from_str(&payload).map_err(ManifestError::Parse)?,
        EmbeddingMode::Compact => {
            let bytes = codec::decode(&payload)?;
            serde_json::from_slice(&bytes).map_err(ManifestError::Parse)?
        }
    };

    let metadata = ManifestMetadata {
        version: map
            .get(VERSION_KEY)
            .map(|v| {
                Version::parse(v).map_err(|_| ManifestError::InvalidMetadata {
                    key: VERSION_KEY,
                    value: v.clone(),
                })
            })
            .transpose()?,
        language_level: map
            .get(LANGUAGE_KEY)
            .map(|v| {
                v.parse().map_err(|_| ManifestError::InvalidMetadata {
                    key: LANGUAGE_KEY,
                    value: v.clone(),
                })
            })
            .transpose()?,
        namespaces: map
            .get(NAMESPACES_KEY)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    };

    Ok(Manifest {
        units: records.into_iter().map(SourceUnit::from).collect(),
        metadata,
    })
}

/// Join chunked payloads, or return the single payload.
fn reassemble(map: &HashMap<String, String>) -> Result<String, ManifestError> {
    let Some(count) = map.get(CHUNK_COUNT_KEY) else {
        return map.get(UNITS_KEY).cloned().ok_or(ManifestError::MissingPayload);
    };

    let count: usize = count
        .trim()
        .parse()
        .map_err(|_| ManifestError::BadChunkCount(count.clone()))?;
    if count == 0 {
        return Err(ManifestError::BadChunkCount(count.to_string()));
    }

    let mut payload = String::new();
    for index in 0..count {
        let chunk = map
            .get(&chunk_key(index))
            .ok_or(ManifestError::MissingChunk { index, count })?;
        payload.push_str(chunk);
    }
    Ok(payload)
}
