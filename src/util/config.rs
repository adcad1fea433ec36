//! Configuration file support for Splice.
//!
//! Splice supports two configuration file locations:
//! - Global: `~/.splice/config.toml` - User-wide defaults
//! - Project: `.splice/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Default maximum characters per manifest attribute value.
pub const DEFAULT_CHUNK_SIZE: usize = 32_000;

/// Splice configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Producer (embedding) settings
    pub embed: EmbedConfig,

    /// Consumer compatibility settings
    pub compat: CompatConfig,
}

/// How the unit manifest payload is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Plain JSON records
    Raw,
    /// Deflated and text-packed JSON records
    #[default]
    Compact,
}

impl EmbeddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMode::Raw => "raw",
            EmbeddingMode::Compact => "compact",
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(EmbeddingMode::Raw),
            "compact" => Ok(EmbeddingMode::Compact),
            other => bail!("unknown embedding mode `{}` (expected `raw` or `compact`)", other),
        }
    }
}

/// Producer-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Payload shape of the embedded manifest
    pub embedding_mode: EmbeddingMode,

    /// Minify unit bodies before embedding
    pub minify: bool,

    /// Type identifier globs whose declaring units are not embedded
    pub exclude_declarations: Vec<String>,

    /// Unit id globs selecting which files become units
    pub path_filter_globs: Vec<String>,

    /// Maximum characters per attribute value before chunking
    pub chunk_size: usize,

    /// Minimum language level consumers need (e.g. "7.3")
    pub language_level: Option<String>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfig {
            embedding_mode: EmbeddingMode::Compact,
            minify: false,
            exclude_declarations: Vec::new(),
            path_filter_globs: vec!["**/*.cs".to_string()],
            chunk_size: DEFAULT_CHUNK_SIZE,
            language_level: None,
        }
    }
}

impl EmbedConfig {
    /// Compile `exclude_declarations`.
    pub fn exclude_patterns(&self) -> Result<Vec<glob::Pattern>> {
        compile_patterns(&self.exclude_declarations, "exclude_declarations")
    }

    /// Compile `path_filter_globs`.
    pub fn path_patterns(&self) -> Result<Vec<glob::Pattern>> {
        compile_patterns(&self.path_filter_globs, "path_filter_globs")
    }
}

fn compile_patterns(patterns: &[String], key: &str) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).with_context(|| format!("invalid pattern `{}` in {}", p, key))
        })
        .collect()
}

/// Consumer-side compatibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Major-version gap at which an outdated consumer becomes a warning
    pub stale_major_threshold: u64,
}

impl Default for CompatConfig {
    fn default() -> Self {
        CompatConfig {
            stale_major_threshold: 1,
        }
    }
}

/// One configuration file as written.
///
/// Every key is optional so a layer only overrides what it names. A project
/// file that sets a key back to its default value still wins over the
/// global file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub embed: EmbedLayer,
    pub compat: CompatLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbedLayer {
    pub embedding_mode: Option<EmbeddingMode>,
    pub minify: Option<bool>,
    pub exclude_declarations: Option<Vec<String>>,
    pub path_filter_globs: Option<Vec<String>>,
    pub chunk_size: Option<usize>,
    pub language_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompatLayer {
    pub stale_major_threshold: Option<u64>,
}

impl ConfigLayer {
    /// Load one layer from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load a layer, treating a missing or broken file as empty.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}

impl Config {
    /// Load configuration from a file, over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.apply(ConfigLayer::load(path)?);
        Ok(config)
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = Config::default();
        config.apply(ConfigLayer::load_or_default(path));
        config
    }

    /// Overlay a layer: every key the layer sets replaces the current value.
    pub fn apply(&mut self, layer: ConfigLayer) {
        let ConfigLayer { embed, compat } = layer;

        if let Some(mode) = embed.embedding_mode {
            self.embed.embedding_mode = mode;
        }
        if let Some(minify) = embed.minify {
            self.embed.minify = minify;
        }
        if let Some(excludes) = embed.exclude_declarations {
            self.embed.exclude_declarations = excludes;
        }
        if let Some(globs) = embed.path_filter_globs {
            self.embed.path_filter_globs = globs;
        }
        if let Some(chunk_size) = embed.chunk_size {
            self.embed.chunk_size = chunk_size;
        }
        if embed.language_level.is_some() {
            self.embed.language_level = embed.language_level;
        }

        if let Some(threshold) = compat.stale_major_threshold {
            self.compat.stale_major_threshold = threshold;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.splice/config.toml)
/// 2. Global config (~/.splice/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.apply(ConfigLayer::load_or_default(global_path));
    }

    config.apply(ConfigLayer::load_or_default(project_path));

    config
}

/// Get the global splice config directory (~/.splice).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".splice"))
}

/// Get the global config path (~/.splice/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.splice/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".splice").join("config.toml")
}
