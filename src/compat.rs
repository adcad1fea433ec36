//! Producer/consumer compatibility checks.
//!
//! The gate only reports. Callers decide what a finding means for their
//! build: a too-low language level is marked blocking, but nothing here
//! refuses to proceed.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

use crate::manifest::ManifestMetadata;
use crate::util::config::CompatConfig;
use crate::util::diagnostic::{suggestions, Diagnostic, Severity};

/// A source language level such as `7.3`, `12`, `latest` or `preview`.
///
/// Numbered levels order numerically; `latest` sorts above every number and
/// `preview` above `latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LanguageLevel {
    Numbered { major: u32, minor: u32 },
    Latest,
    Preview,
}

impl LanguageLevel {
    pub fn new(major: u32, minor: u32) -> Self {
        LanguageLevel::Numbered { major, minor }
    }
}

impl fmt::Display for LanguageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageLevel::Numbered { major, minor: 0 } => write!(f, "{}", major),
            LanguageLevel::Numbered { major, minor } => write!(f, "{}.{}", major, minor),
            LanguageLevel::Latest => write!(f, "latest"),
            LanguageLevel::Preview => write!(f, "preview"),
        }
    }
}

/// Unparseable language level string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid language level `{0}`")]
pub struct InvalidLanguageLevel(pub String);

impl FromStr for LanguageLevel {
    type Err = InvalidLanguageLevel;

    /// Accepts `7`, `7.3`, `7_3`, and a `csharp` prefix (`CSharp7_3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidLanguageLevel(s.to_string());
        let lower = s.trim().to_ascii_lowercase();

        match lower.as_str() {
            "latest" | "latestmajor" => return Ok(LanguageLevel::Latest),
            "preview" => return Ok(LanguageLevel::Preview),
            _ => {}
        }

        let digits = lower.strip_prefix("csharp").unwrap_or(&lower);
        let (major, minor) = match digits.split_once(['.', '_']) {
            Some((major, minor)) => (major, minor),
            None => (digits, "0"),
        };
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(LanguageLevel::Numbered { major, minor })
    }
}

/// What a compatibility finding is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryKind {
    /// The consuming tool predates the tool that produced the manifest.
    ConsumerOlderThanProducer { consumer: Version, producer: Version },
    /// The consuming project targets a lower language level than required.
    LanguageLevelTooLow {
        consumer: LanguageLevel,
        required: LanguageLevel,
    },
}

/// A non-fatal compatibility finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub severity: Severity,
}

impl Advisory {
    /// Whether callers should treat this finding as stopping the build.
    pub fn is_blocking(&self) -> bool {
        matches!(self.kind, AdvisoryKind::LanguageLevelTooLow { .. })
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match &self.kind {
            AdvisoryKind::ConsumerOlderThanProducer { consumer, producer } => Diagnostic::note(
                format!(
                    "library was produced by splice {} but this is splice {}",
                    producer, consumer
                ),
            )
            .with_suggestion(suggestions::UPGRADE_TOOL),
            AdvisoryKind::LanguageLevelTooLow { consumer, required } => Diagnostic::error(
                format!("language level too low: library requires {}", required),
            )
            .with_context(format!("consumer language level is {}", consumer))
            .with_suggestion(suggestions::RAISE_LANGUAGE),
        };
        Diagnostic {
            severity: self.severity,
            ..diag
        }
    }
}

/// Compares consumer capabilities against manifest metadata.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityGate {
    stale_major_threshold: u64,
}

impl Default for CompatibilityGate {
    fn default() -> Self {
        Self::from_config(&CompatConfig::default())
    }
}

impl CompatibilityGate {
    /// `stale_major_threshold` is the major-version gap at which an older
    /// consumer is reported as a warning instead of a note.
    pub fn new(stale_major_threshold: u64) -> Self {
        CompatibilityGate {
            stale_major_threshold,
        }
    }

    pub fn from_config(config: &CompatConfig) -> Self {
        Self::new(config.stale_major_threshold)
    }

    /// Check a consumer against one manifest's metadata.
    ///
    /// Metadata fields the producer did not record yield no advisory, and
    /// neither does an unknown consumer language level.
    pub fn check(
        &self,
        consumer_version: &Version,
        consumer_level: Option<LanguageLevel>,
        metadata: &ManifestMetadata,
    ) -> Vec<Advisory> {
        let mut advisories = Vec::new();

        if let Some(producer) = &metadata.version {
            if consumer_version < producer {
                let gap = producer.major.saturating_sub(consumer_version.major);
                let severity = if gap >= self.stale_major_threshold {
                    Severity::Warning
                } else {
                    Severity::Note
                };
                advisories.push(Advisory {
                    kind: AdvisoryKind::ConsumerOlderThanProducer {
                        consumer: consumer_version.clone(),
                        producer: producer.clone(),
                    },
                    severity,
                });
            }
        }

        if let (Some(consumer), Some(required)) = (consumer_level, metadata.language_level) {
            if consumer < required {
                advisories.push(Advisory {
                    kind: AdvisoryKind::LanguageLevelTooLow { consumer, required },
                    severity: Severity::Error,
                });
            }
        }

        advisories
    }
}
