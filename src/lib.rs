//! Splice - source bundling for snippet-style libraries
//!
//! A library's units are embedded into its compiled artifact as manifest
//! attributes. Consumers decode those manifests and expand a root file into
//! one self-contained file that inlines only the units it uses.

pub mod codec;
pub mod compat;
pub mod core;
pub mod imports;
pub mod manifest;
pub mod ops;
pub mod resolver;
pub mod symbols;
pub mod transform;
pub mod util;

pub use compat::{Advisory, CompatibilityGate, LanguageLevel};
pub use crate::core::{SourceUnit, StoreError, UnitStore};
pub use manifest::{Manifest, ManifestError, ManifestMetadata};
pub use resolver::{ResolvedClosure, Resolver};

/// Version of this tool, as recorded in produced manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// [`VERSION`] as a semantic version.
pub fn tool_version() -> semver::Version {
    semver::Version::parse(VERSION).unwrap_or_else(|_| semver::Version::new(0, 0, 0))
}
