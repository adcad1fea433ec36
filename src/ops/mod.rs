//! High-level operations.
//!
//! This module contains the producer and consumer pipelines behind the
//! `splice` commands.

pub mod embed;
pub mod expand;
pub mod load;

pub use embed::{build_units, collect_files, embed, embed_dir, BuiltUnits, EmbedResult, SourceFile};
pub use expand::{ClosureCache, ExpandOptions, Expander, Expansion};
pub use load::{load_libraries, LoadOptions, LoadedLibraries, ManifestSource};
