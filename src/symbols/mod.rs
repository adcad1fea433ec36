//! Symbol sources.
//!
//! Resolution never parses code itself. It asks a [`SymbolSource`] which
//! fully-qualified types a piece of code references and which ones it
//! declares. A host compiler integration supplies a precise source; the
//! [`SyntacticSymbols`] fallback matches identifiers textually and may
//! over-include.

pub mod lexer;
pub mod syntactic;

use std::collections::BTreeSet;

pub use syntactic::SyntacticSymbols;

/// Answers symbol queries about code fragments.
///
/// Implementations must be safe to share across resolution workers.
pub trait SymbolSource: Send + Sync {
    /// Fully-qualified type identifiers referenced by `code`.
    fn referenced_types(&self, code: &str) -> BTreeSet<String>;

    /// Fully-qualified type identifiers introduced by declarations in `code`.
    fn declared_types(&self, code: &str) -> BTreeSet<String>;
}
