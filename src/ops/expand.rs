//! Output assembly: a consumer root plus the library units it uses.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use crate::core::UnitStore;
use crate::imports::{self, split_header};
use crate::resolver::{MissingUnit, ResolvedClosure, Resolver};
use crate::symbols::{SymbolSource, SyntacticSymbols};
use crate::util::diagnostic::Diagnostic;
use crate::util::hash::sha256_str;
use crate::util::{CancellationToken, Cancelled};

/// Opens the block of inlined library code.
pub const REGION_START: &str = "#region Expanded by splice";
/// Closes the block of inlined library code.
pub const REGION_END: &str = "#endregion";

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandOptions {
    /// Emit `namespace X { }` for imported library namespaces that no
    /// inlined unit declares
    pub namespace_stubs: bool,
}

/// An expanded root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub code: String,
    /// Inlined unit ids, in output order
    pub ids: Vec<String>,
    pub missing: Vec<MissingUnit>,
}

impl Expansion {
    /// One warning per required unit that was not embedded.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.missing.iter().map(MissingUnit::to_diagnostic).collect()
    }
}

/// Closures memoized by root content hash.
#[derive(Debug, Default)]
pub struct ClosureCache {
    entries: RwLock<HashMap<String, Arc<ResolvedClosure>>>,
}

impl ClosureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, root: &str) -> Option<Arc<ResolvedClosure>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&sha256_str(root)).cloned()
    }

    pub fn insert(&self, root: &str, closure: Arc<ResolvedClosure>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(sha256_str(root), closure);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expands consumer roots against a shared store.
pub struct Expander {
    store: Arc<UnitStore>,
    symbols: Arc<dyn SymbolSource>,
    options: ExpandOptions,
    cache: ClosureCache,
}

impl Expander {
    /// Create an expander that finds references syntactically.
    pub fn new(store: Arc<UnitStore>) -> Self {
        let symbols = Arc::new(SyntacticSymbols::for_store(&store));
        Self::with_symbols(store, symbols)
    }

    /// Create an expander using a custom symbol source.
    pub fn with_symbols(store: Arc<UnitStore>, symbols: Arc<dyn SymbolSource>) -> Self {
        Expander {
            store,
            symbols,
            options: ExpandOptions::default(),
            cache: ClosureCache::new(),
        }
    }

    pub fn options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &UnitStore {
        &self.store
    }

    pub fn cache(&self) -> &ClosureCache {
        &self.cache
    }

    /// Resolve the closure for one root.
    pub fn resolve(
        &self,
        root: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolvedClosure, Cancelled> {
        let used = self.symbols.referenced_types(root);
        Resolver::new(&self.store)
            .with_cancellation(cancel)
            .resolve(&used)
    }

    /// Expand one root.
    pub fn expand(&self, root: &str, cancel: &CancellationToken) -> Result<Expansion, Cancelled> {
        let closure = self.resolve(root, cancel)?;
        Ok(self.assemble(root, &closure))
    }

    /// Expand one root, reusing the closure of an identical earlier root.
    pub fn expand_cached(
        &self,
        root: &str,
        cancel: &CancellationToken,
    ) -> Result<Expansion, Cancelled> {
        let closure = match self.cache.get(root) {
            Some(closure) => closure,
            None => {
                let closure = Arc::new(self.resolve(root, cancel)?);
                self.cache.insert(root, Arc::clone(&closure));
                closure
            }
        };
        Ok(self.assemble(root, &closure))
    }

    /// Expand many roots in parallel.
    ///
    /// Either every root expands or the whole batch reports [`Cancelled`].
    pub fn expand_all<R>(
        &self,
        roots: &[R],
        cancel: &CancellationToken,
    ) -> Result<Vec<Expansion>, Cancelled>
    where
        R: AsRef<str> + Sync,
    {
        tracing::debug!(roots = roots.len(), "expanding roots");
        roots
            .par_iter()
            .map(|root| {
                cancel.check()?;
                self.expand_cached(root.as_ref(), cancel)
            })
            .collect()
    }

    fn assemble(&self, root: &str, closure: &ResolvedClosure) -> Expansion {
        let (root_imports, root_body) = split_header(root);
        let merged = imports::merge(&root_imports, closure.units().iter().map(|u| u.imports()));

        let mut code = String::new();
        for line in &merged {
            code.push_str(line);
            code.push('\n');
        }
        if !merged.is_empty() {
            code.push('\n');
        }
        code.push_str(root_body.trim_end());
        code.push('\n');

        if !closure.is_empty() {
            code.push('\n');
            code.push_str(REGION_START);
            code.push('\n');
            for unit in closure.units() {
                code.push_str(unit.body().trim_matches('\n').trim_end());
                code.push('\n');
            }
            code.push_str(REGION_END);
            code.push('\n');
        }

        if self.options.namespace_stubs {
            let stubs = self.stub_namespaces(&merged, closure);
            if !stubs.is_empty() {
                code.push('\n');
                for ns in stubs {
                    code.push_str(&format!("namespace {} {{ }}\n", ns));
                }
            }
        }

        for missing in closure.missing() {
            tracing::warn!(unit = %missing.id, required_by = %missing.required_by, "required unit is not embedded");
        }

        Expansion {
            code,
            ids: closure.ids().into_iter().map(str::to_string).collect(),
            missing: closure.missing().to_vec(),
        }
    }

    /// Imported library namespaces with no declaration in the output.
    fn stub_namespaces(&self, lines: &[String], closure: &ResolvedClosure) -> BTreeSet<String> {
        let library = self.store.namespaces();
        let declared: BTreeSet<String> = closure
            .units()
            .iter()
            .flat_map(|u| u.declared_types())
            .filter_map(|t| t.rsplit_once('.').map(|(ns, _)| ns.to_string()))
            .collect();

        lines
            .iter()
            .filter_map(|line| imports::namespace_of(line))
            .filter(|ns| library.contains(ns) && !declared.contains(ns))
            .collect()
    }
}
