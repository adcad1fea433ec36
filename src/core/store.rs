//! UnitStore - the indexed, immutable set of library units.
//!
//! The store is built once and never mutated. Adding units means building a
//! new store, which rebuilds the type index and the unit graph. Once built it
//! is `Send + Sync` and can be shared across resolution workers.

use std::collections::{BTreeSet, HashMap};

use miette::Diagnostic as MietteDiagnostic;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use thiserror::Error;

use crate::core::SourceUnit;
use crate::util::diagnostic::Diagnostic;

/// Structural error while building a store.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum StoreError {
    #[error("type `{type_id}` is declared by both `{first}` and `{second}`")]
    #[diagnostic(
        code(splice::store::duplicate_declaration),
        help("Rename one of the types or exclude one declaration from embedding")
    )]
    DuplicateDeclaration {
        type_id: String,
        first: String,
        second: String,
    },

    #[error("unit `{id}` appears more than once")]
    #[diagnostic(code(splice::store::duplicate_unit))]
    DuplicateUnit { id: String },
}

impl StoreError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            StoreError::DuplicateDeclaration {
                type_id,
                first,
                second,
            } => Diagnostic::error(format!("ambiguous type `{}`", type_id))
                .with_context(format!("declared in `{}`", first))
                .with_context(format!("declared again in `{}`", second))
                .with_suggestion("Rename one of the types")
                .with_suggestion(format!(
                    "Add `{}` to exclude_declarations in the producing library",
                    type_id
                )),
            StoreError::DuplicateUnit { id } => {
                Diagnostic::error(format!("unit `{}` appears more than once", id))
                    .with_suggestion("Load each library manifest only once")
            }
        }
    }
}

/// An indexed collection of units.
#[derive(Debug, Clone, Default)]
pub struct UnitStore {
    /// Units by id
    units: HashMap<String, SourceUnit>,

    /// Unit ids in ordinal order
    ordered: Vec<String>,

    /// Owning unit id for every declared type
    type_index: HashMap<String, String>,

    /// Unit dependency graph (edge a -> b means a needs b)
    graph: DiGraph<String, ()>,

    /// Map from unit id to node index
    nodes: HashMap<String, NodeIndex>,

    /// Dependency ids named by a unit but absent from the store
    dangling: HashMap<String, BTreeSet<String>>,
}

impl UnitStore {
    /// Build a store, failing if two units declare the same type.
    pub fn build(units: impl IntoIterator<Item = SourceUnit>) -> Result<Self, StoreError> {
        let mut store = UnitStore::default();

        for unit in units {
            if store.units.contains_key(unit.id()) {
                return Err(StoreError::DuplicateUnit {
                    id: unit.id().to_string(),
                });
            }

            for type_id in unit.declared_types() {
                if let Some(owner) = store.type_index.get(type_id) {
                    return Err(StoreError::DuplicateDeclaration {
                        type_id: type_id.clone(),
                        first: owner.clone(),
                        second: unit.id().to_string(),
                    });
                }
                store
                    .type_index
                    .insert(type_id.clone(), unit.id().to_string());
            }

            let node = store.graph.add_node(unit.id().to_string());
            store.nodes.insert(unit.id().to_string(), node);
            store.units.insert(unit.id().to_string(), unit);
        }

        store.ordered = store.units.keys().cloned().collect();
        store.ordered.sort();
        store.link();

        tracing::debug!(
            units = store.units.len(),
            types = store.type_index.len(),
            edges = store.graph.edge_count(),
            "built unit store"
        );

        Ok(store)
    }

    /// Build a new store containing these units plus `more`.
    pub fn extend(&self, more: impl IntoIterator<Item = SourceUnit>) -> Result<Self, StoreError> {
        let existing = self.ordered.iter().filter_map(|id| self.units.get(id).cloned());
        UnitStore::build(existing.chain(more))
    }

    /// Add graph edges from explicit dependencies and from used types.
    fn link(&mut self) {
        for id in &self.ordered {
            let Some(unit) = self.units.get(id) else {
                continue;
            };
            let from = self.nodes[id];

            let mut targets: BTreeSet<&str> = BTreeSet::new();
            for dep in unit.dependencies() {
                if self.nodes.contains_key(dep) {
                    targets.insert(dep.as_str());
                } else {
                    self.dangling
                        .entry(id.clone())
                        .or_default()
                        .insert(dep.clone());
                }
            }
            for used in unit.used_types() {
                if let Some(owner) = self.type_index.get(used) {
                    targets.insert(owner.as_str());
                }
            }
            targets.remove(id.as_str());

            for target in targets {
                let to = self.nodes[target];
                self.graph.add_edge(from, to, ());
            }
        }
    }

    /// Owning unit id of a type identifier.
    pub fn find(&self, type_id: &str) -> Option<&str> {
        self.type_index.get(type_id).map(String::as_str)
    }

    /// Get a unit by id.
    pub fn get(&self, id: &str) -> Option<&SourceUnit> {
        self.units.get(id)
    }

    /// Check if a unit with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Iterate over units in ordinal id order.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.ordered.iter().filter_map(|id| self.units.get(id))
    }

    /// Get the number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Every declared type identifier.
    pub fn declared_types(&self) -> impl Iterator<Item = &str> {
        self.type_index.keys().map(String::as_str)
    }

    /// Namespaces of all declared types, taken as the text before the last `.`.
    pub fn namespaces(&self) -> BTreeSet<String> {
        self.type_index
            .keys()
            .filter_map(|t| t.rsplit_once('.').map(|(ns, _)| ns.to_string()))
            .collect()
    }

    /// Direct dependencies of a unit that are present in the store.
    pub fn deps(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Units that directly depend on the given unit.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        match self.nodes.get(id) {
            Some(&node) => {
                let mut out: Vec<&str> = self
                    .graph
                    .neighbors_directed(node, direction)
                    .map(|n| self.graph[n].as_str())
                    .collect();
                out.sort_unstable();
                out
            }
            None => Vec::new(),
        }
    }

    /// Dependency ids the unit names that no unit in the store provides.
    pub fn missing_dependencies(&self, id: &str) -> impl Iterator<Item = &str> {
        self.dangling
            .get(id)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Groups of mutually dependent units, each sorted, in ordinal order.
    ///
    /// Cycles are legal; this is for inspection only.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut ids: Vec<String> = scc.into_iter().map(|n| self.graph[n].clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        groups.sort();
        groups
    }
}
