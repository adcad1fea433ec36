//! Dependency closure resolution.
//!
//! Starting from the types a consumer root uses, the resolver walks the
//! store's unit graph breadth-first and returns every reachable unit exactly
//! once. The resolver is pure: it only reads an immutable [`UnitStore`], so
//! any number of resolvers can share one store across threads.

pub mod closure;

pub use closure::{MissingUnit, ResolvedClosure};

use std::collections::{HashSet, VecDeque};

use crate::core::UnitStore;
use crate::util::{CancellationToken, Cancelled};

/// Computes closures against one store.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a UnitStore,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a store.
    pub fn new(store: &'a UnitStore) -> Self {
        Resolver {
            store,
            cancel: None,
        }
    }

    /// Check `token` before every traversal step.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn store(&self) -> &'a UnitStore {
        self.store
    }

    fn check(&self) -> Result<(), Cancelled> {
        match self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    /// Resolve the units required by a set of used type identifiers.
    ///
    /// Types with no owning unit (standard library, unrelated assemblies)
    /// are skipped. Without a cancellation token this never fails.
    pub fn resolve<I, S>(&self, root_used_types: I) -> Result<ResolvedClosure, Cancelled>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        for type_id in root_used_types {
            self.check()?;
            let type_id = type_id.as_ref();
            match self.store.find(type_id) {
                Some(owner) => {
                    if visited.insert(owner) {
                        queue.push_back(owner);
                    }
                }
                None => tracing::trace!(type_id, "skipping type with no owning unit"),
            }
        }

        let mut units = Vec::with_capacity(visited.len());
        let mut missing = Vec::new();

        while let Some(id) = queue.pop_front() {
            self.check()?;

            let Some(unit) = self.store.get(id) else {
                continue;
            };
            units.push(unit.clone());

            for dep in self.store.deps(id) {
                if visited.insert(dep) {
                    queue.push_back(dep);
                }
            }
            for gone in self.store.missing_dependencies(id) {
                missing.push(MissingUnit {
                    required_by: id.to_string(),
                    id: gone.to_string(),
                });
            }
        }

        tracing::debug!(
            units = units.len(),
            missing = missing.len(),
            "resolved closure"
        );

        Ok(ResolvedClosure::new(units, missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceUnit;

    fn unit(id: &str, declares: &[&str], deps: &[&str]) -> SourceUnit {
        SourceUnit::new(id, format!("// {id}"))
            .with_declared_types(declares.iter().copied())
            .with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_put_and_d_scenario() {
        let store = UnitStore::build([
            unit("Put.cs", &["Lib.Put"], &[]),
            unit("I/D.cs", &["Lib.I.D"], &["Put.cs"]),
        ])
        .unwrap();

        let closure = Resolver::new(&store).resolve(["Lib.I.D"]).unwrap();

        // Ordinal: 'I' (0x49) sorts before 'P' (0x50).
        assert_eq!(closure.ids(), ["I/D.cs", "Put.cs"]);
        assert!(closure.missing().is_empty());
    }

    #[test]
    fn test_only_reachable_units() {
        let store = UnitStore::build([
            unit("A.cs", &["Lib.A"], &["B.cs"]),
            unit("B.cs", &["Lib.B"], &["C.cs"]),
            unit("C.cs", &["Lib.C"], &[]),
            unit("D.cs", &["Lib.D"], &["A.cs"]),
            unit("E.cs", &["Lib.E"], &[]),
        ])
        .unwrap();

        let closure = Resolver::new(&store).resolve(["Lib.A"]).unwrap();
        assert_eq!(closure.ids(), ["A.cs", "B.cs", "C.cs"]);

        let closure = Resolver::new(&store).resolve(["Lib.C", "Lib.E"]).unwrap();
        assert_eq!(closure.ids(), ["C.cs", "E.cs"]);
    }

    #[test]
    fn test_diamond_units_appear_once() {
        let store = UnitStore::build([
            unit("Top.cs", &["Lib.Top"], &["Left.cs", "Right.cs"]),
            unit("Left.cs", &["Lib.Left"], &["Base.cs"]),
            unit("Right.cs", &["Lib.Right"], &["Base.cs"]),
            unit("Base.cs", &["Lib.Base"], &[]),
        ])
        .unwrap();

        let closure = Resolver::new(&store)
            .resolve(["Lib.Top", "Lib.Base", "Lib.Left"])
            .unwrap();
        assert_eq!(closure.ids(), ["Base.cs", "Left.cs", "Right.cs", "Top.cs"]);
    }

    #[test]
    fn test_cycle_through_used_types() {
        let store = UnitStore::build([
            SourceUnit::new("A.cs", "")
                .with_declared_types(["Lib.A"])
                .with_used_types(["Lib.B"]),
            SourceUnit::new("B.cs", "")
                .with_declared_types(["Lib.B"])
                .with_used_types(["Lib.A"]),
        ])
        .unwrap();

        let closure = Resolver::new(&store).resolve(["Lib.B"]).unwrap();
        assert_eq!(closure.ids(), ["A.cs", "B.cs"]);
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let store = UnitStore::build([unit("A.cs", &["Lib.A"], &[])]).unwrap();

        let closure = Resolver::new(&store)
            .resolve(["System.String", "System.Collections.Generic.List"])
            .unwrap();
        assert!(closure.is_empty());

        let closure = Resolver::new(&store)
            .resolve(Vec::<String>::new())
            .unwrap();
        assert!(closure.is_empty());
    }

    #[test]
    fn test_deterministic_across_build_order() {
        let units = vec![
            unit("b/Z.cs", &["Lib.Z"], &["a/Y.cs"]),
            unit("a/Y.cs", &["Lib.Y"], &["X.cs"]),
            unit("X.cs", &["Lib.X"], &["b/Z.cs"]),
        ];
        let mut reversed = units.clone();
        reversed.reverse();

        let one = UnitStore::build(units).unwrap();
        let two = UnitStore::build(reversed).unwrap();

        let first = Resolver::new(&one).resolve(["Lib.Z"]).unwrap();
        let again = Resolver::new(&one).resolve(["Lib.Z"]).unwrap();
        let other = Resolver::new(&two).resolve(["Lib.Z"]).unwrap();

        assert_eq!(first, again);
        assert_eq!(first.ids(), other.ids());
        assert_eq!(first.ids(), ["X.cs", "a/Y.cs", "b/Z.cs"]);
    }

    #[test]
    fn test_missing_dependency_is_reported() {
        let store = UnitStore::build([
            unit("A.cs", &["Lib.A"], &["Gone.cs"]),
            unit("Unused.cs", &["Lib.U"], &["AlsoGone.cs"]),
        ])
        .unwrap();

        let closure = Resolver::new(&store).resolve(["Lib.A"]).unwrap();
        assert_eq!(closure.ids(), ["A.cs"]);
        assert_eq!(
            closure.missing(),
            [MissingUnit {
                required_by: "A.cs".to_string(),
                id: "Gone.cs".to_string(),
            }]
        );
    }

    #[test]
    fn test_cancelled_resolution_returns_nothing() {
        let store = UnitStore::build([unit("A.cs", &["Lib.A"], &[])]).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = Resolver::new(&store)
            .with_cancellation(&token)
            .resolve(["Lib.A"]);
        assert_eq!(result, Err(Cancelled));
    }

    #[test]
    fn test_shared_store_across_threads() {
        let store = std::sync::Arc::new(
            UnitStore::build([
                unit("A.cs", &["Lib.A"], &["B.cs"]),
                unit("B.cs", &["Lib.B"], &[]),
            ])
            .unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    Resolver::new(&store)
                        .resolve(["Lib.A"])
                        .unwrap()
                        .ids()
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), ["A.cs", "B.cs"]);
        }
    }

    /// Yields root types, cancelling `token` once `after` items were taken.
    struct CancellingRoots<'a> {
        roots: std::vec::IntoIter<&'static str>,
        taken: usize,
        after: usize,
        token: &'a CancellationToken,
    }

    impl Iterator for CancellingRoots<'_> {
        type Item = &'static str;

        fn next(&mut self) -> Option<Self::Item> {
            if self.taken == self.after {
                self.token.cancel();
            }
            self.taken += 1;
            self.roots.next()
        }
    }

    fn chain_store() -> UnitStore {
        UnitStore::build([
            unit("A.cs", &["Lib.A"], &["B.cs"]),
            unit("B.cs", &["Lib.B"], &["C.cs"]),
            unit("C.cs", &["Lib.C"], &["D.cs"]),
            unit("D.cs", &["Lib.D"], &[]),
            unit("E.cs", &["Lib.E"], &[]),
        ])
        .unwrap()
    }

    #[test]
    fn test_cancelled_while_reading_roots() {
        let store = chain_store();
        let token = CancellationToken::new();
        let roots = CancellingRoots {
            roots: vec!["Lib.E", "Lib.A", "Lib.C"].into_iter(),
            taken: 0,
            after: 1,
            token: &token,
        };

        let result = Resolver::new(&store).with_cancellation(&token).resolve(roots);
        assert_eq!(result, Err(Cancelled));
    }

    #[test]
    fn test_cancelled_during_traversal() {
        let store = chain_store();
        let token = CancellationToken::new();
        // Cancels when the root iterator is exhausted, so every root is
        // queued and the first traversal step sees the signal.
        let roots = CancellingRoots {
            roots: vec!["Lib.A"].into_iter(),
            taken: 0,
            after: 1,
            token: &token,
        };

        let result = Resolver::new(&store).with_cancellation(&token).resolve(roots);
        assert_eq!(result, Err(Cancelled));

        let fresh = CancellationToken::new();
        let closure = Resolver::new(&store)
            .with_cancellation(&fresh)
            .resolve(["Lib.A"])
            .unwrap();
        assert_eq!(closure.ids(), ["A.cs", "B.cs", "C.cs", "D.cs"]);
    }
}
