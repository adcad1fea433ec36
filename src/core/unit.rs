//! SourceUnit - one embeddable piece of library source.
//!
//! A unit is immutable once built and is Arc-wrapped internally, so the
//! store, closures and manifests can all hold it without copying bodies.

use std::collections::BTreeSet;
use std::sync::Arc;

/// A library source unit.
#[derive(Clone)]
pub struct SourceUnit {
    inner: Arc<UnitInner>,
}

#[derive(Clone, PartialEq, Eq)]
struct UnitInner {
    id: String,
    declared_types: BTreeSet<String>,
    used_types: BTreeSet<String>,
    imports: Vec<String>,
    dependencies: BTreeSet<String>,
    body: String,
}

impl SourceUnit {
    /// Create a unit with an id and a body (already stripped of imports).
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        SourceUnit {
            inner: Arc::new(UnitInner {
                id: id.into(),
                declared_types: BTreeSet::new(),
                used_types: BTreeSet::new(),
                imports: Vec::new(),
                dependencies: BTreeSet::new(),
                body: body.into(),
            }),
        }
    }

    /// Set the fully-qualified type identifiers this unit defines.
    pub fn with_declared_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.inner).declared_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the type identifiers referenced by the body.
    pub fn with_used_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.inner).used_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the raw import lines in source order.
    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.inner).imports = imports.into_iter().map(Into::into).collect();
        self
    }

    /// Set the ids of units this one depends on.
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.inner).dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the body, keeping everything else.
    pub fn map_body<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&str) -> String,
    {
        let body = f(&self.inner.body);
        Arc::make_mut(&mut self.inner).body = body;
        self
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn declared_types(&self) -> &BTreeSet<String> {
        &self.inner.declared_types
    }

    pub fn used_types(&self) -> &BTreeSet<String> {
        &self.inner.used_types
    }

    pub fn imports(&self) -> &[String] {
        &self.inner.imports
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.inner.dependencies
    }

    pub fn body(&self) -> &str {
        &self.inner.body
    }
}

impl std::fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("id", &self.inner.id)
            .field("declared_types", &self.inner.declared_types)
            .field("dependencies", &self.inner.dependencies)
            .field("imports", &self.inner.imports.len())
            .field("body", &self.inner.body.len())
            .finish()
    }
}

impl std::fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.id)
    }
}

impl PartialEq for SourceUnit {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for SourceUnit {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_builder() {
        let unit = SourceUnit::new("I/D.cs", "namespace Lib.I { class D {} }")
            .with_declared_types(["Lib.I.D"])
            .with_used_types(["Lib.Put", "System.Int32"])
            .with_imports(["using System;"])
            .with_dependencies(["Put.cs"]);

        assert_eq!(unit.id(), "I/D.cs");
        assert!(unit.declared_types().contains("Lib.I.D"));
        assert_eq!(unit.used_types().len(), 2);
        assert_eq!(unit.imports(), ["using System;".to_string()]);
        assert!(unit.dependencies().contains("Put.cs"));
    }

    #[test]
    fn test_unit_cheap_clone() {
        let a = SourceUnit::new("A.cs", "class A {}");
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn test_map_body_does_not_touch_clones() {
        let a = SourceUnit::new("A.cs", "class  A {}");
        let b = a.clone().map_body(|s| s.replace("  ", " "));

        assert_eq!(a.body(), "class  A {}");
        assert_eq!(b.body(), "class A {}");
        assert_ne!(a, b);
    }
}
