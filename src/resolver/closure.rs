//! ResolvedClosure - the units one consumer root needs.

use crate::core::SourceUnit;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A dependency a resolved unit names but the store does not contain.
///
/// This is distinct from "not required": the unit is needed and missing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingUnit {
    /// Id of the resolved unit that depends on the missing one
    pub required_by: String,
    /// Id of the missing unit
    pub id: String,
}

impl MissingUnit {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(format!("unit `{}` is required but not embedded", self.id))
            .with_context(format!("required by `{}`", self.required_by))
            .with_suggestion(suggestions::MISSING_UNIT)
    }
}

/// The resolved units for one root, in ordinal id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedClosure {
    units: Vec<SourceUnit>,
    missing: Vec<MissingUnit>,
}

impl ResolvedClosure {
    pub(crate) fn new(mut units: Vec<SourceUnit>, mut missing: Vec<MissingUnit>) -> Self {
        units.sort_by(|a, b| a.id().cmp(b.id()));
        missing.sort();
        missing.dedup();
        ResolvedClosure { units, missing }
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    /// Unit ids in output order.
    pub fn ids(&self) -> Vec<&str> {
        self.units.iter().map(SourceUnit::id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.iter().any(|u| u.id() == id)
    }

    /// Required units that could not be found.
    pub fn missing(&self) -> &[MissingUnit] {
        &self.missing
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
