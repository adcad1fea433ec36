//! Interchange records.
//!
//! One record per unit:
//!
//! ```json
//! { "id": "I/D.cs", "declaredTypes": ["Lib.I.D"], "imports": ["using System;"],
//!   "dependencies": ["Put.cs"], "body": "..." }
//! ```
//!
//! `imports` and `dependencies` may be `null` or absent. Unknown fields are
//! ignored so newer producers stay readable.

use serde::{Deserialize, Serialize};

use crate::core::SourceUnit;

/// A serialized source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub id: String,

    #[serde(default)]
    pub declared_types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,

    /// Referenced types, kept for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_types: Option<Vec<String>>,

    pub body: String,
}

fn non_empty<'a>(items: impl ExactSizeIterator<Item = &'a String>) -> Option<Vec<String>> {
    if items.len() == 0 {
        None
    } else {
        Some(items.cloned().collect())
    }
}

impl From<&SourceUnit> for UnitRecord {
    fn from(unit: &SourceUnit) -> Self {
        UnitRecord {
            id: unit.id().to_string(),
            declared_types: unit.declared_types().iter().cloned().collect(),
            imports: non_empty(unit.imports().iter()),
            dependencies: non_empty(unit.dependencies().iter()),
            used_types: non_empty(unit.used_types().iter()),
            body: unit.body().to_string(),
        }
    }
}

impl From<UnitRecord> for SourceUnit {
    fn from(record: UnitRecord) -> Self {
        SourceUnit::new(record.id, record.body)
            .with_declared_types(record.declared_types)
            .with_imports(record.imports.unwrap_or_default())
            .with_dependencies(record.dependencies.unwrap_or_default())
            .with_used_types(record.used_types.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape() {
        let unit = SourceUnit::new("I/D.cs", "class D {}")
            .with_declared_types(["Lib.I.D"])
            .with_dependencies(["Put.cs"]);

        let json = serde_json::to_value(UnitRecord::from(&unit)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "I/D.cs",
                "declaredTypes": ["Lib.I.D"],
                "dependencies": ["Put.cs"],
                "body": "class D {}"
            })
        );
    }

    #[test]
    fn test_nulls_and_unknown_fields() {
        let record: UnitRecord = serde_json::from_str(
            r#"{"id":"A.cs","declaredTypes":["Lib.A"],"imports":null,"dependencies":null,
                "body":"class A {}","futureField":42}"#,
        )
        .unwrap();

        let unit = SourceUnit::from(record);
        assert_eq!(unit.id(), "A.cs");
        assert!(unit.imports().is_empty());
        assert!(unit.dependencies().is_empty());
    }

    #[test]
    fn test_missing_body_is_rejected() {
        let result: Result<UnitRecord, _> = serde_json::from_str(r#"{"id":"A.cs"}"#);
        assert!(result.is_err());
    }
}
