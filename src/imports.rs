//! Import merging and sorting.
//!
//! Import lines are opaque strings. Two lines are the same import when they
//! match after trimming whitespace and one trailing `;`. The merged block is
//! sorted ordinally on that normalized form, so it is identical no matter
//! which order the contributing units arrive in.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// `using A.B;` or `global using A.B;`, but not `using static` or aliases.
static NAMESPACE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:global\s+)?using\s+(@?[A-Za-z_]\w*(?:\s*\.\s*@?[A-Za-z_]\w*)*)\s*;?\s*$")
        .expect("namespace import pattern is valid")
});

/// Normalized comparison key for an import line.
pub fn normalize(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}

/// Merge root imports with the imports of every resolved unit.
///
/// Duplicates collapse onto their ordinally smallest spelling, so the result
/// depends only on the set of lines.
pub fn merge<'a, I, U>(root_imports: &'a [String], unit_imports: I) -> Vec<String>
where
    I: IntoIterator<Item = U>,
    U: IntoIterator<Item = &'a String>,
{
    let mut merged: BTreeMap<&str, &str> = BTreeMap::new();

    let all = root_imports
        .iter()
        .chain(unit_imports.into_iter().flatten());
    for line in all {
        let key = normalize(line);
        if key.is_empty() {
            continue;
        }
        merged
            .entry(key)
            .and_modify(|kept| *kept = (*kept).min(line.as_str()))
            .or_insert(line.as_str());
    }

    merged.into_values().map(str::to_string).collect()
}

/// Extract the namespace named by a plain namespace import.
///
/// Returns `None` for static imports, aliases and anything malformed.
pub fn namespace_of(line: &str) -> Option<String> {
    let caps = NAMESPACE_IMPORT.captures(line)?;
    let ns: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
    if ns == "static" {
        return None;
    }
    Some(ns)
}

/// Split leading import lines off a source file.
///
/// The header is every line up to the first one that is not blank, a `//`
/// comment or an import. Returns the imports and the remaining body.
pub fn split_header(code: &str) -> (Vec<String>, &str) {
    let mut imports = Vec::new();
    let mut offset = 0;

    for line in code.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            offset += line.len();
            continue;
        }
        if is_import_line(trimmed) {
            imports.push(trimmed.to_string());
            offset += line.len();
            continue;
        }
        break;
    }

    (imports, &code[offset..])
}

fn is_import_line(trimmed: &str) -> bool {
    let rest = trimmed.strip_prefix("global ").unwrap_or(trimmed).trim_start();
    let Some(rest) = rest.strip_prefix("using") else {
        return false;
    };
    rest.starts_with(char::is_whitespace)
        && trimmed.ends_with(';')
        && !rest.trim_start().starts_with("var ")
        && !rest.trim_start().starts_with('(')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_dedups_and_sorts() {
        let root = lines(&["using System;", "using Lib.I;"]);
        let a = lines(&["using System.Linq;", "using System"]);
        let b = lines(&["using Lib;", "using System;"]);

        let merged = merge(&root, [&a, &b]);
        assert_eq!(
            merged,
            ["using Lib;", "using Lib.I;", "using System", "using System.Linq;"]
        );
    }

    #[test]
    fn test_merge_order_independent() {
        let a = lines(&["using B;", "using A;"]);
        let b = lines(&["using C;", "using A"]);

        let one = merge(&[], [&a, &b]);
        let two = merge(&[], [&b, &a]);
        assert_eq!(normalize(&one[0]), normalize(&two[0]));
        assert_eq!(one.len(), 3);
        assert_eq!(
            one.iter().map(|l| normalize(l)).collect::<Vec<_>>(),
            two.iter().map(|l| normalize(l)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_merge_spelling_ignores_source() {
        let bare = lines(&["using A"]);
        let terminated = lines(&["using A;"]);

        let root_first = merge(&bare, [&terminated]);
        let unit_first = merge(&terminated, [&bare]);

        assert_eq!(root_first, unit_first);
        assert_eq!(root_first, ["using A"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let sorted = lines(&["using A;", "using A.B;", "using static A.C;"]);
        let merged = merge(&sorted, [&sorted]);
        assert_eq!(merged, sorted);
    }

    #[test]
    fn test_merge_is_ordinal() {
        let a = lines(&["using a;", "using B;", "using _c;"]);
        assert_eq!(merge(&a, Vec::<&Vec<String>>::new()), ["using B;", "using _c;", "using a;"]);
    }

    #[test]
    fn test_namespace_of() {
        assert_eq!(namespace_of("using Lib.I;").as_deref(), Some("Lib.I"));
        assert_eq!(namespace_of("global using System ;").as_deref(), Some("System"));
        assert_eq!(namespace_of("using static Lib.Put;"), None);
        assert_eq!(namespace_of("using P = Lib.Put;"), None);
        assert_eq!(namespace_of("#include <stdio.h>"), None);
        assert_eq!(namespace_of("using ;"), None);
    }

    #[test]
    fn test_split_header() {
        let code = "// header\nusing System;\n\nusing Lib;\nnamespace App { }\nusing Late;\n";
        let (imports, body) = split_header(code);

        assert_eq!(imports, ["using System;", "using Lib;"]);
        assert_eq!(body, "namespace App { }\nusing Late;\n");
    }

    #[test]
    fn test_split_header_without_imports() {
        let (imports, body) = split_header("class A { }");
        assert!(imports.is_empty());
        assert_eq!(body, "class A { }");
    }
}
