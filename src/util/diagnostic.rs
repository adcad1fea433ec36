//! User-friendly diagnostic messages.
//!
//! Every error reported to a user carries its root cause, the context that
//! led to it and, where one exists, a suggested fix.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a manifest cannot be decoded.
    pub const REBUILD_LIBRARY: &str = "Rebuild the library that produced this manifest";

    /// Suggestion when the consumer tool is older than the producer.
    pub const UPGRADE_TOOL: &str = "Upgrade splice to the version that produced the library";

    /// Suggestion when the consumer language level is too low.
    pub const RAISE_LANGUAGE: &str = "Raise the language level of the consuming project";

    /// Suggestion when a required unit is not embedded.
    pub const MISSING_UNIT: &str =
        "Check the producing library's path_filter_globs and exclude_declarations";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Where the problem came from (library, manifest, root file)
    pub origin: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            origin: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message)
    }

    /// Create a new informational diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, message)
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Attribute the diagnostic to a source.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref origin) = self.origin {
            output.push_str(&format!("  --> {}\n", origin));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("ambiguous type `Lib.Put`")
            .with_origin("libs/a.json")
            .with_context("declared in `Put.cs`")
            .with_suggestion("Rename one of the types");

        let output = diag.format(false);
        assert!(output.starts_with("error: ambiguous type `Lib.Put`"));
        assert!(output.contains("--> libs/a.json"));
        assert!(output.contains("= declared in `Put.cs`"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Rename one of the types"));
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Diagnostic::error("x").is_error());
        assert!(!Diagnostic::note("x").is_error());
    }
}
