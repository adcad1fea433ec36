//! Body transforms.
//!
//! A transform is a pure `body -> body'` function applied to each unit
//! before it is serialized. Resolution never looks at bodies, so transforms
//! can be swapped or disabled freely.

use crate::util::config::EmbedConfig;

/// A pure rewrite of a unit body.
pub trait BodyTransform: Send + Sync {
    fn apply(&self, body: &str) -> String;
}

impl<F> BodyTransform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn apply(&self, body: &str) -> String {
        self(body)
    }
}

/// Leaves bodies untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl BodyTransform for Identity {
    fn apply(&self, body: &str) -> String {
        body.to_string()
    }
}

/// Best-effort whitespace and comment removal.
///
/// Drops `//` comments outside literals, leading indentation and blank
/// lines. Multi-line verbatim strings are not protected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minify;

impl BodyTransform for Minify {
    fn apply(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len());
        for line in body.lines() {
            let line = strip_line_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
        }
        out
    }
}

fn strip_line_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut in_char = false;
    let mut escaped = false;
    let mut prev = '\0';

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            prev = '\0';
            continue;
        }
        match c {
            '\\' if in_string || in_char => escaped = true,
            '"' if !in_char => in_string = !in_string,
            '\'' if !in_string => in_char = !in_char,
            '/' if !in_string && !in_char && prev == '/' => return &line[..i - 1],
            _ => {}
        }
        prev = c;
    }
    line
}

/// An ordered chain of transforms.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn BodyTransform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform.
    pub fn then(mut self, step: impl BodyTransform + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The transforms selected by configuration.
    pub fn from_config(config: &EmbedConfig) -> Self {
        let pipeline = Pipeline::new();
        if config.minify {
            pipeline.then(Minify)
        } else {
            pipeline.then(Identity)
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl BodyTransform for Pipeline {
    fn apply(&self, body: &str) -> String {
        let mut current = body.to_string();
        for step in &self.steps {
            current = step.apply(&current);
        }
        current
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.steps.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify() {
        let body = r#"
            namespace Lib
            {
                // helper
                public static class Put
                {
                    public static string Url = "http://example.com"; // trailing
                    public static char Slash = '/'; /// doc
                }
            }
        "#;
        let expected = "namespace Lib\n{\npublic static class Put\n{\n\
                        public static string Url = \"http://example.com\";\n\
                        public static char Slash = '/';\n}\n}";

        assert_eq!(Minify.apply(body), expected);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        assert_eq!(Minify.apply(r#"var s = "a\"//b"; // c"#), r#"var s = "a\"//b";"#);
    }

    #[test]
    fn test_pipeline_order() {
        let pipeline = Pipeline::new()
            .then(|s: &str| s.replace("A", "B"))
            .then(|s: &str| s.replace("B", "C"));

        assert_eq!(pipeline.apply("A"), "C");
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_pipeline_from_config() {
        let mut config = EmbedConfig::default();
        assert_eq!(Pipeline::from_config(&config).apply("  a\n\n  b"), "  a\n\n  b");

        config.minify = true;
        assert_eq!(Pipeline::from_config(&config).apply("  a\n\n  b"), "a\nb");
    }
}
