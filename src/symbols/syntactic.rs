//! Syntactic symbol matching.
//!
//! Declarations are found by scanning for type keywords and tracking brace
//! scopes. References are found by matching every identifier chain against
//! the set of known fully-qualified types, qualified by each namespace in
//! scope (enclosing namespaces, `using` imports, the global namespace).
//! Anything that merely looks like a known type is reported, so results can
//! over-include but never miss a plainly written reference.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::lexer::{tokenize, Token};
use super::SymbolSource;
use crate::core::UnitStore;

const TYPE_KEYWORDS: &[&str] = &["class", "struct", "interface", "enum", "record"];

const CONTEXTUAL_KEYWORDS: &[&str] = &[
    "class",
    "struct",
    "where",
    "new",
    "unmanaged",
    "notnull",
    "default",
    "partial",
];

/// Textual identifier matching against a set of known types.
#[derive(Debug, Clone, Default)]
pub struct SyntacticSymbols {
    known: HashSet<String>,
}

impl SyntacticSymbols {
    /// Create a matcher for the given fully-qualified type identifiers.
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SyntacticSymbols {
            known: known.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a matcher for every type declared in a store.
    pub fn for_store(store: &UnitStore) -> Self {
        Self::new(store.declared_types())
    }

    fn match_chain(
        &self,
        chain: &[String],
        scopes: &[String],
        aliases: &HashMap<String, String>,
        found: &mut BTreeSet<String>,
    ) {
        let mut parts: Vec<String> = Vec::with_capacity(chain.len() + 2);
        match aliases.get(&chain[0]) {
            Some(target) => parts.extend(target.split('.').map(str::to_string)),
            None => parts.push(chain[0].clone()),
        }
        parts.extend(chain[1..].iter().cloned());

        for len in 1..=parts.len() {
            let name = parts[..len].join(".");
            for scope in scopes {
                let candidate = if scope.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", scope, name)
                };
                // `[Foo]` refers to `FooAttribute`.
                if len == parts.len() {
                    let attribute = format!("{}Attribute", candidate);
                    if self.known.contains(&attribute) {
                        found.insert(attribute);
                    }
                }
                if self.known.contains(&candidate) {
                    found.insert(candidate);
                }
            }
        }
    }
}

impl SymbolSource for SyntacticSymbols {
    fn referenced_types(&self, code: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        if self.known.is_empty() {
            return found;
        }

        let tokens = tokenize(code);
        let declarations = scan_declarations(&tokens);
        let imports = scan_imports(&tokens);

        let mut scopes = vec![String::new()];
        scopes.extend(declarations.namespaces);
        scopes.extend(imports.namespaces);
        scopes.dedup();

        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].ident().is_none() {
                i += 1;
                continue;
            }
            let (chain, next) = read_chain(&tokens, i);
            self.match_chain(&chain, &scopes, &imports.aliases, &mut found);
            i = next;
        }

        found
    }

    fn declared_types(&self, code: &str) -> BTreeSet<String> {
        scan_declarations(&tokenize(code)).types
    }
}

#[derive(Default)]
struct Declarations {
    types: BTreeSet<String>,
    /// Declared namespaces and all their parents
    namespaces: BTreeSet<String>,
}

enum Scope {
    Namespace(Vec<String>),
    Type(String),
    Block,
}

enum Pending {
    Namespace(Vec<String>),
    Type(String),
}

fn scan_declarations(tokens: &[Token]) -> Declarations {
    let mut out = Declarations::default();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Ident(word) if word == "namespace" => {
                let (parts, next) = read_chain(tokens, i + 1);
                if !parts.is_empty() {
                    for len in 1..=parts.len() {
                        out.namespaces.insert(parts[..len].join("."));
                    }
                    pending = Some(Pending::Namespace(parts));
                }
                i = next.max(i + 1);
                continue;
            }
            Token::Ident(word) if TYPE_KEYWORDS.contains(&word.as_str()) => {
                let mut j = i + 1;
                if word == "record"
                    && matches!(tokens.get(j).and_then(Token::ident), Some("struct" | "class"))
                {
                    j += 1;
                }
                let name = tokens
                    .get(j)
                    .and_then(Token::ident)
                    .filter(|n| !CONTEXTUAL_KEYWORDS.contains(n));
                if let Some(name) = name {
                    out.types.insert(qualify(&scopes, name));
                    pending = Some(Pending::Type(name.to_string()));
                    i = j + 1;
                    continue;
                }
            }
            Token::Ident(word) if word == "delegate" => {
                if let Some(name) = delegate_name(tokens, i + 1) {
                    out.types.insert(qualify(&scopes, name));
                }
            }
            Token::Punct('{') => {
                scopes.push(match pending.take() {
                    Some(Pending::Namespace(parts)) => Scope::Namespace(parts),
                    Some(Pending::Type(name)) => Scope::Type(name),
                    None => Scope::Block,
                });
            }
            Token::Punct('}') => {
                scopes.pop();
            }
            Token::Punct(';') => {
                // File-scoped namespace, or a type without a body.
                if let Some(Pending::Namespace(parts)) = pending.take() {
                    scopes.insert(0, Scope::Namespace(parts));
                }
            }
            _ => {}
        }
        i += 1;
    }

    out
}

fn qualify(scopes: &[Scope], name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for scope in scopes {
        match scope {
            Scope::Namespace(ns) => parts.extend(ns.iter().map(String::as_str)),
            Scope::Type(t) => parts.push(t),
            Scope::Block => {}
        }
    }
    parts.push(name);
    parts.join(".")
}

/// The declared name of `delegate <return type> Name<T>(...)`.
fn delegate_name(tokens: &[Token], start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut last = None;
    for token in &tokens[start.min(tokens.len())..] {
        match token {
            Token::Ident(name) if depth == 0 => last = Some(name.as_str()),
            Token::Punct('<') => depth += 1,
            Token::Punct('>') => depth = depth.saturating_sub(1),
            Token::Punct('(') if depth == 0 => return last,
            Token::Punct('{' | ';' | '=' | ')') => return None,
            _ => {}
        }
    }
    None
}

/// Read `Ident ('.' Ident)*` starting at `start`.
fn read_chain(tokens: &[Token], start: usize) -> (Vec<String>, usize) {
    let mut parts = Vec::new();
    let mut i = start;
    while let Some(name) = tokens.get(i).and_then(Token::ident) {
        parts.push(name.to_string());
        i += 1;
        let dotted = tokens.get(i).is_some_and(|t| t.is_punct('.'));
        let followed = tokens.get(i + 1).and_then(Token::ident).is_some();
        if dotted && followed {
            i += 1;
        } else {
            break;
        }
    }
    (parts, i)
}

#[derive(Default)]
struct Imports {
    namespaces: Vec<String>,
    aliases: HashMap<String, String>,
}

/// Collect `using` directives: namespaces, `using static` types, aliases.
fn scan_imports(tokens: &[Token]) -> Imports {
    let mut out = Imports::default();

    for (i, token) in tokens.iter().enumerate() {
        if token.ident() != Some("using") {
            continue;
        }
        let mut j = i + 1;
        if tokens.get(j).and_then(Token::ident) == Some("static") {
            j += 1;
        }

        let alias_target = tokens.get(j + 1).is_some_and(|t| t.is_punct('='));
        if alias_target {
            let Some(alias) = tokens.get(j).and_then(Token::ident) else {
                continue;
            };
            let (target, end) = read_chain(tokens, j + 2);
            if !target.is_empty() && tokens.get(end).is_some_and(|t| t.is_punct(';')) {
                out.aliases.insert(alias.to_string(), target.join("."));
            }
            continue;
        }

        let (chain, end) = read_chain(tokens, j);
        if !chain.is_empty() && tokens.get(end).is_some_and(|t| t.is_punct(';')) {
            out.namespaces.push(chain.join("."));
        }
    }

    out
}
