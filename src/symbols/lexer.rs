//! A forgiving C#-style tokenizer.
//!
//! Only identifiers and punctuation survive. Comments, string and character
//! literals, numbers and preprocessor lines are dropped; identifiers inside
//! interpolation holes are kept because they reference real symbols.

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Punct(char),
}

impl Token {
    pub fn ident(&self) -> Option<&str> {
        match self {
            Token::Ident(s) => Some(s),
            Token::Punct(_) => None,
        }
    }

    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }
}

/// Tokenize source text.
pub fn tokenize(code: &str) -> Vec<Token> {
    let chars: Vec<char> = code.chars().collect();
    let mut lexer = Lexer {
        chars: &chars,
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

struct Lexer<'a> {
    chars: &'a [char],
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) {
        let mut line_start = true;

        while let Some(c) = self.peek(0) {
            if c == '\n' {
                line_start = true;
                self.pos += 1;
                continue;
            }
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            if c == '#' && line_start {
                self.skip_line();
                continue;
            }
            line_start = false;

            match (c, self.peek(1), self.peek(2)) {
                ('/', Some('/'), _) => self.skip_line(),
                ('/', Some('*'), _) => self.skip_block_comment(),
                ('"', _, _) => self.string(false, false),
                ('\'', _, _) => self.char_literal(),
                ('@', Some('"'), _) => {
                    self.pos += 1;
                    self.string(true, false);
                }
                ('@', Some('$'), Some('"')) | ('$', Some('@'), Some('"')) => {
                    self.pos += 2;
                    self.string(true, true);
                }
                ('$', Some('"'), _) => {
                    self.pos += 1;
                    self.string(false, true);
                }
                ('$', Some('$'), _) => {
                    // Raw interpolated strings ($$"""); holes are not scanned.
                    while self.peek(0) == Some('$') {
                        self.pos += 1;
                    }
                    if self.peek(0) == Some('"') {
                        self.string(false, false);
                    }
                }
                ('@', Some(n), _) if is_ident_start(n) => {
                    self.pos += 1;
                    self.ident();
                }
                _ if is_ident_start(c) => self.ident(),
                _ if c.is_ascii_digit() => self.number(),
                _ => {
                    self.tokens.push(Token::Punct(c));
                    self.pos += 1;
                }
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(c) = self.peek(0) {
            if c == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.tokens.push(Token::Ident(text));
    }

    fn number(&mut self) {
        while let Some(c) = self.peek(0) {
            let decimal_point = c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit());
            if is_ident_continue(c) || decimal_point {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn char_literal(&mut self) {
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                '\\' => self.pos += 1,
                '\'' | '\n' => return,
                _ => {}
            }
        }
    }

    /// Consume a string literal starting at the opening quote.
    fn string(&mut self, verbatim: bool, interpolated: bool) {
        let quotes = self.count_quotes();
        if !verbatim && quotes >= 3 {
            self.raw_string(quotes);
            return;
        }
        // An empty literal shows up as two quotes.
        if !verbatim && quotes == 2 {
            self.pos += 2;
            return;
        }
        self.pos += 1;

        while let Some(c) = self.peek(0) {
            match c {
                '\\' if !verbatim => self.pos += 2,
                '"' if verbatim && self.peek(1) == Some('"') => self.pos += 2,
                '"' => {
                    self.pos += 1;
                    return;
                }
                '\n' if !verbatim => return,
                '{' if interpolated && self.peek(1) == Some('{') => self.pos += 2,
                '{' if interpolated => self.hole(),
                _ => self.pos += 1,
            }
        }
    }

    fn count_quotes(&self) -> usize {
        let mut n = 0;
        while self.peek(n) == Some('"') {
            n += 1;
        }
        n
    }

    fn raw_string(&mut self, quotes: usize) {
        self.pos += quotes;
        while self.peek(0).is_some() {
            if self.count_quotes() >= quotes {
                self.pos += self.count_quotes();
                return;
            }
            self.pos += 1;
        }
    }

    /// Tokenize the contents of an interpolation hole.
    fn hole(&mut self) {
        self.pos += 1;
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek(0) {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        let inner: String = self.chars[start..self.pos].iter().collect();
        self.tokens.extend(tokenize(&inner));
        if self.peek(0) == Some('}') {
            self.pos += 1;
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idents(code: &str) -> Vec<String> {
        tokenize(code)
            .into_iter()
            .filter_map(|t| t.ident().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_skips_comments_and_literals() {
        let code = r#"
            // Foo in a comment
            /* Bar
               in a block */
            var s = "Baz \" Qux";
            var c = '\'';
            var v = @"Verbatim ""Quoted""";
            var n = 1.5f + 0x1F;
        "#;
        assert_eq!(idents(code), ["var", "s", "var", "c", "var", "v", "var", "n"]);
    }

    #[test]
    fn test_interpolation_holes_are_tokenized() {
        let code = r#"var s = $"{Put.Value:N2} and {{literal}} {D.Make()}";"#;
        assert_eq!(
            idents(code),
            ["var", "s", "Put", "Value", "N2", "D", "Make"]
        );
    }

    #[test]
    fn test_raw_strings() {
        let code = "var s = \"\"\"\n  Hidden \"quoted\"\n  \"\"\"; Visible x;";
        assert_eq!(idents(code), ["var", "s", "Visible", "x"]);
    }

    #[test]
    fn test_preprocessor_lines() {
        let code = "#region Hidden\nclass A {}\n#endregion";
        assert_eq!(idents(code), ["class", "A"]);
    }

    #[test]
    fn test_verbatim_identifiers() {
        assert_eq!(idents("var @class = 1;"), ["var", "class"]);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(idents(r#"var s = ""; After a;"#), ["var", "s", "After", "a"]);
    }
}
