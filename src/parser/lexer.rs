//! Tokenizer for template source
//!
//! Splits a template into a flat stream of literal text, interpolations and
//! directive markers. Nesting is not tracked here; the tree parser pairs
//! openers with their closers.

use crate::error::Span;

/// Directives that never take arguments. They are recognised even when
/// text follows without a separator, so `@elseHidden` is `@else` + `Hidden`.
const BARE_KEYWORDS: &[&str] = &[
    "endcomponent",
    "endforeach",
    "endsection",
    "endslot",
    "endfor",
    "endif",
    "else",
];

/// Directive names that take arguments and are recognised anywhere
const BUILTIN_DIRECTIVES: &[&str] = &[
    "extends",
    "section",
    "yield",
    "if",
    "elseif",
    "foreach",
    "for",
    "include",
    "component",
    "slot",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal output, with `@@` and `@{{ }}` escapes already applied
    Text(String),
    /// `{{ expr }}` (escaped) or `{!! expr !!}` (raw)
    Echo { expr: String, raw: bool },
    /// `@name` or `@name(args)`
    Directive { name: String, args: Option<String> },
}

/// Tokenize template source into tokens with byte spans
pub fn tokenize(source: &str) -> Vec<(Token, Span)> {
    Scanner::new(source).run()
}

struct Scanner<'s> {
    source: &'s str,
    pos: usize,
    text: String,
    text_start: usize,
    tokens: Vec<(Token, Span)>,
}

impl<'s> Scanner<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            pos: 0,
            text: String::new(),
            text_start: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<(Token, Span)> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            let consumed = if rest.starts_with("{{--") {
                self.comment()
            } else if rest.starts_with("{!!") {
                self.echo("{!!", "!!}", true)
            } else if rest.starts_with("{{") {
                self.echo("{{", "}}", false)
            } else if rest.starts_with('@') {
                self.at_sign()
            } else {
                false
            };

            if !consumed {
                self.literal_char();
            }
        }
        self.flush_text(self.source.len());
        self.tokens
    }

    fn literal_char(&mut self) {
        if let Some(c) = self.source[self.pos..].chars().next() {
            self.push_literal(self.pos, &c.to_string(), c.len_utf8());
        }
    }

    fn push_literal(&mut self, start: usize, text: &str, width: usize) {
        if self.text.is_empty() {
            self.text_start = start;
        }
        self.text.push_str(text);
        self.pos = start + width;
    }

    fn flush_text(&mut self, end: usize) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.tokens.push((Token::Text(text), self.text_start..end));
        }
    }

    fn push(&mut self, token: Token, span: Span) {
        self.flush_text(span.start);
        self.pos = span.end;
        self.tokens.push((token, span));
    }

    /// `{{-- ... --}}` produces no output at all
    fn comment(&mut self) -> bool {
        let start = self.pos;
        match self.source[start + 4..].find("--}}") {
            Some(offset) => {
                self.flush_text(start);
                self.pos = start + 4 + offset + 4;
                true
            }
            None => false,
        }
    }

    fn echo(&mut self, open: &str, close: &str, raw: bool) -> bool {
        let start = self.pos;
        let inner_start = start + open.len();
        match self.source[inner_start..].find(close) {
            Some(offset) => {
                let inner_end = inner_start + offset;
                let expr = self.source[inner_start..inner_end].trim().to_string();
                self.push(Token::Echo { expr, raw }, start..inner_end + close.len());
                true
            }
            None => false,
        }
    }

    fn at_sign(&mut self) -> bool {
        let start = self.pos;
        let rest = &self.source[start..];

        // `@@` prints a single `@`
        if rest.starts_with("@@") {
            self.push_literal(start, "@", 2);
            return true;
        }

        // `@{{ x }}` and `@{!! x !!}` print the braces verbatim
        for (open, close) in [("{{", "}}"), ("{!!", "!!}")] {
            if rest[1..].starts_with(open) {
                if let Some(offset) = rest[1 + open.len()..].find(close) {
                    let width = 1 + open.len() + offset + close.len();
                    self.push_literal(start, &rest[1..width], width);
                    return true;
                }
            }
        }

        // Inside a word of literal text (`user@example.com`) only built-in
        // directives and block keywords are recognised
        let preceded_by_word = self
            .text
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');

        let name_len = rest[1..]
            .char_indices()
            .find(|(i, c)| {
                !(c.is_ascii_alphabetic() || *c == '_' || (*i > 0 && c.is_ascii_digit()))
            })
            .map(|(i, _)| i)
            .unwrap_or(rest.len() - 1);
        if name_len == 0 {
            return false;
        }
        let name = &rest[1..1 + name_len];
        let after = start + 1 + name_len;

        if self.source[after..].starts_with('(')
            && (!preceded_by_word || BUILTIN_DIRECTIVES.contains(&name))
        {
            if let Some(close) = matching_paren(self.source, after) {
                let args = self.source[after + 1..close].to_string();
                self.push(
                    Token::Directive {
                        name: name.to_string(),
                        args: Some(args),
                    },
                    start..close + 1,
                );
                return true;
            }
        }

        let keyword = BARE_KEYWORDS
            .iter()
            .find(|kw| name == **kw)
            .or_else(|| BARE_KEYWORDS.iter().find(|kw| name.starts_with(**kw)));
        match keyword {
            Some(kw) => {
                self.push(
                    Token::Directive {
                        name: kw.to_string(),
                        args: None,
                    },
                    start..start + 1 + kw.len(),
                );
                true
            }
            None => false,
        }
    }
}

/// Find the `)` closing the `(` at byte offset `open`, skipping quoted text
fn matching_paren(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in source[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
