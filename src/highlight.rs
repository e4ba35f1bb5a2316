//! Lightweight lexical classifier used to colour snippets while typing.
//!
//! This is a display hint only. Scoring compares raw characters and never
//! looks at token kinds.

use strum_macros::Display;

/// Classification of a highlighted span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TokenKind {
    Keyword,
    Function,
    String,
    Number,
    Comment,
    Punctuation,
    Text,
}

/// A classified slice of the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub content: &'a str,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, content: &'a str) -> Self {
        Self { kind, content }
    }
}

const KEYWORDS: [&str; 24] = [
    "const", "let", "var", "function", "return", "if", "else", "for", "while", "async", "await",
    "try", "catch", "import", "export", "from", "class", "extends", "new", "this", "true",
    "false", "null", "undefined",
];

const PUNCTUATION: &str = "(){}[].,;=><!+-*/&|?:";

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`')
}

/// Length in bytes of the run at the start of `s` whose chars satisfy `pred`
fn run_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.find(|c: char| !pred(c)).unwrap_or(s.len())
}

/// Length of a string literal starting at `s`, including both quotes.
/// An unterminated literal runs to the end of input.
fn string_len(s: &str, quote: char) -> usize {
    let mut chars = s.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            // the escaped char belongs to the literal, whatever it is
            if chars.next().is_none() {
                break;
            }
        } else if c == quote {
            return idx + c.len_utf8();
        }
    }
    s.len()
}

/// Classify the token at the start of `rest` and return its kind and byte length
fn scan(rest: &str, first: char) -> (TokenKind, usize) {
    if rest.starts_with("//") {
        return (TokenKind::Comment, run_len(rest, |c| c != '\n'));
    }

    if is_quote(first) {
        return (TokenKind::String, string_len(rest, first));
    }

    if first.is_ascii_digit() {
        return (
            TokenKind::Number,
            run_len(rest, |c| c.is_ascii_digit() || c == '.'),
        );
    }

    if is_identifier_start(first) {
        let len = run_len(rest, is_identifier_char);
        let kind = if is_keyword(&rest[..len]) {
            TokenKind::Keyword
        } else if rest[len..].starts_with('(') {
            // rough heuristic for call sites and declarations
            TokenKind::Function
        } else {
            TokenKind::Text
        };
        return (kind, len);
    }

    if PUNCTUATION.contains(first) {
        return (TokenKind::Punctuation, first.len_utf8());
    }

    // whitespace and anything unrecognised: one char of plain text
    (TokenKind::Text, first.len_utf8())
}

/// Split `code` into classified tokens.
///
/// The tokens partition the input: concatenating every `content` gives back
/// `code` exactly.
pub fn tokenize(code: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = code;

    while let Some(first) = rest.chars().next() {
        let (kind, len) = scan(rest, first);
        let (content, tail) = rest.split_at(len);
        tokens.push(Token::new(kind, content));
        rest = tail;
    }

    tokens
}

/// Flatten the tokens of `code` into one `(char, kind)` cell per character
pub fn char_kinds(code: &str) -> Vec<(char, TokenKind)> {
    tokenize(code)
        .into_iter()
        .flat_map(|token| token.content.chars().map(move |c| (c, token.kind)))
        .collect()
}
