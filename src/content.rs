use rand::Rng;
use tracing::debug;

use crate::{
    catalog::Snippet,
    error::{Error, Result},
    settings::{Mode, Settings},
};

/// Chance that an eligible identifier gets a trailing digit when numbers are on
pub const DIGIT_INJECTION_PROBABILITY: f64 = 0.3;

/// Identifiers shorter than this never get a digit
const MIN_INJECTABLE_LEN: usize = 3;

/// Words left untouched by digit injection so the text still reads like code
const RESERVED_WORDS: [&str; 42] = [
    "const", "let", "var", "function", "return", "if", "else", "for", "while", "do", "switch",
    "case", "break", "continue", "default", "try", "catch", "finally", "throw", "class",
    "extends", "super", "this", "new", "import", "export", "from", "as", "async", "await", "void",
    "typeof", "instanceof", "delete", "in", "of", "true", "false", "null", "undefined", "console",
    "log",
];

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Builds the text a session is typed against from a snippet and the settings
#[derive(Debug, Clone, Copy)]
pub struct ContentGenerator {
    settings: Settings,
}

impl ContentGenerator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Generate the target text, drawing injected digits from the thread rng
    pub fn generate(&self, snippet: &Snippet) -> Result<String> {
        self.generate_with(snippet, &mut rand::thread_rng())
    }

    /// Generate the target text with an explicit random source.
    ///
    /// Fails with [`Error::EmptyContent`] when nothing typeable is left, so a
    /// session is never started against an empty string.
    pub fn generate_with<R: Rng + ?Sized>(&self, snippet: &Snippet, rng: &mut R) -> Result<String> {
        // Step 1: repeat the snippet up to the word target in count mode
        let mut content = match self.settings.mode {
            Mode::Count => expand_to_count(&snippet.code, self.settings.count_amount.words()),
            Mode::Time | Mode::Zen => snippet.code.clone(),
        };

        // Step 2: numbers, before punctuation so stripping has the last word
        content = if self.settings.allow_numbers {
            inject_digits(&content, rng)
        } else {
            strip_digits(&content)
        };

        // Step 3: punctuation
        if !self.settings.allow_punctuation {
            content = strip_punctuation(&content);
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyContent {
                snippet_id: snippet.id.clone(),
            });
        }

        debug!(
            snippet = %snippet.id,
            mode = %self.settings.mode,
            chars = content.chars().count(),
            "generated target text"
        );
        Ok(content.to_string())
    }
}

/// Repeat whole copies of `code`, separated by a blank line, until the text
/// has at least `target_words` whitespace-delimited words.
///
/// Never slices mid-copy: overshooting the target is fine, truncating is not.
pub fn expand_to_count(code: &str, target_words: usize) -> String {
    let words_per_copy = code.split_whitespace().count();
    if words_per_copy == 0 {
        return code.to_string();
    }

    let mut expanded = code.to_string();
    let mut words = words_per_copy;
    while words < target_words {
        expanded.push_str("\n\n");
        expanded.push_str(code);
        words += words_per_copy;
    }
    expanded
}

pub fn strip_digits(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_digit()).collect()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_injectable(word: &str) -> bool {
    word.len() >= MIN_INJECTABLE_LEN
        && !word.starts_with(|c: char| c.is_ascii_digit())
        && !is_reserved(word)
}

/// Append a random digit to identifier-shaped words, each independently with
/// [`DIGIT_INJECTION_PROBABILITY`].
///
/// A word is a maximal run of `[A-Za-z0-9_]` that does not start with a
/// digit. Reserved words and words shorter than three chars are skipped and
/// consume no randomness.
pub fn inject_digits<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut rest = text;

    while let Some(first) = rest.chars().next() {
        let len = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
        if len == 0 {
            out.push(first);
            rest = &rest[first.len_utf8()..];
            continue;
        }

        let (word, tail) = rest.split_at(len);
        out.push_str(word);
        if is_injectable(word) && rng.gen_bool(DIGIT_INJECTION_PROBABILITY) {
            out.push(char::from(b'0' + rng.gen_range(0..10u8)));
        }
        rest = tail;
    }

    out
}

/// Drop everything except ASCII letters, digits and whitespace, then squeeze
/// the runs of spaces that leaves behind.
pub fn strip_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
    {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out
}
