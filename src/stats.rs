use itertools::Itertools;
use std::collections::HashMap;
use std::time::Duration;

/// Characters per "word" when converting typed characters to WPM
pub const AVERAGE_WORD_LENGTH: f64 = 5.0;

/// How many characters the results board ranks
pub const TOP_MISSED_LIMIT: usize = 5;

/// Final numbers for one finished session. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
    pub elapsed: Duration,
    pub errors: usize,
    /// expected character → how often it was mistyped, unsorted
    pub missed_chars: HashMap<char, usize>,
}

impl Stats {
    /// Most missed characters, highest count first
    pub fn top_missed(&self, limit: usize) -> Vec<(char, usize)> {
        top_missed(&self.missed_chars, limit)
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            wpm: self.wpm.to_string(),
            raw_wpm: format!("raw {}", self.raw_wpm),
            accuracy: format_accuracy(self.accuracy),
            time: format_time(self.elapsed),
            errors: self.errors.to_string(),
            top_missed: self
                .top_missed(TOP_MISSED_LIMIT)
                .into_iter()
                .map(|(c, count)| (display_char(c), count))
                .collect(),
        }
    }
}

/// Display-ready strings for the results board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub wpm: String,
    pub raw_wpm: String,
    pub accuracy: String,
    pub time: String,
    pub errors: String,
    pub top_missed: Vec<(String, usize)>,
}

/// `chars / 5` words over `minutes`, rounded.
/// Zero, negative or non-finite results (no time elapsed) give 0.
pub fn words_per_minute(chars: usize, minutes: f64) -> u32 {
    let wpm = (chars as f64 / AVERAGE_WORD_LENGTH) / minutes;
    if wpm.is_finite() && wpm > 0.0 {
        wpm.round() as u32
    } else {
        0
    }
}

/// Share of typed characters not counted as mistakes, in whole percent.
///
/// Mistakes survive backspacing, so they can outnumber the typed characters;
/// the result is floored at 0. Nothing typed yet reads as 100.
pub fn accuracy(typed: usize, mistakes: usize) -> u32 {
    if typed == 0 {
        return 100;
    }
    let pct = ((typed as f64 - mistakes as f64) / typed as f64) * 100.0;
    pct.round().max(0.0) as u32
}

/// Sort `missed` by count, descending, and keep the first `limit`.
/// Ties are broken by character so the order is stable between renders.
pub fn top_missed(missed: &HashMap<char, usize>, limit: usize) -> Vec<(char, usize)> {
    missed
        .iter()
        .map(|(&c, &count)| (c, count))
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(limit)
        .collect()
}

pub fn format_time(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

pub fn format_accuracy(accuracy: u32) -> String {
    format!("{accuracy}%")
}

/// Make whitespace visible when listing characters
pub fn display_char(c: char) -> String {
    match c {
        ' ' => "␣".to_string(),
        '\n' => "↵".to_string(),
        '\t' => "⇥".to_string(),
        c => c.to_string(),
    }
}
