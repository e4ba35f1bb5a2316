use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

static SNIPPET_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/snippets");

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self)
    }
}

/// Topic of a snippet. `Random` is a filter value meaning "any topic".
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    #[default]
    Random,
    Arrays,
    Functions,
    Async,
    Objects,
    Dom,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Random,
        Category::Arrays,
        Category::Functions,
        Category::Async,
        Category::Objects,
        Category::Dom,
    ];

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self)
    }
}

pub(crate) fn cycle<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + 1) % all.len()]
}

/// A code sample to type. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub code: String,
    pub language: String,
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: Option<String>,
}

const CUSTOM_ID: &str = "custom";

impl Snippet {
    /// Wrap arbitrary text (e.g. from `--prompt`) as a snippet
    pub fn custom(code: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: CUSTOM_ID.to_string(),
            code: code.into(),
            language: "text".to_string(),
            category: Category::Random,
            difficulty,
            description: Some("Custom prompt".to_string()),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_ID
    }

    pub fn word_count(&self) -> usize {
        self.code.split_whitespace().count()
    }
}

#[derive(Deserialize)]
struct SnippetFile {
    #[allow(dead_code)]
    name: String,
    snippets: Vec<Snippet>,
}

/// Read-only, ordered collection of snippets
#[derive(Debug, Clone)]
pub struct Catalog {
    snippets: Vec<Snippet>,
}

impl Catalog {
    pub fn new(snippets: Vec<Snippet>) -> Result<Self> {
        if snippets.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self { snippets })
    }

    /// Load the snippet files embedded at compile time
    pub fn builtin() -> Result<Self> {
        let mut files: Vec<_> = SNIPPET_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        let mut snippets = Vec::new();
        for file in files {
            let contents = file
                .contents_utf8()
                .ok_or_else(|| Error::MissingSnippetData(file.path().display().to_string()))?;
            snippets.extend(read_snippet_file(contents)?);
        }

        Self::new(snippets)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(read_snippet_file(json)?)
    }

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.id == id)
    }

    /// Snippets matching `category` (unless `Random`) and `difficulty`.
    ///
    /// Never returns an empty list: when nothing matches, the category is
    /// dropped, and when that still yields nothing the whole catalog is used.
    pub fn filter(&self, category: Category, difficulty: Difficulty) -> Vec<&Snippet> {
        let exact: Vec<&Snippet> = self
            .snippets
            .iter()
            .filter(|s| category == Category::Random || s.category == category)
            .filter(|s| s.difficulty == difficulty)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let by_difficulty: Vec<&Snippet> = self
            .snippets
            .iter()
            .filter(|s| s.difficulty == difficulty)
            .collect();
        if !by_difficulty.is_empty() {
            debug!(%category, %difficulty, "no snippet in category, falling back to difficulty only");
            return by_difficulty;
        }

        debug!(%category, %difficulty, "no snippet for difficulty, falling back to full catalog");
        self.snippets.iter().collect()
    }
}

fn read_snippet_file(json: &str) -> Result<Vec<Snippet>> {
    let file: SnippetFile = serde_json::from_str(json).map_err(Error::SnippetData)?;
    Ok(file.snippets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(id: &str, category: Category, difficulty: Difficulty) -> Snippet {
        Snippet {
            id: id.to_string(),
            code: format!("const {id} = 1;"),
            language: "javascript".to_string(),
            category,
            difficulty,
            description: None,
        }
    }

    fn test_catalog() -> Catalog {
        Catalog::new(vec![
            snippet("a", Category::Arrays, Difficulty::Easy),
            snippet("b", Category::Async, Difficulty::Easy),
            snippet("c", Category::Arrays, Difficulty::Hard),
        ])
        .unwrap()
    }

    fn ids(list: Vec<&Snippet>) -> Vec<&str> {
        list.into_iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();

        assert_eq!(catalog.len(), 15);
        for difficulty in Difficulty::ALL {
            assert!(!catalog.filter(Category::Random, difficulty).is_empty());
        }
        let first = catalog.get("easy-1").unwrap();
        assert_eq!(first.language, "javascript");
        assert_eq!(first.description.as_deref(), Some("Basic Map"));
    }

    #[test]
    fn test_empty_catalog_is_an_error() {
        assert!(matches!(Catalog::new(vec![]), Err(Error::EmptyCatalog)));
        assert!(matches!(
            Catalog::from_json(r#"{"name": "none", "snippets": []}"#),
            Err(Error::EmptyCatalog)
        ));
    }

    #[test]
    fn test_bad_json_is_reported() {
        assert!(matches!(
            Catalog::from_json("{ nope"),
            Err(Error::SnippetData(_))
        ));
    }

    #[test]
    fn test_filter_by_category_and_difficulty() {
        let catalog = test_catalog();
        assert_eq!(ids(catalog.filter(Category::Arrays, Difficulty::Easy)), vec!["a"]);
        assert_eq!(ids(catalog.filter(Category::Random, Difficulty::Easy)), vec!["a", "b"]);
    }

    #[test]
    fn test_filter_falls_back_to_difficulty() {
        let catalog = test_catalog();
        assert_eq!(ids(catalog.filter(Category::Dom, Difficulty::Easy)), vec!["a", "b"]);
    }

    #[test]
    fn test_filter_falls_back_to_everything() {
        let catalog = test_catalog();
        assert_eq!(
            ids(catalog.filter(Category::Dom, Difficulty::Medium)),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_cycling_wraps() {
        assert_eq!(Difficulty::Hard.next(), Difficulty::Easy);
        assert_eq!(Category::Random.next(), Category::Arrays);
        assert_eq!(Category::Dom.next(), Category::Random);
    }

    #[test]
    fn test_custom_snippet() {
        let s = Snippet::custom("fn main() {}", Difficulty::Medium);
        assert_eq!(s.id, "custom");
        assert_eq!(s.word_count(), 3);
    }
}
