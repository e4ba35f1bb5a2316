use thiserror::Error;

/// Everything that can go wrong while preparing or running a typing session.
///
/// None of these are fatal during normal use: the host falls back to an
/// unfiltered catalog, default settings, or another snippet.
#[derive(Debug, Error)]
pub enum Error {
    #[error("the snippet catalog is empty")]
    EmptyCatalog,

    #[error("snippet `{snippet_id}` produced no typeable content with the current settings")]
    EmptyContent { snippet_id: String },

    #[error("a typing session needs a non-empty target text")]
    EmptyTarget,

    #[error("embedded snippet data `{0}` is missing")]
    MissingSnippetData(String),

    #[error("unable to parse snippet data: {0}")]
    SnippetData(#[source] serde_json::Error),

    #[error("unable to read settings: {0}")]
    Settings(#[source] serde_json::Error),

    #[error("`{value}` is not a valid {name}")]
    InvalidOption { name: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
