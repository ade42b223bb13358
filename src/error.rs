use thiserror::Error;

/// Failure kinds of the query layer. Callers translate `NotFound` into a
/// not-found response and `UnsupportedFilter` into a user-facing message;
/// everything else is a backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("unsupported filter combination: {0}")]
    UnsupportedFilter(String),

    #[error("backend unavailable: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("search index unavailable: {0}")]
    Search(#[from] reqwest::Error),
}
