use thiserror::Error;

/// Failures surfaced by the corpus layer.
///
/// Cloneable so a single in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorpusError {
    #[error("corpus index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("corpus book unavailable ({path}): {reason}")]
    BookUnavailable { path: String, reason: String },

    #[error("corpus book too short ({path}): {len} characters after normalization")]
    BookTooShort { path: String, len: usize },

    #[error("invalid corpus entry: {0}")]
    InvalidEntry(String),

    #[error("fetch failed for {path}{}: {reason}", status_suffix(.status))]
    Fetch {
        path: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("corpus preload failed: {0}")]
    Preload(String),
}

impl CorpusError {
    /// True for failures scoped to a single book rather than the whole corpus.
    pub fn is_book_failure(&self) -> bool {
        matches!(
            self,
            CorpusError::BookUnavailable { .. } | CorpusError::BookTooShort { .. }
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

pub type CorpusResult<T> = Result<T, CorpusError>;
