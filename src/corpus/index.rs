use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CorpusError, CorpusResult};

/// Resource path of the corpus manifest.
pub const INDEX_PATH: &str = "/corpus/index.json";

const BOOK_PATH_PREFIX: &str = "/corpus/books/";
const BOOK_PATH_SUFFIX: &str = ".txt";

/// One book available for practice. Uniquely keyed by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorpusIndexEntry {
    #[serde(alias = "slug")]
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl CorpusIndexEntry {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            title: None,
            author: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title when present, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    pub fn validate(&self) -> CorpusResult<()> {
        if is_valid_book_path(&self.path) {
            Ok(())
        } else {
            Err(CorpusError::InvalidEntry(format!(
                "'{}' has malformed path '{}'",
                self.id, self.path
            )))
        }
    }
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

/// Accepts `/corpus/books/<slug>.txt` where the slug is lowercase ASCII
/// alphanumerics and hyphens.
pub fn is_valid_book_path(path: &str) -> bool {
    path.strip_prefix(BOOK_PATH_PREFIX)
        .and_then(|rest| rest.strip_suffix(BOOK_PATH_SUFFIX))
        .is_some_and(|slug| !slug.is_empty() && slug.chars().all(is_slug_char))
}

/// Parses the manifest, keeping only well-formed entries.
///
/// Malformed entries are dropped rather than failing the whole index; a
/// document that is not an array, or that has nothing usable left after
/// filtering, is an [`CorpusError::IndexUnavailable`].
pub fn parse_corpus_index(json: &str) -> CorpusResult<Vec<CorpusIndexEntry>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| CorpusError::IndexUnavailable(format!("malformed index: {e}")))?;

    if raw.is_empty() {
        return Err(CorpusError::IndexUnavailable("index is empty".into()));
    }

    let mut seen = HashSet::new();
    let entries: Vec<CorpusIndexEntry> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<CorpusIndexEntry>(value) {
            Ok(entry) => match entry.validate() {
                Ok(()) => Some(entry),
                Err(e) => {
                    debug!("dropping corpus entry: {e}");
                    None
                }
            },
            Err(e) => {
                debug!("dropping undecodable corpus entry: {e}");
                None
            }
        })
        .filter(|entry| seen.insert(entry.path.clone()))
        .collect();

    if entries.is_empty() {
        return Err(CorpusError::IndexUnavailable(
            "index has no valid entries".into(),
        ));
    }

    Ok(entries)
}
