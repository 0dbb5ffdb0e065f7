use rand::seq::SliceRandom;
use tracing::info;

use super::index::CorpusIndexEntry;
use super::library::CorpusLibrary;
use super::stream::CorpusSessionStream;
use crate::error::{CorpusError, CorpusResult};

/// Initial buffer size handed to a fresh session.
pub const DEFAULT_INITIAL_CHARS: usize = 24_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub initial_chars: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_chars: DEFAULT_INITIAL_CHARS,
        }
    }
}

impl SessionOptions {
    pub fn with_initial_chars(initial_chars: usize) -> Self {
        Self { initial_chars }
    }
}

/// A ready-to-type corpus session: the chosen book, its stream, and the first
/// buffer already drawn from that stream.
#[derive(Debug)]
pub struct CorpusSession {
    pub entry: CorpusIndexEntry,
    pub stream: CorpusSessionStream,
    pub initial_text: String,
}

/// Loads the index, picks a random book, loads its text and draws the
/// initial buffer.
///
/// A book that fails to load is reported as-is; no other entry is tried.
pub async fn create_corpus_session(
    library: &CorpusLibrary,
    options: &SessionOptions,
) -> CorpusResult<CorpusSession> {
    let index = library.load_corpus_index().await?;
    let entry = index
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| CorpusError::IndexUnavailable("index is empty".into()))?;

    let text = library.load_book_text(&entry).await?;
    let mut stream = CorpusSessionStream::new(entry.clone(), text);
    let initial_text = stream.create_initial_buffer(options.initial_chars);

    info!(
        "corpus session ready: '{}' from offset {}, {} chars buffered",
        entry.display_name(),
        stream.cursor(),
        initial_text.chars().count()
    );

    Ok(CorpusSession {
        entry,
        stream,
        initial_text,
    })
}
