use tracing::{debug, info, warn};

use crate::corpus::{
    CorpusIndexEntry, CorpusSessionStream, RequestGeneration, SessionOptions, SessionPreloader,
};
use crate::error::CorpusError;
use crate::language::FillerStream;

/// Something that can keep extending the text ahead of the typist.
pub trait TextSource {
    /// Returns `current` extended to at least `min_chars` characters.
    fn ensure_length(&mut self, current: String, min_chars: usize) -> String;
}

impl TextSource for CorpusSessionStream {
    fn ensure_length(&mut self, current: String, min_chars: usize) -> String {
        CorpusSessionStream::ensure_length(self, current, min_chars)
    }
}

/// Where the practice text of a session comes from.
#[derive(Debug)]
pub enum PracticeSource {
    Corpus {
        entry: CorpusIndexEntry,
        stream: CorpusSessionStream,
    },
    Filler(FillerStream),
}

impl PracticeSource {
    pub fn is_corpus(&self) -> bool {
        matches!(self, PracticeSource::Corpus { .. })
    }

    /// Book title for corpus sessions.
    pub fn title(&self) -> Option<&str> {
        match self {
            PracticeSource::Corpus { entry, .. } => Some(entry.display_name()),
            PracticeSource::Filler(_) => None,
        }
    }
}

impl TextSource for PracticeSource {
    fn ensure_length(&mut self, current: String, min_chars: usize) -> String {
        match self {
            PracticeSource::Corpus { stream, .. } => {
                TextSource::ensure_length(stream, current, min_chars)
            }
            PracticeSource::Filler(filler) => filler.ensure_length(current, min_chars),
        }
    }
}

/// A started session: its source, the initial text, and why the corpus was
/// skipped if it was.
#[derive(Debug)]
pub struct PracticeStart {
    pub source: PracticeSource,
    pub text: String,
    pub fallback_reason: Option<CorpusError>,
}

/// Starts practice sessions from the corpus, falling back to filler words.
#[derive(Clone)]
pub struct PracticeStarter {
    preloader: SessionPreloader,
    generation: RequestGeneration,
}

impl PracticeStarter {
    pub fn new(preloader: SessionPreloader) -> Self {
        Self {
            preloader,
            generation: RequestGeneration::new(),
        }
    }

    pub fn preloader(&self) -> &SessionPreloader {
        &self.preloader
    }

    /// Warms the next session without waiting for it. Must be called from
    /// within a tokio runtime.
    pub fn warm(&self, options: SessionOptions) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, not warming");
            return;
        };
        let preloader = self.preloader.clone();
        runtime.spawn(async move {
            if let Err(e) = preloader.preload(&options).await {
                warn!("corpus preload failed: {e}");
            }
        });
    }

    /// Starts a session. Returns `None` when a newer start was requested
    /// while this one was loading.
    pub async fn start(&self, options: &SessionOptions) -> Option<PracticeStart> {
        let ticket = self.generation.next();
        let result = self.preloader.consume(options).await;

        if !ticket.is_current() {
            debug!("dropping stale session start #{}", ticket.id());
            return None;
        }

        let start = match result {
            Ok(session) => {
                info!("practicing '{}'", session.entry.display_name());
                PracticeStart {
                    source: PracticeSource::Corpus {
                        entry: session.entry,
                        stream: session.stream,
                    },
                    text: session.initial_text,
                    fallback_reason: None,
                }
            }
            Err(e) => {
                warn!("corpus unavailable, using filler words: {e}");
                Self::filler_start(FillerStream::new(), options, e)
            }
        };
        Some(start)
    }

    fn filler_start(
        mut filler: FillerStream,
        options: &SessionOptions,
        reason: CorpusError,
    ) -> PracticeStart {
        let text = filler.ensure_length(String::new(), options.initial_chars);
        PracticeStart {
            source: PracticeSource::Filler(filler),
            text,
            fallback_reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusLibrary, MemoryCorpusSource, INDEX_PATH};
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use std::time::Duration;

    fn starter(source: MemoryCorpusSource) -> PracticeStarter {
        let library = Arc::new(CorpusLibrary::new(Arc::new(source)));
        PracticeStarter::new(SessionPreloader::new(library))
    }

    #[tokio::test]
    async fn test_corpus_session_when_available() {
        let starter = starter(
            MemoryCorpusSource::new()
                .with_resource(INDEX_PATH, r#"[{"id": "one", "path": "/corpus/books/one.txt"}]"#)
                .with_resource("/corpus/books/one.txt", "it was a dark and stormy night ".repeat(50)),
        );

        let start = starter
            .start(&SessionOptions::with_initial_chars(3_000))
            .await
            .unwrap();
        assert!(start.source.is_corpus());
        assert_eq!(start.source.title(), Some("one"));
        assert!(start.fallback_reason.is_none());
        assert!(start.text.chars().count() >= 3_000);
    }

    #[tokio::test]
    async fn test_falls_back_to_filler_when_the_index_is_missing() {
        let starter = starter(MemoryCorpusSource::new());

        let start = starter
            .start(&SessionOptions::with_initial_chars(500))
            .await
            .unwrap();
        assert_matches!(start.source, PracticeSource::Filler(_));
        assert_matches!(start.fallback_reason, Some(CorpusError::IndexUnavailable(_)));
        assert!(start.text.chars().count() >= 500);
    }

    #[tokio::test]
    async fn test_falls_back_when_the_book_is_too_short() {
        let starter = starter(
            MemoryCorpusSource::new()
                .with_resource(INDEX_PATH, r#"[{"id": "tiny", "path": "/corpus/books/tiny.txt"}]"#)
                .with_resource("/corpus/books/tiny.txt", "too short"),
        );

        let start = starter.start(&SessionOptions::default()).await.unwrap();
        assert!(!start.source.is_corpus());
        assert_matches!(start.fallback_reason, Some(CorpusError::BookTooShort { .. }));
    }

    #[tokio::test]
    async fn test_superseded_start_is_dropped() {
        let starter = starter(
            MemoryCorpusSource::new()
                .with_latency(Duration::from_millis(20))
                .with_resource(INDEX_PATH, r#"[{"id": "one", "path": "/corpus/books/one.txt"}]"#)
                .with_resource("/corpus/books/one.txt", "it was a dark and stormy night ".repeat(50)),
        );
        let options = SessionOptions::with_initial_chars(1_000);

        let (first, second) = tokio::join!(starter.start(&options), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            starter.start(&options).await
        });
        assert!(first.is_none());
        assert!(second.is_some());
    }

    #[test]
    fn test_filler_source_extends_text() {
        let mut source = PracticeSource::Filler(FillerStream::with_seed(9));
        let text = source.ensure_length(String::new(), 100);
        assert!(text.chars().count() >= 100);
        assert_eq!(source.title(), None);
    }
}
