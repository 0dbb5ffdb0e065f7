use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use super::index::{parse_corpus_index, CorpusIndexEntry, INDEX_PATH};
use super::normalize::normalize_book_text;
use super::source::CorpusSource;
use super::stream::BookText;
use crate::error::{CorpusError, CorpusResult};

type SharedFetch<T> = Shared<BoxFuture<'static, CorpusResult<T>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Corpus index memo and book text cache in front of a [`CorpusSource`].
///
/// Concurrent requests for the same resource share one underlying fetch.
/// Successful results are kept for the lifetime of the library; failures are
/// evicted so the next call retries.
pub struct CorpusLibrary {
    source: Arc<dyn CorpusSource>,
    index: Mutex<Option<SharedFetch<Arc<[CorpusIndexEntry]>>>>,
    books: Mutex<HashMap<String, SharedFetch<BookText>>>,
}

impl CorpusLibrary {
    pub fn new(source: Arc<dyn CorpusSource>) -> Self {
        Self {
            source,
            index: Mutex::new(None),
            books: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load_corpus_index(&self) -> CorpusResult<Arc<[CorpusIndexEntry]>> {
        let pending = {
            let mut slot = lock(&self.index);
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.fetch_index().boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        if let Err(e) = &result {
            let mut slot = lock(&self.index);
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
                *slot = None;
            }
            warn!("corpus index load failed: {e}");
        }
        result
    }

    fn fetch_index(&self) -> impl std::future::Future<Output = CorpusResult<Arc<[CorpusIndexEntry]>>> {
        let source = Arc::clone(&self.source);
        async move {
            let body = source
                .fetch(INDEX_PATH)
                .await
                .map_err(|e| CorpusError::IndexUnavailable(e.to_string()))?;
            let entries = parse_corpus_index(&body)?;
            info!("loaded corpus index with {} books", entries.len());
            Ok(Arc::from(entries))
        }
    }

    pub async fn load_book_text(&self, entry: &CorpusIndexEntry) -> CorpusResult<BookText> {
        entry.validate()?;

        let pending = {
            let mut books = lock(&self.books);
            match books.get(&entry.path) {
                Some(pending) => {
                    debug!("book cache hit for {}", entry.path);
                    pending.clone()
                }
                None => {
                    let pending = self.fetch_book(entry.path.clone()).boxed().shared();
                    books.insert(entry.path.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        if let Err(e) = &result {
            let mut books = lock(&self.books);
            if books
                .get(&entry.path)
                .is_some_and(|current| current.ptr_eq(&pending))
            {
                books.remove(&entry.path);
            }
            warn!("book load failed: {e}");
        }
        result
    }

    fn fetch_book(&self, path: String) -> impl std::future::Future<Output = CorpusResult<BookText>> {
        let source = Arc::clone(&self.source);
        async move {
            let raw = source
                .fetch(&path)
                .await
                .map_err(|e| CorpusError::BookUnavailable {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let text = normalize_book_text(&raw)
                .map_err(|len| CorpusError::BookTooShort {
                    path: path.clone(),
                    len,
                })?;
            let book = BookText::new(&text);
            debug!("cached {} ({} chars)", path, book.len());
            Ok(book)
        }
    }

    /// True once the book at `path` has loaded successfully.
    pub fn is_cached(&self, path: &str) -> bool {
        lock(&self.books)
            .get(path)
            .and_then(|pending| pending.peek())
            .is_some_and(|result| result.is_ok())
    }

    pub fn cached_book_count(&self) -> usize {
        lock(&self.books)
            .values()
            .filter(|pending| matches!(pending.peek(), Some(Ok(_))))
            .count()
    }

    /// Forgets the index and every cached book.
    pub fn clear(&self) {
        *lock(&self.index) = None;
        lock(&self.books).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::source::MemoryCorpusSource;
    use assert_matches::assert_matches;
    use std::time::Duration;

    const BOOK_PATH: &str = "/corpus/books/sample.txt";

    fn index_json() -> String {
        format!(r#"[{{"id": "sample", "path": "{BOOK_PATH}"}}]"#)
    }

    fn long_text() -> String {
        "The quick brown fox jumps over the lazy dog.\r\n".repeat(40)
    }

    fn sample_entry() -> CorpusIndexEntry {
        CorpusIndexEntry::new("sample", BOOK_PATH)
    }

    #[tokio::test]
    async fn test_index_is_fetched_once() {
        let source = Arc::new(
            MemoryCorpusSource::new().with_resource(INDEX_PATH, index_json()),
        );
        let library = CorpusLibrary::new(source.clone());

        let (a, b) = tokio::join!(library.load_corpus_index(), library.load_corpus_index());
        assert_eq!(a.unwrap(), b.unwrap());
        let c = library.load_corpus_index().await.unwrap();

        assert_eq!(c.len(), 1);
        assert_eq!(source.fetch_count(INDEX_PATH), 1);
    }

    #[tokio::test]
    async fn test_failed_index_load_is_retried() {
        let source = Arc::new(MemoryCorpusSource::new());
        let library = CorpusLibrary::new(source.clone());

        assert_matches!(
            library.load_corpus_index().await,
            Err(CorpusError::IndexUnavailable(_))
        );

        source.insert(INDEX_PATH, index_json());
        assert!(library.load_corpus_index().await.is_ok());
        assert_eq!(source.fetch_count(INDEX_PATH), 2);
    }

    #[tokio::test]
    async fn test_concurrent_book_loads_share_one_fetch() {
        let source = Arc::new(
            MemoryCorpusSource::new()
                .with_latency(Duration::from_millis(20))
                .with_resource(BOOK_PATH, long_text()),
        );
        let library = CorpusLibrary::new(source.clone());
        let entry = sample_entry();

        let (a, b) = tokio::join!(library.load_book_text(&entry), library.load_book_text(&entry));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.shares_storage_with(&b));
        assert_eq!(source.fetch_count(BOOK_PATH), 1);
        assert!(library.is_cached(BOOK_PATH));

        library.load_book_text(&entry).await.unwrap();
        assert_eq!(source.fetch_count(BOOK_PATH), 1);
    }

    #[tokio::test]
    async fn test_book_text_is_normalized() {
        let source = Arc::new(MemoryCorpusSource::new().with_resource(BOOK_PATH, long_text()));
        let library = CorpusLibrary::new(source);

        let book = library.load_book_text(&sample_entry()).await.unwrap();
        let text = book.to_string();
        assert!(!text.contains('\r') && !text.contains('\n'));
        assert!(text.starts_with("The quick brown fox jumps over the lazy dog. The quick"));
        assert!(text.ends_with("lazy dog."));
    }

    #[tokio::test]
    async fn test_short_book_is_rejected_and_not_cached() {
        let source = Arc::new(MemoryCorpusSource::new().with_resource(BOOK_PATH, "too short"));
        let library = CorpusLibrary::new(source.clone());

        assert_matches!(
            library.load_book_text(&sample_entry()).await,
            Err(CorpusError::BookTooShort { len: 9, .. })
        );
        assert!(!library.is_cached(BOOK_PATH));
        assert_eq!(library.cached_book_count(), 0);

        source.insert(BOOK_PATH, long_text());
        assert!(library.load_book_text(&sample_entry()).await.is_ok());
        assert_eq!(source.fetch_count(BOOK_PATH), 2);
        assert_eq!(library.cached_book_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_book_is_unavailable() {
        let library = CorpusLibrary::new(Arc::new(MemoryCorpusSource::new()));
        let err = library.load_book_text(&sample_entry()).await.unwrap_err();
        assert_matches!(err, CorpusError::BookUnavailable { .. });
        assert!(err.is_book_failure());
    }

    #[tokio::test]
    async fn test_invalid_entry_is_rejected_without_fetching() {
        let source = Arc::new(MemoryCorpusSource::new());
        let library = CorpusLibrary::new(source.clone());

        let entry = CorpusIndexEntry::new("evil", "/corpus/books/../../etc/passwd");
        assert_matches!(
            library.load_book_text(&entry).await,
            Err(CorpusError::InvalidEntry(_))
        );
        assert_eq!(source.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let source = Arc::new(
            MemoryCorpusSource::new()
                .with_resource(INDEX_PATH, index_json())
                .with_resource(BOOK_PATH, long_text()),
        );
        let library = CorpusLibrary::new(source.clone());

        library.load_corpus_index().await.unwrap();
        library.load_book_text(&sample_entry()).await.unwrap();
        library.clear();
        library.load_corpus_index().await.unwrap();
        library.load_book_text(&sample_entry()).await.unwrap();

        assert_eq!(source.fetch_count(INDEX_PATH), 2);
        assert_eq!(source.fetch_count(BOOK_PATH), 2);
    }
}
