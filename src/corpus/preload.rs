use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use super::library::CorpusLibrary;
use super::session::{create_corpus_session, CorpusSession, SessionOptions};
use crate::error::{CorpusError, CorpusResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Monotonic request counter. Only the holder of the newest ticket may
/// commit what it fetched.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration {
    latest: Arc<AtomicU64>,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket that supersedes every earlier one.
    pub fn next(&self) -> RequestTicket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            id,
            latest: Arc::clone(&self.latest),
        }
    }

    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

// The built session is handed out exactly once; every other waiter only
// learns whether construction succeeded.
type PreloadSlot = Arc<Mutex<Option<CorpusSession>>>;

struct PendingPreload {
    options: SessionOptions,
    ticket: RequestTicket,
    abort: AbortHandle,
    ready: Shared<BoxFuture<'static, CorpusResult<PreloadSlot>>>,
}

struct PreloaderInner {
    library: Arc<CorpusLibrary>,
    pending: Mutex<Option<PendingPreload>>,
    generation: RequestGeneration,
}

/// Prepares the next corpus session in the background so starting one feels
/// instant.
///
/// At most one preload is in flight. A request for a different initial size
/// supersedes (and cancels) a mismatched one rather than handing out a buffer
/// of the wrong size.
#[derive(Clone)]
pub struct SessionPreloader {
    inner: Arc<PreloaderInner>,
}

impl SessionPreloader {
    pub fn new(library: Arc<CorpusLibrary>) -> Self {
        Self {
            inner: Arc::new(PreloaderInner {
                library,
                pending: Mutex::new(None),
                generation: RequestGeneration::new(),
            }),
        }
    }

    /// True when a preload for `options` is in flight or ready.
    pub fn has_pending(&self, options: &SessionOptions) -> bool {
        lock(&self.inner.pending)
            .as_ref()
            .is_some_and(|pending| pending.options == *options)
    }

    fn start_or_join(&self, options: &SessionOptions) -> (RequestTicket, Shared<BoxFuture<'static, CorpusResult<PreloadSlot>>>) {
        let mut pending = lock(&self.inner.pending);
        if let Some(existing) = pending.as_ref() {
            if existing.options == *options {
                return (existing.ticket.clone(), existing.ready.clone());
            }
            debug!(
                "superseding preload of {} chars with {} chars",
                existing.options.initial_chars, options.initial_chars
            );
            existing.abort.abort();
        }

        let ticket = self.inner.generation.next();
        let library = Arc::clone(&self.inner.library);
        let opts = *options;
        let task = tokio::spawn(async move { create_corpus_session(&library, &opts).await });
        let abort = task.abort_handle();
        let ready = async move {
            match task.await {
                Ok(result) => result.map(|session| Arc::new(Mutex::new(Some(session)))),
                Err(e) => Err(CorpusError::Preload(e.to_string())),
            }
        }
        .boxed()
        .shared();

        debug!("preload #{} started for {} chars", ticket.id(), opts.initial_chars);
        *pending = Some(PendingPreload {
            options: opts,
            ticket: ticket.clone(),
            abort,
            ready: ready.clone(),
        });
        (ticket, ready)
    }

    /// Starts a preload for `options` unless a compatible one already exists,
    /// and waits for it. Every caller shares the same construction; a failure
    /// clears the slot so a later call retries.
    pub async fn preload(&self, options: &SessionOptions) -> CorpusResult<()> {
        let (ticket, ready) = self.start_or_join(options);
        let result = ready.await;
        if result.is_err() {
            let mut pending = lock(&self.inner.pending);
            if pending
                .as_ref()
                .is_some_and(|p| p.ticket.id() == ticket.id())
            {
                *pending = None;
            }
        }
        result.map(|_| ())
    }

    /// Hands out the preloaded session for `options`, or builds one on the
    /// spot, then quietly starts preparing the next one.
    pub async fn consume(&self, options: &SessionOptions) -> CorpusResult<CorpusSession> {
        let detached = {
            let mut pending = lock(&self.inner.pending);
            match pending.take() {
                Some(p) if p.options == *options => Some(p),
                Some(stale) => {
                    debug!(
                        "discarding preload of {} chars, {} requested",
                        stale.options.initial_chars, options.initial_chars
                    );
                    stale.abort.abort();
                    None
                }
                None => None,
            }
        };

        let preloaded = match detached {
            Some(p) => match p.ready.await {
                Ok(slot) => {
                    let taken = lock(&slot).take();
                    taken
                }
                Err(e) => {
                    debug!("preload #{} failed, building fresh: {e}", p.ticket.id());
                    None
                }
            },
            None => None,
        };

        let session = match preloaded {
            Some(session) => {
                debug!("using preloaded session for '{}'", session.entry.id);
                Ok(session)
            }
            None => create_corpus_session(&self.inner.library, options).await,
        };

        self.spawn_next(*options);
        session
    }

    fn spawn_next(&self, options: SessionOptions) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, skipping speculative preload");
            return;
        };
        let preloader = self.clone();
        runtime.spawn(async move {
            if let Err(e) = preloader.preload(&options).await {
                warn!("speculative preload failed: {e}");
            }
        });
    }
}
