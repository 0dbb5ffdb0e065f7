use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{CorpusError, CorpusResult};

/// Where corpus resources come from.
///
/// Resources are addressed by their absolute resource path, e.g.
/// `/corpus/index.json` or `/corpus/books/emma.txt`.
pub trait CorpusSource: Send + Sync + 'static {
    fn fetch(&self, path: &str) -> BoxFuture<'_, CorpusResult<String>>;
}

/// Fetches corpus resources over HTTP relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpCorpusSource {
    client: Client,
    base: Url,
}

impl HttpCorpusSource {
    /// Resource paths are joined onto `base_url`, which is treated as a
    /// directory even without a trailing slash.
    pub fn new(base_url: &str) -> CorpusResult<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|e| CorpusError::Fetch {
            path: base_url.to_string(),
            status: None,
            reason: format!("invalid base url: {e}"),
        })?;
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    async fn get(&self, path: &str) -> CorpusResult<String> {
        let fetch_error = |status: Option<u16>, reason: String| CorpusError::Fetch {
            path: path.to_string(),
            status,
            reason,
        };

        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| fetch_error(None, e.to_string()))?;
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(None, e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("request failed").into(),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(Some(status.as_u16()), e.without_url().to_string()))
    }
}

impl CorpusSource for HttpCorpusSource {
    fn fetch(&self, path: &str) -> BoxFuture<'_, CorpusResult<String>> {
        let path = path.to_string();
        async move { self.get(&path).await }.boxed()
    }
}

/// Serves corpus resources from a local web root, so `/corpus/index.json`
/// resolves to `<root>/corpus/index.json`.
#[derive(Debug, Clone)]
pub struct DirCorpusSource {
    root: PathBuf,
}

impl DirCorpusSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl CorpusSource for DirCorpusSource {
    fn fetch(&self, path: &str) -> BoxFuture<'_, CorpusResult<String>> {
        let file = self.resolve(path);
        let path = path.to_string();
        async move {
            debug!("reading {}", file.display());
            tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| CorpusError::Fetch {
                    path,
                    status: None,
                    reason: e.to_string(),
                })
        }
        .boxed()
    }
}

/// In-memory corpus with per-path fetch counting and optional latency.
#[derive(Debug, Default)]
pub struct MemoryCorpusSource {
    resources: Mutex<HashMap<String, String>>,
    fetches: Mutex<HashMap<String, usize>>,
    total_fetches: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryCorpusSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_resource(self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&self, path: impl Into<String>, body: impl Into<String>) {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), body.into());
    }

    /// Number of fetches issued for `path`, successful or not.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }
}

impl CorpusSource for MemoryCorpusSource {
    fn fetch(&self, path: &str) -> BoxFuture<'_, CorpusResult<String>> {
        let path = path.to_string();
        async move {
            *self
                .fetches
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(path.clone())
                .or_default() += 1;
            self.total_fetches.fetch_add(1, Ordering::SeqCst);

            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            let body = self
                .resources
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&path)
                .cloned();
            body.ok_or(CorpusError::Fetch {
                path,
                status: Some(404),
                reason: "Not Found".into(),
            })
        }
        .boxed()
    }
}
