use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::corpus::{SessionOptions, DEFAULT_INITIAL_CHARS};
use crate::drill::{DrillSettings, DEFAULT_REFILL_MARGIN, DEFAULT_REFILL_STEP};
use crate::stats::WpmDisplayPolicy;

/// Persisted settings. Missing fields take their defaults, so older files
/// keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base URL serving `/corpus/index.json` and the books.
    pub corpus_url: Option<String>,
    /// Local web root used instead of `corpus_url`.
    pub corpus_dir: Option<PathBuf>,
    pub initial_chars: usize,
    pub refill_margin: usize,
    pub refill_step: usize,
    pub number_of_secs: Option<u64>,
    pub wpm_window_ms: u64,
    pub warmup_ms: u64,
    pub warmup_min_chars: usize,
    pub idle_reset_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let policy = WpmDisplayPolicy::default();
        Self {
            corpus_url: None,
            corpus_dir: None,
            initial_chars: DEFAULT_INITIAL_CHARS,
            refill_margin: DEFAULT_REFILL_MARGIN,
            refill_step: DEFAULT_REFILL_STEP,
            number_of_secs: None,
            wpm_window_ms: policy.window_ms,
            warmup_ms: policy.warmup_ms,
            warmup_min_chars: policy.warmup_min_chars,
            idle_reset_ms: policy.idle_reset_ms,
        }
    }
}

impl Config {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::with_initial_chars(self.initial_chars)
    }

    pub fn wpm_policy(&self) -> WpmDisplayPolicy {
        WpmDisplayPolicy {
            window_ms: self.wpm_window_ms,
            retention_ms: self.wpm_window_ms.saturating_mul(3),
            warmup_ms: self.warmup_ms,
            warmup_min_chars: self.warmup_min_chars,
            idle_reset_ms: self.idle_reset_ms,
        }
    }

    pub fn drill_settings(&self) -> DrillSettings {
        DrillSettings {
            refill_margin: self.refill_margin,
            refill_step: self.refill_step.max(1),
            time_limit_ms: self.number_of_secs.map(|s| s.saturating_mul(1_000)),
            wpm_policy: self.wpm_policy(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "booktype") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("booktype_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
            warn!("ignoring unreadable config {}: {e}", self.path.display());
            Config::default()
        })
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
