// src/state.rs
//! Engine state and its JSON persistence.
//!
//! The on-disk record is `{ seen, baselines, first_run_completed, started_at }`
//! with `seen` ordered oldest to newest. A missing or unreadable file is never
//! fatal: the watcher starts from an empty state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::baseline::SymbolBaselines;
use crate::dedup::SeenSet;

#[derive(Debug, Clone)]
pub struct EngineState {
    pub seen: SeenSet,
    pub baselines: SymbolBaselines,
    pub first_run_completed: bool,
    pub started_at: DateTime<Utc>,
}

impl EngineState {
    pub fn empty(capacity: usize) -> Self {
        Self {
            seen: SeenSet::with_capacity(capacity),
            baselines: SymbolBaselines::new(),
            first_run_completed: false,
            started_at: Utc::now(),
        }
    }

    fn from_persisted(p: PersistedState, capacity: usize) -> Self {
        Self {
            seen: SeenSet::from_ordered(p.seen, capacity),
            baselines: SymbolBaselines::from_map(p.baselines),
            first_run_completed: p.first_run_completed,
            // Start of this process; the persisted value is informational.
            started_at: Utc::now(),
        }
    }

    fn to_persisted(&self) -> PersistedState {
        PersistedState {
            seen: self.seen.iter().cloned().collect(),
            baselines: self.baselines.as_map().clone(),
            first_run_completed: self.first_run_completed,
            started_at: Some(self.started_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    #[serde(default, alias = "hashes")]
    seen: Vec<String>,
    #[serde(default)]
    baselines: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    first_run_completed: bool,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

/// File-backed state location.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: missing → empty state, malformed → empty state + warning.
    pub async fn load(&self, capacity: usize) -> EngineState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state file, starting fresh");
                return EngineState::empty(capacity);
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state read failed, starting fresh: {e:#}");
                return EngineState::empty(capacity);
            }
        };
        match serde_json::from_str::<PersistedState>(&raw) {
            Ok(p) => {
                let st = EngineState::from_persisted(p, capacity);
                tracing::info!(
                    path = %self.path.display(),
                    seen = st.seen.len(),
                    baselines = st.baselines.as_map().len(),
                    first_run_completed = st.first_run_completed,
                    "state loaded"
                );
                st
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state file malformed, starting fresh: {e:#}");
                EngineState::empty(capacity)
            }
        }
    }

    /// Write via a temp file and rename so a crash never leaves half a file.
    pub async fn save(&self, state: &EngineState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(&state.to_persisted()).context("encoding state")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("renaming state into {}", self.path.display()))?;
        Ok(())
    }
}
