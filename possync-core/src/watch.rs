//! Change-triggered scheduling of full syncs.
//!
//! The notify callback only forwards paths into a channel; a Tokio task
//! applies the cooldown and spawns the sync, so detection never waits on a
//! running pass. In-flight passes are not cancelled by `stop`.

use std::collections::{BTreeSet, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;

/// What the scheduler fires. Implemented by the engine; outcomes are the
/// trigger's business, the scheduler only decides when.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    async fn trigger(&self);
}

/// Leaky-bucket cooldown keyed on the last *admitted* event. Suppressed
/// events do not push the window forward.
#[derive(Clone, Debug)]
pub struct Debounce {
    cooldown: Duration,
    last: Option<Instant>,
}

impl Debounce {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    pub fn last(&self) -> Option<Instant> {
        self.last
    }
}

#[derive(Clone, Debug)]
pub struct WatchConfig {
    pub files: Vec<PathBuf>,
    pub cooldown: Duration,
}

impl From<&SyncConfig> for WatchConfig {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            files: cfg.watched_files(),
            cooldown: cfg.cooldown(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WatchStatus {
    pub watching: bool,
    pub files: Vec<PathBuf>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_sync: Option<OffsetDateTime>,
    pub cooldown_secs: u64,
}

#[derive(Debug)]
struct WatchState {
    watching: bool,
    files: Vec<PathBuf>,
    debounce: Debounce,
    last_sync: Option<OffsetDateTime>,
}

pub struct Scheduler {
    cfg: WatchConfig,
    trigger: Arc<dyn SyncTrigger>,
    state: Arc<Mutex<WatchState>>,
    watcher: Option<RecommendedWatcher>,
    pump: Option<JoinHandle<()>>,
}

/// Canonical parent directory plus file name; the form both registration
/// and incoming event paths are compared in.
fn watch_key(path: &Path) -> Option<(PathBuf, OsString)> {
    let name = path.file_name()?.to_os_string();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some((parent.canonicalize().ok()?, name))
}

fn lock(state: &Mutex<WatchState>) -> MutexGuard<'_, WatchState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl Scheduler {
    pub fn new(cfg: WatchConfig, trigger: Arc<dyn SyncTrigger>) -> Self {
        let state = WatchState {
            watching: false,
            files: Vec::new(),
            debounce: Debounce::new(cfg.cooldown),
            last_sync: None,
        };
        Self {
            cfg,
            trigger,
            state: Arc::new(Mutex::new(state)),
            watcher: None,
            pump: None,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Idle -> Watching. No-op when already watching. Files missing at this
    /// point are skipped and not retried. Must run inside a Tokio runtime.
    ///
    /// Each file's parent directory is watched rather than the file itself,
    /// so a file replaced by write-temp-then-rename keeps being observed.
    pub fn start(&mut self) -> Result<()> {
        if self.is_watching() {
            debug!("scheduler already watching");
            return Ok(());
        }

        let mut watched = Vec::new();
        let mut targets = HashSet::new();
        for path in &self.cfg.files {
            let key = if path.is_file() { watch_key(path) } else { None };
            match key {
                Some(key) => {
                    targets.insert(key);
                    watched.push(path.clone());
                }
                None => warn!(path = %path.display(), "legacy file missing; not watching it"),
            }
        }
        let dirs: BTreeSet<PathBuf> = targets.iter().map(|(dir, _)| dir.clone()).collect();

        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(ev) => {
                    if matches!(ev.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for p in ev.paths {
                            if watch_key(&p).is_some_and(|k| targets.contains(&k)) {
                                let _ = tx.send(p);
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            },
        )?;

        for dir in &dirs {
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                warn!(dir = %dir.display(), error = %e, "failed to watch legacy directory");
            }
        }

        {
            let mut st = lock(&self.state);
            st.watching = true;
            st.files = watched.clone();
        }

        let state = Arc::clone(&self.state);
        let trigger = Arc::clone(&self.trigger);
        self.pump = Some(tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                debug!(path = %path.display(), "legacy file changed");
                fire(&state, &trigger, Instant::now());
            }
        }));
        self.watcher = Some(watcher);

        info!(
            files = watched.len(),
            dirs = dirs.len(),
            cooldown_secs = self.cfg.cooldown.as_secs(),
            "watching legacy files"
        );
        Ok(())
    }

    /// Watching -> Idle. A sync already spawned keeps running.
    pub fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        let was = self.watcher.take().is_some();
        let mut st = lock(&self.state);
        st.watching = false;
        st.files.clear();
        if was {
            info!("stopped watching legacy files");
        }
    }

    /// Feed one change event through the cooldown as if observed at `now`.
    /// Returns whether a sync was spawned.
    pub fn on_change(&self, now: Instant) -> bool {
        fire(&self.state, &self.trigger, now)
    }

    pub fn status(&self) -> WatchStatus {
        let st = lock(&self.state);
        WatchStatus {
            watching: st.watching,
            files: st.files.clone(),
            last_sync: st.last_sync,
            cooldown_secs: self.cfg.cooldown.as_secs(),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

fn fire(state: &Mutex<WatchState>, trigger: &Arc<dyn SyncTrigger>, now: Instant) -> bool {
    {
        let mut st = lock(state);
        if !st.watching {
            return false;
        }
        if !st.debounce.admit(now) {
            debug!("change within cooldown; suppressed");
            return false;
        }
        st.last_sync = Some(OffsetDateTime::now_utc());
    }
    let t = Arc::clone(trigger);
    tokio::spawn(async move { t.trigger().await });
    info!("legacy change detected; sync scheduled");
    true
}
