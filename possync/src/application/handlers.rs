use std::path::{Path, PathBuf};
use std::sync::Arc;

use possync_core::config::{SyncConfig, parse_target_dates};
use possync_core::error::{Result, SyncError};
use possync_core::map::text::format_iso_date;
use possync_core::{Backend, EntityKind, Engine, Scheduler, WatchConfig, open_store, read_file};
use serde_json::{Value, json};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::presentation::cli::SyncTarget;

/// Environment first, then command-line overrides.
pub fn config_from_args(root: Option<PathBuf>, dates: Option<String>) -> Result<SyncConfig> {
    let mut cfg = SyncConfig::from_env()?;
    if let Some(root) = root {
        cfg.legacy_root = root;
    }
    if let Some(dates) = dates {
        cfg.target_dates = parse_target_dates(&dates)?;
    }
    Ok(cfg)
}

pub fn backend_from_args(db: PathBuf, dry_run: bool) -> Backend {
    if dry_run {
        Backend::Memory
    } else {
        Backend::Sql(db)
    }
}

async fn engine_for(cfg: SyncConfig, backend: Backend) -> Result<Engine> {
    let store = open_store(backend).await?;
    Engine::new(cfg, store)
}

fn print_json(v: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&v)?);
    Ok(())
}

pub async fn handle_sync(cfg: SyncConfig, backend: Backend, target: SyncTarget) -> Result<()> {
    let engine = engine_for(cfg, backend).await?;
    let kind = match target {
        SyncTarget::All => {
            return match engine.sync_all().await {
                Ok(result) => print_json(serde_json::to_value(result)?),
                Err(SyncError::Pass {
                    kind,
                    partial,
                    source,
                }) => {
                    print_json(json!({ "failed": kind, "partial": *partial }))?;
                    Err(SyncError::Pass {
                        kind,
                        partial,
                        source,
                    })
                }
                Err(e) => Err(e),
            };
        }
        SyncTarget::Products => EntityKind::Products,
        SyncTarget::Sales => EntityKind::Sales,
        SyncTarget::Clients => EntityKind::Clients,
    };
    let counts = engine.sync_kind(kind).await?;
    print_json(json!({ "kind": kind, "counts": counts }))
}

pub async fn handle_stats(cfg: SyncConfig, backend: Backend) -> Result<()> {
    let engine = engine_for(cfg, backend).await?;
    let stats = engine.sync_stats().await?;
    print_json(serde_json::to_value(stats)?)
}

pub async fn handle_watch(
    mut cfg: SyncConfig,
    backend: Backend,
    cooldown: Option<u64>,
) -> Result<()> {
    if let Some(secs) = cooldown {
        cfg.cooldown_secs = secs;
    }
    let engine = Arc::new(engine_for(cfg, backend).await?);
    let mut scheduler = Scheduler::new(WatchConfig::from(engine.config()), engine.clone());

    scheduler.start()?;
    print_json(serde_json::to_value(scheduler.status())?)?;

    tokio::signal::ctrl_c().await?;
    info!("interrupt received; stopping watcher");

    scheduler.stop();
    print_json(serde_json::to_value(scheduler.status())?)
}

pub fn handle_inspect(path: PathBuf, sample: usize) -> Result<()> {
    let Some(file) = read_file(&path)? else {
        return Err(SyncError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    };
    let h = file.header;
    let records: Vec<Value> = file
        .sample(sample)
        .iter()
        .map(|r| {
            json!({
                "index": r.index,
                "offset": r.offset,
                "deleted": r.is_deleted(),
                "text": r.text(),
            })
        })
        .collect();

    print_json(json!({
        "path": path,
        "version": h.version,
        "last_modified": h.last_modified().map(format_iso_date),
        "num_records": h.num_records,
        "available_records": file.available_records(),
        "header_len": h.header_len,
        "record_len": h.record_len,
        "fingerprint": file.fingerprint_hex(),
        "fields": file.fields,
        "sample": records,
    }))
}

fn is_legacy_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dbf"))
}

/// One summary line per legacy file under `dir`, in file-name order.
/// Files that cannot be parsed get an inline error line.
pub fn scan_lines(dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_legacy_file(entry.path()) {
            continue;
        }
        let p = entry.path();
        lines.push(match read_file(p) {
            Ok(Some(f)) => format!(
                "{}\trecords={}\trecord_len={}\tfields={}\tmodified={}",
                p.display(),
                f.available_records(),
                f.header.record_len,
                f.fields.len(),
                f.header
                    .last_modified()
                    .map(format_iso_date)
                    .unwrap_or_else(|| "-".into()),
            ),
            Ok(None) => format!("{}\terror: vanished during scan", p.display()),
            Err(e) => format!("{}\terror: {e}", p.display()),
        });
    }
    lines
}

pub fn handle_scan(dir: PathBuf) -> Result<()> {
    let lines = scan_lines(&dir);
    for line in &lines {
        println!("{line}");
    }
    info!(dir = %dir.display(), found = lines.len(), "scan complete");
    Ok(())
}
