//! Engine configuration, supplied externally (environment or CLI flags).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::EntityKind;
use crate::error::{Result, SyncError};
use crate::map::text::parse_iso_date;

pub const DEFAULT_COOLDOWN_SECS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory holding the legacy `.DBF` files
    pub legacy_root: PathBuf,
    pub products_file: String,
    pub sales_file: String,
    pub clients_file: String,
    /// Allow-list of sale days to import; empty imports no sales
    pub target_dates: Vec<Date>,
    pub cooldown_secs: u64,
    pub batch_size: usize,
    pub sample_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            legacy_root: PathBuf::from("."),
            products_file: "ARTICULO.DBF".into(),
            sales_file: "VENTAS.DBF".into(),
            clients_file: "CLIENTES.DBF".into(),
            target_dates: Vec::new(),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl SyncConfig {
    /// Read `POS_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = get("POS_LEGACY_ROOT") {
            cfg.legacy_root = PathBuf::from(v);
        }
        if let Some(v) = get("POS_PRODUCTS_FILE") {
            cfg.products_file = v;
        }
        if let Some(v) = get("POS_SALES_FILE") {
            cfg.sales_file = v;
        }
        if let Some(v) = get("POS_CLIENTS_FILE") {
            cfg.clients_file = v;
        }
        if let Some(v) = get("POS_TARGET_DATES") {
            cfg.target_dates = parse_target_dates(&v)?;
        }
        if let Some(v) = get("POS_SYNC_COOLDOWN_SECS") {
            cfg.cooldown_secs = v.trim().parse().map_err(|_| {
                SyncError::Config(format!("POS_SYNC_COOLDOWN_SECS: not a number: '{v}'"))
            })?;
        }
        if let Some(v) = get("POS_SYNC_BATCH_SIZE") {
            cfg.batch_size = v.trim().parse().map_err(|_| {
                SyncError::Config(format!("POS_SYNC_BATCH_SIZE: not a number: '{v}'"))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch size must be > 0".into()));
        }
        Ok(())
    }

    pub fn file_name(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Products => &self.products_file,
            EntityKind::Sales => &self.sales_file,
            EntityKind::Clients => &self.clients_file,
        }
    }

    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.legacy_root.join(self.file_name(kind))
    }

    /// The fixed set of files the scheduler observes.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        EntityKind::ALL.iter().map(|k| self.path_for(*k)).collect()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Comma-separated `YYYY-MM-DD` list; blanks are ignored, anything else
/// that does not parse is an error.
pub fn parse_target_dates(s: &str) -> Result<Vec<Date>> {
    let mut out = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let d = parse_iso_date(part)
            .ok_or_else(|| SyncError::Config(format!("bad target date '{part}'")))?;
        if !out.contains(&d) {
            out.push(d);
        }
    }
    Ok(out)
}
