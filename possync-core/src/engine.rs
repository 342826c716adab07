//! Reconciliation of legacy files into the live store.
//!
//! One pass per entity kind. Products and sales are upserted in bounded
//! batches, one bulk write each; a failed batch is logged and skipped so
//! the rest of the pass still lands. Clients are creation-only: an existing
//! client is never overwritten.

use std::sync::Arc;

use async_trait::async_trait;
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::domain::{ClientDoc, EntityKind, OrderDoc, ProductDoc};
use crate::error::{Result, SyncError};
use crate::map::{extract_client, extract_product, extract_sale};
use crate::read::opened::{LegacyFile, read_file};
use crate::read::record::RawRecord;
use crate::stats::SyncStats;
use crate::store::{LiveStore, UpsertCounts};
use crate::watch::SyncTrigger;

pub type KindCounts = UpsertCounts;

/// Counts for one invocation; discarded by the caller once reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub products: KindCounts,
    pub sales: KindCounts,
    pub clients: KindCounts,
}

impl SyncResult {
    pub fn get(&self, kind: EntityKind) -> KindCounts {
        match kind {
            EntityKind::Products => self.products,
            EntityKind::Sales => self.sales,
            EntityKind::Clients => self.clients,
        }
    }

    pub fn set(&mut self, kind: EntityKind, counts: KindCounts) {
        match kind {
            EntityKind::Products => self.products = counts,
            EntityKind::Sales => self.sales = counts,
            EntityKind::Clients => self.clients = counts,
        }
    }

    pub fn total(&self) -> KindCounts {
        let mut t = KindCounts::default();
        for k in EntityKind::ALL {
            t.add(self.get(k));
        }
        t
    }
}

pub struct Engine {
    cfg: SyncConfig,
    store: Arc<dyn LiveStore>,
    // One pass at a time, whether triggered manually or by the watcher.
    gate: Mutex<()>,
}

impl Engine {
    /// Fails with `SyncError::Config` when the configuration is unusable
    /// (for example a zero batch size).
    pub fn new(cfg: SyncConfig, store: Arc<dyn LiveStore>) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            store,
            gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.cfg
    }

    pub async fn sync_products(&self) -> Result<KindCounts> {
        let _g = self.gate.lock().await;
        self.products_pass().await
    }

    pub async fn sync_sales(&self) -> Result<KindCounts> {
        let _g = self.gate.lock().await;
        self.sales_pass().await
    }

    pub async fn sync_clients(&self) -> Result<KindCounts> {
        let _g = self.gate.lock().await;
        self.clients_pass().await
    }

    pub async fn sync_kind(&self, kind: EntityKind) -> Result<KindCounts> {
        let _g = self.gate.lock().await;
        self.pass(kind).await
    }

    /// Products, then sales, then clients.
    ///
    /// An unreachable store fails up front. A pass that fails afterwards
    /// stops the run with `SyncError::Pass`, which carries the counts of the
    /// passes already completed.
    pub async fn sync_all(&self) -> Result<SyncResult> {
        let _g = self.gate.lock().await;
        self.store.ping().await?;

        let mut result = SyncResult::default();
        for kind in EntityKind::ALL {
            match self.pass(kind).await {
                Ok(counts) => result.set(kind, counts),
                Err(e) => {
                    error!(kind = %kind, error = %e, "sync pass failed");
                    return Err(SyncError::Pass {
                        kind,
                        partial: Box::new(result),
                        source: Box::new(e),
                    });
                }
            }
        }
        let total = result.total();
        info!(
            created = total.created,
            updated = total.updated,
            "full sync complete"
        );
        Ok(result)
    }

    pub async fn sync_stats(&self) -> Result<SyncStats> {
        Ok(SyncStats {
            products: self.store.count_legacy(EntityKind::Products).await?,
            orders: self.store.count_legacy(EntityKind::Sales).await?,
            clients: self.store.count_legacy(EntityKind::Clients).await?,
        })
    }

    async fn pass(&self, kind: EntityKind) -> Result<KindCounts> {
        match kind {
            EntityKind::Products => self.products_pass().await,
            EntityKind::Sales => self.sales_pass().await,
            EntityKind::Clients => self.clients_pass().await,
        }
    }

    /// `None` when the file is missing, unreadable or has a corrupt header;
    /// the pass for that kind then reports zero counts.
    async fn load(&self, kind: EntityKind) -> Result<Option<LegacyFile>> {
        let path = self.cfg.path_for(kind);
        let p = path.clone();
        let loaded = tokio::task::spawn_blocking(move || read_file(&p))
            .await
            .map_err(|e| SyncError::Backend(format!("reader task: {e}")))?;
        match loaded {
            Ok(Some(file)) => {
                debug!(
                    kind = %kind,
                    path = %path.display(),
                    fingerprint = %file.fingerprint_hex(),
                    records = file.available_records(),
                    "legacy snapshot taken"
                );
                Ok(Some(file))
            }
            Ok(None) => {
                warn!(kind = %kind, path = %path.display(), "legacy file not found; skipping");
                Ok(None)
            }
            Err(e) => {
                warn!(kind = %kind, path = %path.display(), error = %e, "legacy file unreadable; skipping");
                Ok(None)
            }
        }
    }

    async fn products_pass(&self) -> Result<KindCounts> {
        let Some(file) = self.load(EntityKind::Products).await? else {
            return Ok(KindCounts::default());
        };
        let records: Vec<RawRecord<'_>> = file.records().collect();
        let mut total = KindCounts::default();

        for (n, chunk) in records.chunks(self.cfg.batch_size).enumerate() {
            let docs: Vec<ProductDoc> = chunk
                .par_iter()
                .filter_map(|r| ProductDoc::from_product(&extract_product(r)))
                .collect();
            if docs.is_empty() {
                continue;
            }
            match self.store.upsert_products(&docs).await {
                Ok(c) => total.add(c),
                Err(e) => error!(
                    kind = "products",
                    batch = n,
                    first_record = chunk[0].index,
                    docs = docs.len(),
                    error = %e,
                    "batch write failed; continuing with next batch"
                ),
            }
        }
        info!(created = total.created, updated = total.updated, "products synced");
        Ok(total)
    }

    async fn sales_pass(&self) -> Result<KindCounts> {
        let targets = &self.cfg.target_dates;
        if targets.is_empty() {
            info!("no target dates configured; skipping sales");
            return Ok(KindCounts::default());
        }
        let Some(file) = self.load(EntityKind::Sales).await? else {
            return Ok(KindCounts::default());
        };
        let records: Vec<RawRecord<'_>> = file.records().collect();
        let docs: Vec<OrderDoc> = records
            .par_iter()
            .map(extract_sale)
            .filter(|s| s.date.is_some_and(|d| targets.contains(&d)))
            .filter_map(|s| OrderDoc::from_sale(&s))
            .collect();
        debug!(scanned = records.len(), matched = docs.len(), "sales filtered by target dates");

        let mut total = KindCounts::default();
        for (n, chunk) in docs.chunks(self.cfg.batch_size).enumerate() {
            match self.store.upsert_orders(chunk).await {
                Ok(c) => total.add(c),
                Err(e) => error!(
                    kind = "sales",
                    batch = n,
                    first_ref = %chunk[0].legacy_ref,
                    docs = chunk.len(),
                    error = %e,
                    "batch write failed; continuing with next batch"
                ),
            }
        }
        info!(created = total.created, updated = total.updated, "sales synced");
        Ok(total)
    }

    async fn clients_pass(&self) -> Result<KindCounts> {
        let Some(file) = self.load(EntityKind::Clients).await? else {
            return Ok(KindCounts::default());
        };
        let docs: Vec<ClientDoc> = file
            .records()
            .filter_map(|r| ClientDoc::from_client(&extract_client(&r)))
            .collect();

        let mut total = KindCounts::default();
        for doc in &docs {
            if self.store.client_exists(&doc.id).await? {
                continue;
            }
            match self.store.insert_client(doc).await {
                Ok(true) => total.created += 1,
                Ok(false) => debug!(code = doc.code, "client appeared concurrently; left as is"),
                Err(e) => warn!(code = doc.code, error = %e, "client insert failed; skipping"),
            }
        }
        info!(created = total.created, "clients synced");
        Ok(total)
    }
}

#[async_trait]
impl SyncTrigger for Engine {
    async fn trigger(&self) {
        match self.sync_all().await {
            Ok(r) => info!(?r, "watch-triggered sync finished"),
            Err(SyncError::Pass {
                kind,
                partial,
                source,
            }) => error!(kind = %kind, partial = ?partial, error = %source, "watch-triggered sync partially failed"),
            Err(e) => error!(error = %e, "watch-triggered sync failed"),
        }
    }
}
