use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ClientDoc, EntityKind, OrderDoc, ProductDoc, Provenance};
use crate::error::{Result, SyncError};
use crate::store::{LiveStore, UpsertCounts};

#[derive(Clone, Debug, Default)]
struct Inner {
    products: BTreeMap<String, ProductDoc>,
    orders: Vec<OrderDoc>,
    clients: BTreeMap<Uuid, ClientDoc>,
    // fault injection
    unreachable: bool,
    write_calls: u64,
    failing_calls: BTreeSet<u64>,
}

/// Process-local live store. Used for dry runs and as the test double for
/// the engine.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| SyncError::Backend("memory store poisoned".into()))
    }

    /// Every subsequent call fails, including `ping`.
    pub fn set_unreachable(&self, v: bool) {
        if let Ok(mut g) = self.inner.lock() {
            g.unreachable = v;
        }
    }

    /// Make the `n`th batch write (1-based, counted across kinds) fail.
    pub fn fail_write_call(&self, n: u64) {
        if let Ok(mut g) = self.inner.lock() {
            g.failing_calls.insert(n);
        }
    }

    /// Seed an order as if the primary application had created it.
    pub fn insert_app_order(&self, mut doc: OrderDoc) {
        doc.source = Provenance::App;
        if let Ok(mut g) = self.inner.lock() {
            g.orders.push(doc);
        }
    }

    pub fn products(&self) -> Vec<ProductDoc> {
        self.lock()
            .map(|g| g.products.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn orders(&self) -> Vec<OrderDoc> {
        self.lock().map(|g| g.orders.clone()).unwrap_or_default()
    }

    pub fn clients(&self) -> Vec<ClientDoc> {
        self.lock()
            .map(|g| g.clients.values().cloned().collect())
            .unwrap_or_default()
    }

    fn begin_write(g: &mut Inner) -> Result<()> {
        if g.unreachable {
            return Err(SyncError::Backend("memory store unreachable".into()));
        }
        g.write_calls += 1;
        if g.failing_calls.contains(&g.write_calls) {
            return Err(SyncError::Backend(format!(
                "injected failure on write #{}",
                g.write_calls
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LiveStore for MemStore {
    async fn ping(&self) -> Result<()> {
        let g = self.lock()?;
        if g.unreachable {
            return Err(SyncError::Backend("memory store unreachable".into()));
        }
        Ok(())
    }

    async fn upsert_products(&self, batch: &[ProductDoc]) -> Result<UpsertCounts> {
        let mut g = self.lock()?;
        Self::begin_write(&mut g)?;
        let mut counts = UpsertCounts::default();
        for doc in batch {
            match g.products.insert(doc.sku.clone(), doc.clone()) {
                Some(_) => counts.updated += 1,
                None => counts.created += 1,
            }
        }
        Ok(counts)
    }

    async fn upsert_orders(&self, batch: &[OrderDoc]) -> Result<UpsertCounts> {
        let mut g = self.lock()?;
        Self::begin_write(&mut g)?;
        let mut counts = UpsertCounts::default();
        for doc in batch {
            let hit = g
                .orders
                .iter()
                .position(|o| o.source == Provenance::Legacy && o.legacy_ref == doc.legacy_ref);
            match hit {
                Some(i) => {
                    g.orders[i] = doc.clone();
                    counts.updated += 1;
                }
                None => {
                    g.orders.push(doc.clone());
                    counts.created += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn client_exists(&self, id: &Uuid) -> Result<bool> {
        let g = self.lock()?;
        if g.unreachable {
            return Err(SyncError::Backend("memory store unreachable".into()));
        }
        Ok(g.clients.contains_key(id))
    }

    async fn insert_client(&self, doc: &ClientDoc) -> Result<bool> {
        let mut g = self.lock()?;
        Self::begin_write(&mut g)?;
        if g.clients.contains_key(&doc.id) {
            return Ok(false);
        }
        g.clients.insert(doc.id, doc.clone());
        Ok(true)
    }

    async fn count_legacy(&self, kind: EntityKind) -> Result<u64> {
        let g = self.lock()?;
        let n = match kind {
            EntityKind::Products => g
                .products
                .values()
                .filter(|p| p.source == Provenance::Legacy)
                .count(),
            EntityKind::Sales => g
                .orders
                .iter()
                .filter(|o| o.source == Provenance::Legacy)
                .count(),
            EntityKind::Clients => g
                .clients
                .values()
                .filter(|c| c.source == Provenance::Legacy)
                .count(),
        };
        Ok(n as u64)
    }
}
