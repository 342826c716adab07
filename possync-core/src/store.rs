use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{ClientDoc, EntityKind, OrderDoc, ProductDoc};
use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub created: u64,
    pub updated: u64,
}

impl UpsertCounts {
    pub fn add(&mut self, other: UpsertCounts) {
        self.created += other.created;
        self.updated += other.updated;
    }
}

/// The live operational datastore that legacy records are reconciled into.
///
/// Batch operations are atomic per call: a failed call leaves the store as
/// it was before that call.
#[async_trait]
pub trait LiveStore: Send + Sync {
    /// Cheap reachability check.
    async fn ping(&self) -> Result<()>;

    /// Insert-or-update by SKU.
    async fn upsert_products(&self, batch: &[ProductDoc]) -> Result<UpsertCounts>;

    /// Insert-or-update matching only legacy-sourced orders with the same
    /// `legacy_ref`; app-created orders are never touched.
    async fn upsert_orders(&self, batch: &[OrderDoc]) -> Result<UpsertCounts>;

    async fn client_exists(&self, id: &Uuid) -> Result<bool>;

    /// Insert if absent. `Ok(false)` when a client with that id already
    /// existed and nothing was written.
    async fn insert_client(&self, doc: &ClientDoc) -> Result<bool>;

    /// Entities carrying the legacy provenance tag.
    async fn count_legacy(&self, kind: EntityKind) -> Result<u64>;
}
