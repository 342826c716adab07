use std::path::Path;

use async_trait::async_trait;
use libsql::{Connection, Database, params};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{ClientDoc, EntityKind, OrderDoc, ProductDoc, Provenance};
use crate::error::Result;
use crate::map::text::format_iso_date;
use crate::store::{LiveStore, UpsertCounts};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id         TEXT PRIMARY KEY,
    sku        TEXT NOT NULL UNIQUE,
    name       TEXT NOT NULL,
    price      INTEGER NOT NULL,
    stock      INTEGER NOT NULL,
    category   TEXT NOT NULL,
    brand      TEXT NOT NULL,
    active     INTEGER NOT NULL,
    source     TEXT NOT NULL,
    synced_at  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS orders (
    id            TEXT PRIMARY KEY,
    legacy_ref    TEXT,
    order_date    TEXT NOT NULL,
    pos_id        INTEGER NOT NULL,
    customer_name TEXT NOT NULL,
    client_code   TEXT NOT NULL,
    lines         TEXT NOT NULL,
    total         INTEGER NOT NULL,
    status        TEXT NOT NULL,
    source        TEXT NOT NULL,
    synced_at     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_source_ref ON orders (source, legacy_ref);
CREATE TABLE IF NOT EXISTS clients (
    id         TEXT PRIMARY KEY,
    code       INTEGER NOT NULL,
    name       TEXT NOT NULL,
    phone      TEXT NOT NULL,
    tax_id     TEXT NOT NULL,
    address    TEXT NOT NULL,
    locality   TEXT NOT NULL,
    province   TEXT NOT NULL,
    source     TEXT NOT NULL,
    synced_at  INTEGER NOT NULL
);
";

/// libsql-backed live store. One connection, one transaction per batch.
pub struct SqlStore {
    _db: Database,
    conn: Connection,
}

impl SqlStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path).build().await?;
        Self::init(db).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = libsql::Builder::new_local(":memory:").build().await?;
        Self::init(db).await
    }

    async fn init(db: Database) -> Result<Self> {
        let conn = db.connect()?;
        conn.execute_batch(SCHEMA).await?;
        Ok(Self { _db: db, conn })
    }

    /// Direct handle for callers that share the database (tests, the app).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn apply_products(conn: &Connection, batch: &[ProductDoc], now: i64) -> Result<UpsertCounts> {
        let mut counts = UpsertCounts::default();
        for d in batch {
            let changed = conn
                .execute(
                    "UPDATE products SET name = ?1, price = ?2, stock = ?3, category = ?4,
                         brand = ?5, active = ?6, source = ?7, synced_at = ?8
                     WHERE sku = ?9",
                    params![
                        d.name.as_str(),
                        d.price,
                        d.stock,
                        d.category.as_str(),
                        d.brand.as_str(),
                        i64::from(d.active),
                        d.source.as_str(),
                        now,
                        d.sku.as_str()
                    ],
                )
                .await?;
            if changed > 0 {
                counts.updated += 1;
                continue;
            }
            conn.execute(
                "INSERT INTO products (id, sku, name, price, stock, category, brand, active, source, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    Uuid::new_v4().to_string(),
                    d.sku.as_str(),
                    d.name.as_str(),
                    d.price,
                    d.stock,
                    d.category.as_str(),
                    d.brand.as_str(),
                    i64::from(d.active),
                    d.source.as_str(),
                    now
                ],
            )
            .await?;
            counts.created += 1;
        }
        Ok(counts)
    }

    async fn apply_orders(conn: &Connection, batch: &[OrderDoc], now: i64) -> Result<UpsertCounts> {
        let mut counts = UpsertCounts::default();
        for d in batch {
            let lines = serde_json::to_string(&d.lines)?;
            let date = format_iso_date(d.order_date);
            let changed = conn
                .execute(
                    "UPDATE orders SET order_date = ?1, pos_id = ?2, customer_name = ?3,
                         client_code = ?4, lines = ?5, total = ?6, status = ?7, synced_at = ?8
                     WHERE source = ?9 AND legacy_ref = ?10",
                    params![
                        date.as_str(),
                        d.pos_id,
                        d.customer_name.as_str(),
                        d.client_code.as_str(),
                        lines.as_str(),
                        d.total,
                        d.status.as_str(),
                        now,
                        Provenance::Legacy.as_str(),
                        d.legacy_ref.as_str()
                    ],
                )
                .await?;
            if changed > 0 {
                counts.updated += 1;
                continue;
            }
            conn.execute(
                "INSERT INTO orders (id, legacy_ref, order_date, pos_id, customer_name, client_code,
                     lines, total, status, source, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    Uuid::new_v4().to_string(),
                    d.legacy_ref.as_str(),
                    date.as_str(),
                    d.pos_id,
                    d.customer_name.as_str(),
                    d.client_code.as_str(),
                    lines.as_str(),
                    d.total,
                    d.status.as_str(),
                    d.source.as_str(),
                    now
                ],
            )
            .await?;
            counts.created += 1;
        }
        Ok(counts)
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[async_trait]
impl LiveStore for SqlStore {
    async fn ping(&self) -> Result<()> {
        let mut rows = self.conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }

    async fn upsert_products(&self, batch: &[ProductDoc]) -> Result<UpsertCounts> {
        let tx = self.conn.transaction().await?;
        match Self::apply_products(&tx, batch, now_unix()).await {
            Ok(counts) => {
                tx.commit().await?;
                debug!(n = batch.len(), ?counts, "products batch committed");
                Ok(counts)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %e, rollback_error = %rb, "batch rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn upsert_orders(&self, batch: &[OrderDoc]) -> Result<UpsertCounts> {
        let tx = self.conn.transaction().await?;
        match Self::apply_orders(&tx, batch, now_unix()).await {
            Ok(counts) => {
                tx.commit().await?;
                debug!(n = batch.len(), ?counts, "orders batch committed");
                Ok(counts)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %e, rollback_error = %rb, "batch rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn client_exists(&self, id: &Uuid) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM clients WHERE id = ?1", params![id.to_string()])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn insert_client(&self, d: &ClientDoc) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO clients (id, code, name, phone, tax_id, address, locality,
                     province, source, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    d.id.to_string(),
                    d.code as i64,
                    d.name.as_str(),
                    d.phone.as_str(),
                    d.tax_id.as_str(),
                    d.address.as_str(),
                    d.locality.as_str(),
                    d.province.as_str(),
                    d.source.as_str(),
                    now_unix()
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    async fn count_legacy(&self, kind: EntityKind) -> Result<u64> {
        let sql = match kind {
            EntityKind::Products => "SELECT COUNT(*) FROM products WHERE source = ?1",
            EntityKind::Sales => "SELECT COUNT(*) FROM orders WHERE source = ?1",
            EntityKind::Clients => "SELECT COUNT(*) FROM clients WHERE source = ?1",
        };
        let mut rows = self
            .conn
            .query(sql, params![Provenance::Legacy.as_str()])
            .await?;
        let n = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
