mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use possync_core::domain::{ClientDoc, OrderDoc, ProductDoc, client_id_for};
use possync_core::index::mem::MemStore;
use possync_core::store::LiveStore;
use possync_core::{
    Backend, EntityKind, Engine, KindCounts, Result, SyncConfig, SyncError, SyncResult, open_store,
    read_file,
};
use time::macros::date;
use uuid::Uuid;

use common::*;

fn config(dir: &std::path::Path) -> SyncConfig {
    SyncConfig {
        legacy_root: dir.to_path_buf(),
        target_dates: vec![date!(2025 - 03 - 01)],
        ..SyncConfig::default()
    }
}

fn counts(created: u64, updated: u64) -> KindCounts {
    KindCounts { created, updated }
}

#[test]
fn reader_locates_records_after_header() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![vec![b'a'; 128], vec![b'b'; 128]];
    // 32-byte header + one descriptor would be 65; pad header to 64 by hand.
    let mut bytes = dbf(&[], 128, &rows);
    bytes.splice(32..33, std::iter::repeat_n(0x0D, 32));
    bytes[8..10].copy_from_slice(&64u16.to_le_bytes());
    write(dir.path(), "X.DBF", &bytes);

    let file = read_file(&dir.path().join("X.DBF")).unwrap().unwrap();
    assert_eq!(file.header.num_records, 2);
    assert_eq!(file.record_offset(0), 64);
    assert_eq!(file.record_offset(1), 192);
    let recs: Vec<_> = file.records().collect();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[1].offset, 192);
    assert!(recs[1].bytes.iter().all(|&b| b == b'b'));
}

#[test]
fn reader_infers_descriptor_offsets() {
    let bytes = products_file(&[product("1", "X", "", "1")]);
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ARTICULO.DBF", &bytes);
    let file = read_file(&dir.path().join("ARTICULO.DBF")).unwrap().unwrap();
    let names: Vec<_> = file.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["CODIGO", "DESCRIP", "RUBRO", "MARCA", "PRECIO", "STOCK"]);
    assert_eq!(file.fields[1].offset, 14);
    assert_eq!(file.fields[5].offset, 96);
}

#[tokio::test]
async fn product_sync_is_idempotent_and_keys_are_stable() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "ARTICULO.DBF",
        &products_file(&[
            product("7790001", "SHAMPOO 500", "SHAMPOO", "4500"),
            product("", "CERA MATE", "cera", "1200"),
            product("", "", "", ""),
        ]),
    );
    let store = Arc::new(MemStore::new());
    let engine = Engine::new(config(dir.path()), store.clone()).unwrap();

    assert_eq!(engine.sync_products().await.unwrap(), counts(2, 0));
    assert_eq!(engine.sync_products().await.unwrap(), counts(0, 2));

    let products = store.products();
    assert_eq!(products.len(), 2);
    let fallback = products.iter().find(|p| p.sku == "LEGACY-1").unwrap();
    assert_eq!(fallback.name, "CERA MATE");
    assert_eq!(fallback.category, "styling");
    let named = products.iter().find(|p| p.sku == "7790001").unwrap();
    assert_eq!(named.category, "hair_care");
    assert_eq!(named.price, 4500);
}

#[tokio::test]
async fn sales_match_exact_target_day_only() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "VENTAS.DBF",
        &sales_file(&[
            sale("20250228", "0001-1", "1", "100"),
            sale("20250301", "0001-2", "3", "150"),
            sale("20250302", "0001-3", "1", "100"),
            sale("20250301", "", "1", "100"),
            sale("2025031", "0001-4", "1", "100"),
        ]),
    );
    let store = Arc::new(MemStore::new());
    let engine = Engine::new(config(dir.path()), store.clone()).unwrap();

    assert_eq!(engine.sync_sales().await.unwrap(), counts(1, 0));
    assert_eq!(engine.sync_sales().await.unwrap(), counts(0, 1));

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].legacy_ref, "INV-0001-2");
    assert_eq!(orders[0].total, 450);
    assert_eq!(orders[0].customer_name, "Walk-in customer");
}

#[tokio::test]
async fn app_orders_with_same_ref_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "VENTAS.DBF",
        &sales_file(&[sale("20250301", "0001-2", "1", "100")]),
    );
    let store = Arc::new(MemStore::new());
    let app = OrderDoc {
        legacy_ref: "INV-0001-2".into(),
        order_date: date!(2025 - 03 - 01),
        pos_id: 9,
        customer_name: "Counter sale".into(),
        client_code: String::new(),
        lines: vec![],
        total: 999,
        status: "completed".into(),
        source: possync_core::domain::Provenance::App,
    };
    store.insert_app_order(app.clone());
    let engine = Engine::new(config(dir.path()), store.clone()).unwrap();

    assert_eq!(engine.sync_sales().await.unwrap(), counts(1, 0));
    let orders = store.orders();
    assert_eq!(orders.len(), 2);
    assert!(orders.contains(&app));
}

#[tokio::test]
async fn no_target_dates_imports_no_sales() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "VENTAS.DBF",
        &sales_file(&[sale("20250301", "0001-2", "1", "100")]),
    );
    let mut cfg = config(dir.path());
    cfg.target_dates.clear();
    let store = Arc::new(MemStore::new());
    let engine = Engine::new(cfg, store.clone()).unwrap();
    assert_eq!(engine.sync_sales().await.unwrap(), KindCounts::default());
    assert!(store.orders().is_empty());
}

#[tokio::test]
async fn clients_are_created_once_and_never_from_bad_codes() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "CLIENTES.DBF",
        &clients_file(&[
            client("00042", "ANA"),
            client("", "NO CODE"),
            client("12A", "BAD CODE"),
            client("42", "ANA AGAIN"),
            client("7", "LUIS"),
        ]),
    );
    let store = Arc::new(MemStore::new());
    let engine = Engine::new(config(dir.path()), store.clone()).unwrap();

    assert_eq!(engine.sync_clients().await.unwrap(), counts(2, 0));
    assert_eq!(engine.sync_clients().await.unwrap(), KindCounts::default());

    let clients = store.clients();
    assert_eq!(clients.len(), 2);
    let ana = clients.iter().find(|c| c.id == client_id_for(42)).unwrap();
    assert_eq!(ana.name, "ANA");
    assert!(clients.iter().all(|c| c.code == 42 || c.code == 7));
}

#[tokio::test]
async fn failed_batch_does_not_stop_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<_> = (1..=5)
        .map(|i| product(&format!("SKU{i}"), &format!("ITEM {i}"), "", "10"))
        .collect();
    write(dir.path(), "ARTICULO.DBF", &products_file(&rows));
    let mut cfg = config(dir.path());
    cfg.batch_size = 2;
    let store = Arc::new(MemStore::new());
    store.fail_write_call(2);
    let engine = Engine::new(cfg, store.clone()).unwrap();

    assert_eq!(engine.sync_products().await.unwrap(), counts(3, 0));
    let skus: Vec<_> = store.products().into_iter().map(|p| p.sku).collect();
    assert_eq!(skus, ["SKU1", "SKU2", "SKU5"]);
}

#[tokio::test]
async fn missing_or_corrupt_files_report_zero() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "VENTAS.DBF", b"short");
    let store = Arc::new(MemStore::new());
    let engine = Engine::new(config(dir.path()), store).unwrap();
    assert_eq!(engine.sync_all().await.unwrap(), SyncResult::default());
}

#[tokio::test]
async fn unreachable_store_fails_before_any_pass() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "ARTICULO.DBF",
        &products_file(&[product("1", "X", "", "1")]),
    );
    let store = Arc::new(MemStore::new());
    store.set_unreachable(true);
    let engine = Engine::new(config(dir.path()), store.clone()).unwrap();

    let err = engine.sync_all().await.unwrap_err();
    assert!(matches!(err, SyncError::Backend(_)));
    store.set_unreachable(false);
    assert!(store.products().is_empty());
}

/// Delegates to a `MemStore` but cannot answer existence checks.
struct NoLookups(MemStore);

#[async_trait]
impl LiveStore for NoLookups {
    async fn ping(&self) -> Result<()> {
        self.0.ping().await
    }
    async fn upsert_products(&self, batch: &[ProductDoc]) -> Result<KindCounts> {
        self.0.upsert_products(batch).await
    }
    async fn upsert_orders(&self, batch: &[OrderDoc]) -> Result<KindCounts> {
        self.0.upsert_orders(batch).await
    }
    async fn client_exists(&self, _id: &Uuid) -> Result<bool> {
        Err(SyncError::Backend("lookup refused".into()))
    }
    async fn insert_client(&self, doc: &ClientDoc) -> Result<bool> {
        self.0.insert_client(doc).await
    }
    async fn count_legacy(&self, kind: EntityKind) -> Result<u64> {
        self.0.count_legacy(kind).await
    }
}

#[tokio::test]
async fn failing_pass_reports_partial_counts() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "ARTICULO.DBF",
        &products_file(&[product("1", "X", "", "1")]),
    );
    write(
        dir.path(),
        "VENTAS.DBF",
        &sales_file(&[sale("20250301", "0001-2", "1", "100")]),
    );
    write(dir.path(), "CLIENTES.DBF", &clients_file(&[client("1", "A")]));
    let engine = Engine::new(config(dir.path()), Arc::new(NoLookups(MemStore::new()))).unwrap();

    match engine.sync_all().await {
        Err(SyncError::Pass {
            kind,
            partial,
            source,
        }) => {
            assert_eq!(kind, EntityKind::Clients);
            assert_eq!(partial.products, counts(1, 0));
            assert_eq!(partial.sales, counts(1, 0));
            assert_eq!(partial.clients, KindCounts::default());
            assert!(matches!(*source, SyncError::Backend(_)));
        }
        other => panic!("expected pass failure, got {other:?}"),
    }
}

#[tokio::test]
async fn full_sync_into_sql_store_then_stats() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "ARTICULO.DBF",
        &products_file(&[
            product("A", "ONE", "GEL", "10"),
            product("B", "TWO", "TINTURA", "20"),
        ]),
    );
    write(
        dir.path(),
        "VENTAS.DBF",
        &sales_file(&[
            sale("20250301", "0001-1", "1", "10"),
            sale("20250301", "0001-2", "2", "20"),
        ]),
    );
    write(
        dir.path(),
        "CLIENTES.DBF",
        &clients_file(&[client("1", "A"), client("2", "B"), client("3", "C")]),
    );

    let store = open_store(Backend::Sql(dir.path().join("live.db"))).await.unwrap();
    let engine = Engine::new(config(dir.path()), store).unwrap();

    let first = engine.sync_all().await.unwrap();
    assert_eq!(first.products, counts(2, 0));
    assert_eq!(first.sales, counts(2, 0));
    assert_eq!(first.clients, counts(3, 0));
    assert_eq!(first.total(), counts(7, 0));

    let second = engine.sync_all().await.unwrap();
    assert_eq!(second.products, counts(0, 2));
    assert_eq!(second.sales, counts(0, 2));
    assert_eq!(second.clients, KindCounts::default());

    let stats = engine.sync_stats().await.unwrap();
    assert_eq!((stats.products, stats.orders, stats.clients), (2, 2, 3));
}

/// Holds every product write open for a while and records whether a second
/// write started before the first finished.
#[derive(Default)]
struct SlowWrites {
    inner: MemStore,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
    writes: AtomicUsize,
}

#[async_trait]
impl LiveStore for SlowWrites {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
    async fn upsert_products(&self, batch: &[ProductDoc]) -> Result<KindCounts> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        let out = self.inner.upsert_products(batch).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
    async fn upsert_orders(&self, batch: &[OrderDoc]) -> Result<KindCounts> {
        self.inner.upsert_orders(batch).await
    }
    async fn client_exists(&self, id: &Uuid) -> Result<bool> {
        self.inner.client_exists(id).await
    }
    async fn insert_client(&self, doc: &ClientDoc) -> Result<bool> {
        self.inner.insert_client(doc).await
    }
    async fn count_legacy(&self, kind: EntityKind) -> Result<u64> {
        self.inner.count_legacy(kind).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_passes_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "ARTICULO.DBF",
        &products_file(&[product("A", "ONE", "", "10")]),
    );
    let store = Arc::new(SlowWrites::default());
    let engine = Arc::new(Engine::new(config(dir.path()), store.clone()).unwrap());

    let (e1, e2) = (engine.clone(), engine.clone());
    let manual = tokio::spawn(async move { e1.sync_products().await });
    let full = tokio::spawn(async move { e2.sync_all().await });
    let direct = engine.sync_kind(EntityKind::Products).await.unwrap();
    let manual = manual.await.unwrap().unwrap();
    let full = full.await.unwrap().unwrap();

    assert_eq!(store.writes.load(Ordering::SeqCst), 3);
    assert!(!store.overlapped.load(Ordering::SeqCst));
    let mut created: Vec<u64> = [direct, manual, full.products]
        .iter()
        .map(|c| c.created)
        .collect();
    created.sort();
    assert_eq!(created, [0, 0, 1]);
}

#[tokio::test]
async fn zero_batch_size_is_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.batch_size = 0;
    let err = Engine::new(cfg, Arc::new(MemStore::new())).err().unwrap();
    assert!(matches!(err, SyncError::Config(_)));
}
