use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::index::mem::MemStore;
use crate::store::LiveStore;
use crate::store_sql::SqlStore;

pub enum Backend {
    /// libsql database file
    Sql(PathBuf),
    Memory,
}

pub async fn open_store(backend: Backend) -> Result<Arc<dyn LiveStore>> {
    match backend {
        Backend::Sql(path) => Ok(Arc::new(SqlStore::open(&path).await?)),
        Backend::Memory => Ok(Arc::new(MemStore::new())),
    }
}
