#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod stats;
pub mod store;
pub mod store_factory;
pub mod store_sql;
pub mod watch;

pub mod container {
    pub mod fields;
    pub mod header;
}

pub mod read {
    pub mod opened;
    pub mod record;
}

pub mod map;

pub mod index {
    pub mod mem;
}

// Re-exports: stable API surface
pub use config::SyncConfig;
pub use domain::{Client, ClientDoc, EntityKind, OrderDoc, Product, ProductDoc, Sale};
pub use engine::{Engine, KindCounts, SyncResult};
pub use error::{Result, SyncError};
pub use read::opened::{LegacyFile, read_file};
pub use stats::SyncStats;
pub use store::{LiveStore, UpsertCounts};
pub use store_factory::{Backend, open_store};
pub use watch::{Scheduler, WatchConfig, WatchStatus};
