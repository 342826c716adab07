use serde::{Deserialize, Serialize};

/// Legacy-sourced entities currently in the live store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub products: u64,
    pub orders: u64,
    pub clients: u64,
}
