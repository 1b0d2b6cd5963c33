use std::sync::Arc;

use crate::backup::BackupStore;
use crate::db::Db;

/// Shared handler state. Cloned per request; the pool and snapshot store are
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub backups: Arc<BackupStore>,
    pub version: String,
}

impl AppState {
    pub fn new(db: Db, backups: BackupStore) -> Self {
        Self {
            db,
            backups: Arc::new(backups),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
