use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::repo::{PgUserStore, UserStore};
use crate::catalog::repo::{CatalogStore, PgCatalogStore};
use crate::config::AppConfig;
use crate::records::{pg::PgRecordStore, repo::RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub records: Arc<dyn RecordStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl AppState {
    pub fn from_pool(config: AppConfig, db: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserStore::new(db.clone())),
            records: Arc::new(PgRecordStore::new(db.clone())),
            catalog: Arc::new(PgCatalogStore::new(db)),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Fully in-process state with an empty catalog.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_catalog(config, Default::default())
    }

    pub fn with_catalog(config: AppConfig, catalog: crate::catalog::memory::MemoryCatalogStore) -> Self {
        use crate::auth::memory::MemoryUserStore;
        use crate::records::memory::MemoryRecordStore;

        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::new()),
            records: Arc::new(MemoryRecordStore::new()),
            catalog: Arc::new(catalog),
        }
    }
}
