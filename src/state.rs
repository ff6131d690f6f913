use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::lifecycle::LifecycleManager;
use crate::services::store::SqliteStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub lifecycle: LifecycleManager,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let store = Arc::new(SqliteStore::new(Arc::clone(&db)));
        let lifecycle = LifecycleManager::new(store, config.transition_policy());
        Self {
            db,
            config,
            lifecycle,
        }
    }

    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
