pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::TaskdConfig;
use storage::Storage;
use tasks::store::TaskStore;

/// Shared application state passed to every REST handler.
///
/// Holds only process-wide resources. Request identity never lives here —
/// the auth middleware resolves it per request and attaches it as a
/// [`auth::Principal`] extension.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TaskdConfig>,
    pub storage: Arc<Storage>,
    pub task_store: Arc<TaskStore>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: Arc<TaskdConfig>, storage: Arc<Storage>) -> Self {
        let task_store = Arc::new(TaskStore::new(storage.pool()));
        Self {
            config,
            storage,
            task_store,
            started_at: std::time::Instant::now(),
        }
    }
}
