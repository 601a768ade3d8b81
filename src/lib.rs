pub mod api;
pub mod config;
pub mod db;
pub mod storage;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::storage::ObjectStorage;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub storage: Arc<ObjectStorage>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, storage: Arc<ObjectStorage>) -> Self {
        Self {
            config,
            db,
            storage,
        }
    }
}
