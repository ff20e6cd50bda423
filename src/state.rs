//! Shared application state for all routes.

use crate::service::DataLayer;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Repositories with their hooks and statement caches; built once at startup.
    pub models: Arc<DataLayer>,
}

impl AppState {
    pub fn new(pool: PgPool, models: DataLayer) -> Self {
        AppState {
            pool,
            models: Arc::new(models),
        }
    }
}
