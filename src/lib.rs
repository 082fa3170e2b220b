pub mod api;
pub mod catalog;
pub mod config;
pub mod db;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::catalog::CatalogApi;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub catalog: Arc<dyn CatalogApi>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, catalog: Arc<dyn CatalogApi>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            config,
            db,
            catalog,
            rate_limiter,
        }
    }
}
