use std::sync::Arc;

use cache::{CacheAsideReader, CachePolicy, KeyValueStore};
use catalog::ProductProvider;
use config::Config;

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub cache: CacheAsideReader,
    pub catalog: Arc<dyn ProductProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn ProductProvider>,
    ) -> Self {
        Self {
            config,
            cache: CacheAsideReader::new(store.clone()),
            store,
            catalog,
        }
    }

    /// 商品列表的缓存策略
    pub fn products_cache_policy(&self) -> CachePolicy {
        CachePolicy::expiring(self.config.products_cache_ttl())
            .with_refresh(self.config.products_cache_refresh)
    }
}
