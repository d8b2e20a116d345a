// 商品数据源
// 处理函数通过 ProductProvider 获取商品数据，具体来源对缓存层不可见

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: u64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// 商品数据源，调用可能很慢，也可能失败
#[async_trait]
pub trait ProductProvider: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, ProviderError>;

    async fn product_details(&self, product_id: &str) -> Result<Product, ProviderError>;
}

/// 模拟的慢速商品目录
///
/// 每次调用都会等待 `latency`；详情价格每次随机生成，便于区分缓存数据与新数据。
#[derive(Debug, Clone)]
pub struct SimulatedCatalog {
    latency: Duration,
}

impl SimulatedCatalog {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedCatalog {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl ProductProvider for SimulatedCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, ProviderError> {
        tokio::time::sleep(self.latency).await;
        Ok(vec![Product {
            id: "1".to_string(),
            name: "Product 1".to_string(),
            price: 100,
        }])
    }

    async fn product_details(&self, product_id: &str) -> Result<Product, ProviderError> {
        tokio::time::sleep(self.latency).await;
        // 数字 ID 的价格上限随 ID 增长，其他 ID 固定为 100
        let ceiling = product_id
            .parse::<u64>()
            .unwrap_or(1)
            .max(1)
            .saturating_mul(100);
        let price = rand::thread_rng().gen_range(0..ceiling);
        Ok(Product {
            id: product_id.to_string(),
            name: format!("Product {}", product_id),
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn details_are_named_after_the_id() {
        let catalog = SimulatedCatalog::default();
        let product = catalog.product_details("7").await.unwrap();

        assert_eq!(product.id, "7");
        assert_eq!(product.name, "Product 7");
        assert!(product.price < 700);
    }

    #[tokio::test(start_paused = true)]
    async fn non_numeric_ids_are_accepted() {
        let catalog = SimulatedCatalog::default();
        let product = catalog.product_details("sku-abc").await.unwrap();

        assert_eq!(product.id, "sku-abc");
        assert_eq!(product.name, "Product sku-abc");
        assert!(product.price < 100);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_waits_for_latency() {
        let catalog = SimulatedCatalog::new(Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        let products = catalog.list_products().await.unwrap();

        assert_eq!(products.len(), 1);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
