use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// 商品列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// 商品详情响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub product: Product,
}

/// 下单响应
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub message: String,
}

impl OrderResponse {
    pub fn placed(product_id: &str) -> Self {
        Self {
            message: format!("order placed successfully {} is ordered.", product_id),
        }
    }
}
