/// 商品列表缓存键
pub const PRODUCTS_KEY: &str = "products";

/// 商品详情缓存键前缀
const PRODUCT_PREFIX: &str = "product:";

/// 生成商品详情缓存键，商品 ID 按原样拼接
pub fn product_key(product_id: &str) -> String {
    format!("{}{}", PRODUCT_PREFIX, product_id)
}
