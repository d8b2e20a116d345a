use axum::{
    extract::{Json, Path, State},
    http::HeaderName,
    response::IntoResponse,
};

use crate::{
    AppState,
    cache::{CachePolicy, CacheSource, keys},
    error::AppError,
};

use super::model::{OrderResponse, ProductResponse, ProductsResponse};

/// 标记响应来自缓存还是数据源
const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

fn cache_header(source: CacheSource) -> [(HeaderName, &'static str); 1] {
    [(X_CACHE, source.as_str())]
}

/// 商品列表，带过期时间缓存
#[axum::debug_handler]
pub async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cached = state
        .cache
        .read_through(keys::PRODUCTS_KEY, state.products_cache_policy(), || {
            state.catalog.list_products()
        })
        .await?;

    Ok((
        cache_header(cached.source),
        Json(ProductsResponse {
            products: cached.value,
        }),
    ))
}

/// 商品详情，缓存不过期，下单时删除
///
/// 商品 ID 不做格式校验，任意路径段都是合法 ID。
#[axum::debug_handler]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let key = keys::product_key(&product_id);
    let cached = state
        .cache
        .read_through(&key, CachePolicy::persistent(), || {
            state.catalog.product_details(&product_id)
        })
        .await?;

    Ok((
        cache_header(cached.source),
        Json(ProductResponse {
            product: cached.value,
        }),
    ))
}

/// 下单
///
/// 订单会改变商品库存，这里只删除商品详情缓存，下一次读取重新生成。
#[axum::debug_handler]
pub async fn place_order(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<OrderResponse>, AppError> {
    state.cache.invalidate(&keys::product_key(&product_id)).await?;
    tracing::info!(product_id = %product_id, "Order placed, product cache invalidated");

    Ok(Json(OrderResponse::placed(&product_id)))
}
