use std::sync::Arc;

use axum::{Router, routing::get};

use crate::{
    AppState,
    cache::{RateLimitConfig, RateLimiter},
    middleware::{log_errors, rate_limit},
    routes,
};

/// 首页限流：每 300 秒 30 次
pub fn home_rate_limit() -> RateLimitConfig {
    RateLimitConfig::new(30, 300, "home")
}

/// 商品列表限流：每 20 秒 5 次
pub fn products_rate_limit() -> RateLimitConfig {
    RateLimitConfig::new(5, 20, "products")
}

fn limiter(state: &AppState, config: RateLimitConfig) -> Arc<RateLimiter> {
    Arc::new(
        RateLimiter::new(state.store.clone(), config)
            .with_failure_policy(state.config.rate_limit_failure_policy()),
    )
}

// 创建主路由
// 每个路由的处理顺序固定：限流 -> 缓存读取 -> 数据源
pub fn create_router(state: AppState) -> Router {
    let home_limiter = limiter(&state, home_rate_limit());
    let products_limiter = limiter(&state, products_rate_limit());

    Router::new()
        .route(
            "/",
            get(routes::home::hello).route_layer(axum::middleware::from_fn_with_state(
                home_limiter,
                rate_limit,
            )),
        )
        .route(
            "/products",
            get(routes::product::list_products).route_layer(
                axum::middleware::from_fn_with_state(products_limiter, rate_limit),
            ),
        )
        .route("/product/{id}", get(routes::product::get_product))
        .route("/order/{id}", get(routes::product::place_order))
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
