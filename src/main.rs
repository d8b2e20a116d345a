use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use storefront::{
    AppState,
    cache::{KeyValueStore, MemoryStore, RedisStore},
    catalog::SimulatedCatalog,
    config::Config,
    router::create_router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 进程内存储的过期清理周期
const MEMORY_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置共享存储
    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(redis_url) => Arc::new(
            RedisStore::connect(redis_url)
                .await
                .expect("Failed to connect to Redis"),
        ),
        None => {
            tracing::warn!(
                "REDIS_URL not set, using in-process store; rate limits are not shared between instances"
            );
            let store = Arc::new(MemoryStore::new());
            MemoryStore::spawn_sweeper(&store, MEMORY_SWEEP_PERIOD);
            store
        }
    };
    tracing::info!(
        fail_open = config.rate_limit_fail_open,
        products_cache_ttl_secs = config.products_cache_ttl_secs,
        "Store ready"
    );

    // 设置应用状态
    let catalog = Arc::new(SimulatedCatalog::new(config.catalog_latency()));
    let state = AppState::new(config.clone(), store, catalog);

    let router = create_router(state);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
