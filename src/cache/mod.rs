// 缓存模块
// 包含共享存储接口、缓存数据结构和操作逻辑

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型和函数，方便其他模块使用
pub use models::{
    CachePolicy, CacheSource, Cached, FailurePolicy, RateLimitConfig, RateLimitDecision,
    RefreshPolicy,
};
pub use operations::{CacheAsideReader, CacheError, RateLimiter};
pub use store::{KeyTtl, KeyValueStore, MemoryStore, RedisStore, StoreError};
