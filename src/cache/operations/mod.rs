/// 缓存操作
/// 提供限流计数与旁路缓存的功能实现

// 限流
pub mod rate_limit;

// 旁路缓存读取
pub mod cache_aside;

// 重新导出常用操作
pub use cache_aside::{BoxError, CacheAsideReader, CacheError};
pub use rate_limit::RateLimiter;
