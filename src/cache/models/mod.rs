/// 缓存数据模型
/// 定义限流与缓存读取使用的结构体

// 限流配置与判定结果
pub mod rate_limit;

// 缓存策略
pub mod cache_policy;

// 重新导出常用类型
pub use cache_policy::{CachePolicy, CacheSource, Cached, RefreshPolicy};
pub use rate_limit::{FailurePolicy, RateLimitConfig, RateLimitDecision};
