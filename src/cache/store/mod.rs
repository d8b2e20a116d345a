// 键值存储抽象
// 限流器与缓存读取层只通过该接口访问共享存储

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use thiserror::Error;

/// 存储操作错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis 不可用或命令失败
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 键对应的值无法按整数自增
    #[error("value at key `{0}` is not an integer")]
    NotAnInteger(String),

    /// 存储连接不可用（测试替身、关闭中的连接等）
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 键的剩余存活时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// 键不存在
    Missing,
    /// 键存在但没有过期时间
    Persistent,
    /// 剩余秒数
    Expires(u64),
}

impl KeyTtl {
    /// 按 Redis TTL 命令的返回值解析：-2 表示不存在，-1 表示无过期时间
    pub fn from_redis(raw: i64) -> Self {
        match raw {
            -2 => KeyTtl::Missing,
            n if n < 0 => KeyTtl::Persistent,
            n => KeyTtl::Expires(n as u64),
        }
    }
}

/// 共享键值存储
///
/// `incr` 是唯一要求原子性的操作；其余的读后写组合不提供原子保证。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 键不存在时创建为 1，否则原子加 1，返回加后的值
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// 设置或重置过期时间；键不存在时不做任何事
    async fn expire(&self, key: &str, secs: u64) -> Result<(), StoreError>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 无条件覆盖，并清除已有的过期时间
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn set_ex(&self, key: &str, value: Vec<u8>, secs: u64) -> Result<(), StoreError>;

    /// 立即删除，键不存在时同样成功
    async fn del(&self, key: &str) -> Result<(), StoreError>;
}
