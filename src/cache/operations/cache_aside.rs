use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::cache::models::cache_policy::{CachePolicy, CacheSource, Cached, RefreshPolicy};
use crate::cache::store::{KeyValueStore, StoreError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 缓存读取错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    /// 数据源失败，此时不会写缓存
    #[error("producer failed: {0}")]
    Producer(#[source] BoxError),

    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 旁路缓存读取
///
/// 命中时直接返回缓存内容；未命中时调用数据源，返回新值，并在后台任务中写回缓存。
/// 同一个键的并发未命中可能各自调用一次数据源，最后写入的值生效。
/// 如果需要严格的单次调用，需要一个与缓存键同名的分布式锁，这里没有实现。
#[derive(Clone)]
pub struct CacheAsideReader {
    store: Arc<dyn KeyValueStore>,
    failed_writes: Arc<AtomicU64>,
}

impl CacheAsideReader {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            failed_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 后台写缓存失败的累计次数
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// 读取缓存，未命中时调用 `producer` 并回填
    ///
    /// 缓存内容无法解码时记录告警并按未命中处理。读缓存本身失败会直接返回错误，
    /// 不会退化为每次都调用数据源。
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        producer: F,
    ) -> Result<Cached<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        if let Some(raw) = self.store.get(key).await? {
            match serde_json::from_slice::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "Cache hit");
                    if policy.refresh == RefreshPolicy::Always {
                        if let Some(ttl) = policy.ttl {
                            self.spawn_refresh(key, ttl);
                        }
                    }
                    return Ok(Cached {
                        value,
                        source: CacheSource::Hit,
                    });
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Malformed cached payload, treating as miss");
                }
            }
        }

        tracing::debug!(key, "Cache miss");
        let value = producer()
            .await
            .map_err(|e| CacheError::Producer(e.into()))?;

        let payload = serde_json::to_vec(&value)?;
        self.spawn_write(key, payload, policy.ttl);

        Ok(Cached {
            value,
            source: CacheSource::Miss,
        })
    }

    /// 立即删除缓存项，之后的读取一定未命中
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.store.del(key).await?;
        tracing::debug!(key, "Cache entry invalidated");
        Ok(())
    }

    /// 后台写缓存，不阻塞响应；失败只记录日志和计数
    fn spawn_write(&self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) {
        let store = self.store.clone();
        let failed_writes = self.failed_writes.clone();
        let key = key.to_string();

        // 客户端断开不影响该任务，写入仍会完成
        tokio::spawn(async move {
            let result = match ttl {
                Some(ttl) => store.set_ex(&key, payload, ttl.as_secs().max(1)).await,
                None => store.set(&key, payload).await,
            };
            if let Err(e) = result {
                failed_writes.fetch_add(1, Ordering::Relaxed);
                tracing::error!(key = %key, error = %e, "Failed to populate cache");
            }
        });
    }

    /// 命中后在后台续期
    ///
    /// 只重置过期时间，不重写内容。键在此之前被删除时 EXPIRE 不做任何事，
    /// 已失效的旧值不会被写回。
    fn spawn_refresh(&self, key: &str, ttl: Duration) {
        let store = self.store.clone();
        let failed_writes = self.failed_writes.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            if let Err(e) = store.expire(&key, ttl.as_secs().max(1)).await {
                failed_writes.fetch_add(1, Ordering::Relaxed);
                tracing::error!(key = %key, error = %e, "Failed to refresh cache ttl");
            }
        });
    }
}
