use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{KeyTtl, KeyValueStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Vec<u8>) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 每写入这么多次做一次全量过期清理
const SWEEP_EVERY_WRITES: u64 = 256;

/// 进程内存储
///
/// 语义与 Redis 对应命令一致。读到过期键时按键清理；另外每 `SWEEP_EVERY_WRITES`
/// 次写入做一次全量清理，`spawn_sweeper` 可以再加一个定时清理任务，
/// 不再访问的键（例如只来过一次的客户端的计数）也会被回收。
/// 时间取自 tokio 时钟，测试中可以用 `tokio::time::pause` / `advance` 控制过期。
/// 只适用于单实例运行，多个进程之间不共享计数。
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的键数量，包括尚未清理的过期键
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 删除所有已过期的键，返回删除数量
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "Swept expired entries");
        }
        removed
    }

    /// 启动定时清理任务，store 被释放后任务自行退出
    pub fn spawn_sweeper(store: &Arc<MemoryStore>, period: Duration) -> JoinHandle<()> {
        let store: Weak<MemoryStore> = Arc::downgrade(store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.sweep_expired();
                    }
                    None => break,
                }
            }
        })
    }

    fn increment(&self, key: &str, now: Instant) -> Result<i64, StoreError> {
        // entry 持有分片写锁，读取与写回之间不会被其他自增打断
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::persistent(b"0".to_vec()));
        if entry.is_expired(now) {
            *entry = Entry::persistent(b"0".to_vec());
        }

        let current = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| StoreError::NotAnInteger(key.to_string()))?;
        let next = current + 1;
        entry.value = next.to_string().into_bytes();
        Ok(next)
    }

    fn purge_expired(&self, key: &str, now: Instant) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    /// 调用方不能持有任何分片锁，`retain` 会锁住全部分片
    fn record_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY_WRITES == 0 {
            self.sweep_expired();
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let next = self.increment(key, now)?;
        self.record_write();
        Ok(next)
    }

    async fn expire(&self, key: &str, secs: u64) -> Result<(), StoreError> {
        let now = Instant::now();
        self.purge_expired(key, now);
        if secs == 0 {
            self.entries.remove(key);
            return Ok(());
        }
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(now + Duration::from_secs(secs));
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = Instant::now();
        self.purge_expired(key, now);
        let ttl = match self.entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) => match entry.expires_at {
                None => KeyTtl::Persistent,
                Some(at) => {
                    // 向上取整，剩余不足一秒时仍报告 1
                    let remaining = at.saturating_duration_since(now);
                    KeyTtl::Expires(remaining.as_millis().div_ceil(1000) as u64)
                }
            },
        };
        Ok(ttl)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        self.purge_expired(key, now);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), Entry::persistent(value));
        self.record_write();
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, secs: u64) -> Result<(), StoreError> {
        let expires_at = Instant::now() + Duration::from_secs(secs);
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(expires_at),
            },
        );
        self.record_write();
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
