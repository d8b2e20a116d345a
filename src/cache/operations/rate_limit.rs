use std::sync::Arc;

use crate::cache::keys::rate_limit_key;
use crate::cache::models::rate_limit::{FailurePolicy, RateLimitConfig, RateLimitDecision};
use crate::cache::store::{KeyTtl, KeyValueStore, StoreError};

/// 速率限制器
///
/// 每个 客户端标识 + 资源标签 对应一个计数键。计数键在第一次自增时设置过期时间，
/// 之后的请求只自增不续期，窗口到期后计数从 1 重新开始。
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    config: RateLimitConfig,
    failure_policy: FailurePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 对一次请求做限流判定
    ///
    /// 存储出错时按 `FailurePolicy` 处理：`Closed` 把错误返回给调用方，
    /// `Open` 记录告警后放行。
    pub async fn handle(&self, identity: &str) -> Result<RateLimitDecision, StoreError> {
        match self.check(identity).await {
            Ok(decision) => Ok(decision),
            Err(e) => match self.failure_policy {
                FailurePolicy::Closed => Err(e),
                FailurePolicy::Open => {
                    tracing::warn!(
                        resource = %self.config.resource,
                        identity,
                        error = %e,
                        "Rate limit store unavailable, admitting request"
                    );
                    Ok(RateLimitDecision::Admitted {
                        count: 0,
                        remaining: self.config.limit,
                    })
                }
            },
        }
    }

    async fn check(&self, identity: &str) -> Result<RateLimitDecision, StoreError> {
        let key = rate_limit_key(identity, &self.config.resource);
        let window_secs = self.config.window_secs().max(1);

        let count = self.store.incr(&key).await?;

        // 只有创建计数键的请求设置过期时间，否则每次请求都会把窗口往后推
        if count == 1 {
            self.store.expire(&key, window_secs).await?;
        }

        let retry_after_secs = match self.store.ttl(&key).await? {
            // Redis 对剩余不足一秒的键返回 0
            KeyTtl::Expires(secs) => secs.max(1),
            KeyTtl::Persistent => {
                // 创建请求的 EXPIRE 没有落地，补设一次，避免计数键永不过期
                tracing::warn!(key = %key, "Rate limit counter has no expiry, re-arming window");
                self.store.expire(&key, window_secs).await?;
                window_secs
            }
            // 自增与查询之间窗口恰好到期
            KeyTtl::Missing => window_secs,
        };

        let limit = i64::from(self.config.limit);
        if count > limit {
            tracing::info!(
                resource = %self.config.resource,
                identity,
                count,
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Ok(RateLimitDecision::Rejected {
                count,
                retry_after_secs,
            });
        }

        Ok(RateLimitDecision::Admitted {
            count,
            remaining: (limit - count) as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use futures_util::future::join_all;

    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::cache::store::testing::FlakyStore;

    fn limiter(store: Arc<dyn KeyValueStore>, limit: u32, window: u64) -> RateLimiter {
        RateLimiter::new(store, RateLimitConfig::new(limit, window, "products"))
    }

    #[tokio::test(start_paused = true)]
    async fn admits_first_limit_requests_then_rejects() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store, 5, 20);

        for expected in 1..=5 {
            let decision = limiter.handle("10.0.0.1").await.unwrap();
            assert_eq!(
                decision,
                RateLimitDecision::Admitted {
                    count: expected,
                    remaining: 5 - expected as u32,
                }
            );
        }

        match limiter.handle("10.0.0.1").await.unwrap() {
            RateLimitDecision::Rejected {
                count,
                retry_after_secs,
            } => {
                assert_eq!(count, 6);
                assert!(retry_after_secs > 0 && retry_after_secs <= 20);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn identities_and_resources_have_separate_buckets() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let products = limiter(store.clone(), 1, 20);
        let home = RateLimiter::new(store, RateLimitConfig::new(1, 20, "home"));

        assert!(products.handle("10.0.0.1").await.unwrap().is_admitted());
        assert!(!products.handle("10.0.0.1").await.unwrap().is_admitted());
        assert!(products.handle("10.0.0.2").await.unwrap().is_admitted());
        assert!(home.handle("10.0.0.1").await.unwrap().is_admitted());
    }

    #[tokio::test(start_paused = true)]
    async fn counter_resets_after_window() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store, 2, 20);

        for _ in 0..3 {
            limiter.handle("10.0.0.1").await.unwrap();
        }
        assert!(!limiter.handle("10.0.0.1").await.unwrap().is_admitted());

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(
            limiter.handle("10.0.0.1").await.unwrap(),
            RateLimitDecision::Admitted {
                count: 1,
                remaining: 1,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn window_is_not_extended_by_later_requests() {
        let store = Arc::new(FlakyStore::default());
        let limiter = limiter(store.clone(), 100, 20);

        limiter.handle("10.0.0.1").await.unwrap();
        tokio::time::advance(Duration::from_secs(15)).await;
        limiter.handle("10.0.0.1").await.unwrap();
        limiter.handle("10.0.0.1").await.unwrap();

        assert_eq!(store.expire_calls.load(Ordering::SeqCst), 1);
        let key = rate_limit_key("10.0.0.1", "products");
        assert_eq!(store.inner.ttl(&key).await.unwrap(), KeyTtl::Expires(5));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.inner.ttl(&key).await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_the_incremented_key() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), 5, 20);

        limiter.handle("10.0.0.1").await.unwrap();

        let key = rate_limit_key("10.0.0.1", "products");
        assert_eq!(store.ttl(&key).await.unwrap(), KeyTtl::Expires(20));
        assert_eq!(store.ttl("products").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn counter_without_expiry_is_rearmed() {
        let store = Arc::new(MemoryStore::new());
        let key = rate_limit_key("10.0.0.1", "products");
        // 模拟创建请求的 EXPIRE 丢失
        store.incr(&key).await.unwrap();

        let limiter = limiter(store.clone(), 5, 20);
        let decision = limiter.handle("10.0.0.1").await.unwrap();

        assert_eq!(
            decision,
            RateLimitDecision::Admitted {
                count: 2,
                remaining: 3,
            }
        );
        assert_eq!(store.ttl(&key).await.unwrap(), KeyTtl::Expires(20));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_at_least_one_second() {
        let store = Arc::new(FlakyStore::default());
        let limiter = limiter(store.clone(), 1, 20);
        limiter.handle("10.0.0.1").await.unwrap();

        store.zero_ttl.store(true, Ordering::SeqCst);
        assert_eq!(
            limiter.handle("10.0.0.1").await.unwrap(),
            RateLimitDecision::Rejected {
                count: 2,
                retry_after_secs: 1,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_observe_distinct_counts() {
        let store = Arc::new(MemoryStore::new());
        let limiter = Arc::new(limiter(store, 1000, 60));

        let tasks = (0..64).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.handle("10.0.0.1").await })
        });

        let mut counts: Vec<i64> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| match joined.unwrap().unwrap() {
                RateLimitDecision::Admitted { count, .. } => count,
                RateLimitDecision::Rejected { count, .. } => count,
            })
            .collect();
        counts.sort_unstable();

        assert_eq!(counts, (1..=64).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn store_failure_fails_closed_by_default() {
        let store = Arc::new(FlakyStore::default());
        store.fail_counters.store(true, Ordering::SeqCst);
        let limiter = limiter(store, 5, 20);

        let err = limiter.handle("10.0.0.1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn store_failure_admits_when_fail_open() {
        let store = Arc::new(FlakyStore::default());
        store.fail_counters.store(true, Ordering::SeqCst);
        let limiter = limiter(store, 5, 20).with_failure_policy(FailurePolicy::Open);

        let decision = limiter.handle("10.0.0.1").await.unwrap();
        assert_eq!(
            decision,
            RateLimitDecision::Admitted {
                count: 0,
                remaining: 5,
            }
        );
    }
}
