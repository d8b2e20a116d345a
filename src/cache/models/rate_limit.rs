use std::time::Duration;

use chrono::{DateTime, Utc};

/// 单个路由的限流配置，注册路由时给定，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// 窗口内允许的最大请求数
    pub limit: u32,
    /// 窗口长度
    pub window: Duration,
    /// 资源标签，参与计数键的拼接
    pub resource: String,
}

impl RateLimitConfig {
    pub fn new(limit: u32, window_secs: u64, resource: impl Into<String>) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
            resource: resource.into(),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// 存储不可用时限流器的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 放行请求并记录告警
    Open,
    /// 请求失败，错误交给调用方
    #[default]
    Closed,
}

/// 限流判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Admitted {
        /// 本次请求在窗口内的序号
        count: i64,
        /// 窗口内还可以发起的请求数
        remaining: u32,
    },
    Rejected {
        count: i64,
        /// 距离窗口重置的秒数
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateLimitDecision::Admitted { .. })
    }

    /// 窗口重置的时间点，供响应头使用
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RateLimitDecision::Rejected {
                retry_after_secs, ..
            } => Some(Utc::now() + chrono::Duration::seconds(*retry_after_secs as i64)),
            RateLimitDecision::Admitted { .. } => None,
        }
    }
}
