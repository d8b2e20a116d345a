use std::time::Duration;

/// 缓存写入时机
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// 仅在未命中、重新生成数据后写入
    #[default]
    OnMiss,
    /// 每次读取都写入，命中时刷新过期时间
    Always,
}

impl RefreshPolicy {
    /// 解析配置值，`always` 之外的取值都视为 `OnMiss`
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => RefreshPolicy::Always,
            _ => RefreshPolicy::OnMiss,
        }
    }
}

/// 单个路由的缓存策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// `None` 表示缓存项一直保留，直到被覆盖或删除
    pub ttl: Option<Duration>,
    pub refresh: RefreshPolicy,
}

impl CachePolicy {
    /// 不过期，只在未命中时写入
    pub fn persistent() -> Self {
        Self::default()
    }

    /// 带过期时间，只在未命中时写入
    pub fn expiring(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            refresh: RefreshPolicy::OnMiss,
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Hit,
    Miss,
}

impl CacheSource {
    /// `x-cache` 响应头取值
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Hit => "HIT",
            CacheSource::Miss => "MISS",
        }
    }
}

/// 读取结果，附带来源以便区分命中与未命中
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub source: CacheSource,
}

impl<T> Cached<T> {
    pub fn is_hit(&self) -> bool {
        self.source == CacheSource::Hit
    }
}
