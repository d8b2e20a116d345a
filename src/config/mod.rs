use std::env;
use std::time::Duration;

use crate::cache::models::{FailurePolicy, RefreshPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    /// 未配置时使用进程内存储，仅适合单实例运行
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub products_cache_ttl_secs: u64,
    pub products_cache_refresh: RefreshPolicy,
    pub rate_limit_fail_open: bool,
    pub catalog_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            products_cache_ttl_secs: 20,
            products_cache_refresh: RefreshPolicy::OnMiss,
            rate_limit_fail_open: false,
            catalog_latency_ms: 2000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let redis_url = match env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => Some(url),
            Ok(_) | Err(env::VarError::NotPresent) => None,
            Err(e) => return Err(e),
        };

        Ok(Config {
            redis_url,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            products_cache_ttl_secs: parse_or(
                "PRODUCTS_CACHE_TTL",
                defaults.products_cache_ttl_secs,
            ),
            products_cache_refresh: env::var("PRODUCTS_CACHE_REFRESH")
                .map(|v| RefreshPolicy::from_config(&v))
                .unwrap_or(defaults.products_cache_refresh),
            rate_limit_fail_open: env::var("RATE_LIMIT_FAIL_OPEN")
                .ok()
                .map(|v| parse_flag("RATE_LIMIT_FAIL_OPEN", &v, defaults.rate_limit_fail_open))
                .unwrap_or(defaults.rate_limit_fail_open),
            catalog_latency_ms: parse_or("CATALOG_LATENCY_MS", defaults.catalog_latency_ms),
        })
    }

    pub fn products_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.products_cache_ttl_secs)
    }

    pub fn catalog_latency(&self) -> Duration {
        Duration::from_millis(self.catalog_latency_ms)
    }

    pub fn rate_limit_failure_policy(&self) -> FailurePolicy {
        if self.rate_limit_fail_open {
            FailurePolicy::Open
        } else {
            FailurePolicy::Closed
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 解析开关类配置，无法识别的值记录告警并使用默认值
fn parse_flag(name: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        other => {
            tracing::warn!(
                var = name,
                value = other,
                fallback = default,
                "Unrecognized flag value, using default"
            );
            default
        }
    }
}
