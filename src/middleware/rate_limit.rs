use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    cache::{RateLimitDecision, RateLimiter},
    error::AppError,
};

/// 无法识别客户端时使用的标识，这类请求共用同一个计数桶
pub const UNKNOWN_CLIENT: &str = "unknown";

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// 解析客户端标识
///
/// 依次尝试 `x-real-ip`、`x-forwarded-for` 的第一个非空地址、连接的对端地址。
/// 都拿不到时返回 `UNKNOWN_CLIENT`。
pub fn client_identity(req: &Request<Body>) -> String {
    // 从连接信息获取原始IP
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref()) // 降级使用连接IP
        .unwrap_or(UNKNOWN_CLIENT)
        .trim()
        .to_string()
}

/// 路由级限流中间件
///
/// 超出限制时返回 429，正文包含距离窗口重置的秒数；存储故障按限流器的
/// `FailurePolicy` 处理，关闭策略下返回 503。
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identity = client_identity(&req);
    tracing::debug!(identity = %identity, resource = %limiter.config().resource, "Checking rate limit");

    let decision = limiter.handle(&identity).await?;
    match decision {
        RateLimitDecision::Admitted { remaining, .. } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(
                RATE_LIMIT_LIMIT,
                HeaderValue::from(limiter.config().limit),
            );
            headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            Ok(response)
        }
        RateLimitDecision::Rejected {
            retry_after_secs, ..
        } => {
            let reset_at = decision
                .reset_at()
                .map(|at| at.timestamp())
                .unwrap_or_default();
            Ok((
                StatusCode::TOO_MANY_REQUESTS,
                [
                    (header::RETRY_AFTER, HeaderValue::from(retry_after_secs)),
                    (RATE_LIMIT_RESET, HeaderValue::from(reset_at)),
                ],
                format!(
                    "too many requests, please try again after {} seconds",
                    retry_after_secs
                ),
            )
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/products")
    }

    #[test]
    fn prefers_real_ip_header() {
        let req = request()
            .header("x-real-ip", "203.0.113.9")
            .header("x-forwarded-for", "198.51.100.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identity(&req), "203.0.113.9");
    }

    #[test]
    fn uses_first_forwarded_address() {
        let req = request()
            .header("x-forwarded-for", " , 198.51.100.1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identity(&req), "198.51.100.1");
    }

    #[test]
    fn falls_back_to_connection_address() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 51000))));
        assert_eq!(client_identity(&req), "192.0.2.4");
    }

    #[test]
    fn unidentified_clients_share_a_bucket() {
        let req = request().body(Body::empty()).unwrap();
        assert_eq!(client_identity(&req), UNKNOWN_CLIENT);
    }
}
