/// 限流计数键后缀
const REQUEST_COUNT_SUFFIX: &str = "request_count";

/// 生成限流计数键：客户端标识 + 资源标签 + 固定后缀
pub fn rate_limit_key(identity: &str, resource: &str) -> String {
    format!("{}:{}:{}", identity, resource, REQUEST_COUNT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_scoped_by_identity_and_resource() {
        assert_eq!(
            rate_limit_key("10.0.0.1", "products"),
            "10.0.0.1:products:request_count"
        );
        assert_ne!(
            rate_limit_key("10.0.0.1", "products"),
            rate_limit_key("10.0.0.1", "home")
        );
    }
}
