/// 首页
pub async fn hello() -> &'static str {
    "hello"
}
