use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::cache::{CacheError, StoreError};

#[derive(Debug, Error)]
pub enum AppError {
    /// 共享存储不可用
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// 商品数据源失败
    #[error("upstream failed: {0}")]
    Upstream(String),

    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Store(e) => AppError::StoreUnavailable(e),
            CacheError::Producer(e) => AppError::Upstream(e.to_string()),
            CacheError::Encode(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            code: status.as_u16() as i32,
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_errors_map_to_statuses() {
        let store = AppError::from(CacheError::Store(StoreError::Unavailable("down".into())));
        assert_eq!(store.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let upstream = AppError::from(CacheError::Producer("timeout".into()));
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
