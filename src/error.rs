use axum::{http::StatusCode, response::IntoResponse};

use crate::storage::StoreError;

pub type Result<T> = core::result::Result<T, Error>;

/// 核心服务错误
///
/// - [`Error::Validation`]：请求参数不合法，在进入查询构造之前失败
/// - [`Error::StoreUnavailable`]：后端存储不可用或出错，不在内部重试
/// - [`Error::NotFound`]：slug/id 没有对应记录（空列表不算错误）
///
/// 游标损坏不属于错误，见 [`crate::catalog::Cursor::decode`]。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),

    #[error("not found")]
    NotFound,
}

/// 约束冲突是调用方的问题，按 [`Error::Validation`] 处理；其余存储错误都视为不可用
impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => Error::Validation(msg),
            other => Error::StoreUnavailable(other),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        StoreError::from(e).into()
    }
}

/// 启动失败
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("failed to connect database: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Error::NotFound => (StatusCode::NOT_FOUND, "NOT FOUND").into_response(),
            Error::StoreUnavailable(e) => {
                tracing::error!(%e, "store error");
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
            }
            .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::from(StoreError::Offline("down".into()))
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_conflict_maps_to_validation() {
        let e = Error::from(StoreError::Conflict("slug taken".into()));
        assert!(matches!(e, Error::Validation(msg) if msg == "slug taken"));
    }
}
