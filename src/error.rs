use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Carries the full body so lookups can echo their query.
    #[error("not found")]
    NotFound(Value),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Analysis(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn upstream(err: &anyhow::Error) -> Self {
        ApiError::Upstream(format!("{err:#}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Analysis(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ApiError::NotFound(body) => body.clone(),
            ApiError::Analysis(reason) => json!({"status": "ERROR", "reason": reason}),
            other => json!({"error": other.to_string()}),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_errors_use_status_shape() {
        let err = ApiError::Analysis("invalid goal line NaN".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["status"], "ERROR");
        assert_eq!(err.body()["reason"], "invalid goal line NaN");
    }

    #[test]
    fn upstream_errors_keep_context_chain() {
        let inner = anyhow::anyhow!("http 500").context("GET /fixtures failed");
        let err = ApiError::upstream(&inner);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.body()["error"], "GET /fixtures failed: http 500");
    }
}
