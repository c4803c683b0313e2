pub mod search;
pub mod server;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use folio_search::SearchError;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: StatusCode, message: &str) -> Self {
        Self {
            code: code.as_u16() as i32,
            message: message.to_string(),
            data: None,
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(StatusCode::BAD_REQUEST, message)),
    )
}

/// 配置错误返回400，其余返回500
pub fn error_response(e: SearchError) -> ApiError {
    let status = if e.is_configuration() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Search request failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::error(status, &e.to_string())))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/search/local/:kind", get(search::query::search_local))
        .route("/api/search/external", get(search::query::search_external))
        .route("/api/admin/search/local/:kind", get(search::admin::search_local))
        .route("/api/admin/search/push", post(search::admin::push_index))
        .route("/api/admin/search/notify", post(search::admin::notify))
        .route("/api/admin/search/status", get(search::admin::status))
        .with_state(state)
}
