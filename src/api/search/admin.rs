//! Admin search routes; mounted behind the host's auth layer / 管理接口

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use folio_search::models::ContentSummary;
use folio_search::search::Pagination;
use folio_search::sync::{SyncOutcome, SyncTrigger};

use super::types::*;
use crate::api::{error_response, ApiError, ApiResponse};
use crate::state::AppState;

/// GET /api/admin/search/local/:kind - 本地搜索（可包含隐藏随记）
pub async fn search_local(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Pagination<ContentSummary>>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let result = state
        .engine
        .search_content(kind, &query.into_options(true))
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/admin/search/push - 手动推送索引
pub async fn push_index(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SyncOutcome>>, ApiError> {
    let outcome = state
        .synchronizer
        .run_guarded(SyncTrigger::Admin)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /api/admin/search/notify - 内容变更通知
pub async fn notify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NotifyRequest>,
) -> Json<ApiResponse<NotifyResponse>> {
    let accepted = state.events.emit(req.event);
    Json(ApiResponse::success(NotifyResponse { accepted }))
}

/// GET /api/admin/search/status - 推送状态
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PushStatus>> {
    Json(ApiResponse::success(PushStatus {
        enabled: state.synchronizer.provider().is_enabled(),
        progress: state.synchronizer.status().get_progress(),
    }))
}
