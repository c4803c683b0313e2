use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use folio_search::models::ContentSummary;
use folio_search::search::{ExternalSearchResult, Pagination};

use super::types::*;
use crate::api::{error_response, ApiError, ApiResponse};
use crate::state::AppState;

/// GET /api/search/local/:kind - 本地搜索（不含隐藏内容）
pub async fn search_local(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Pagination<ContentSummary>>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let result = state
        .engine
        .search_content(kind, &query.into_options(false))
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/search/external - 外部搜索
pub async fn search_external(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<ExternalSearchResult>>, ApiError> {
    let result = state
        .engine
        .search_external(&query.into_options(false))
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(result)))
}
