use serde::{Deserialize, Serialize};
use std::str::FromStr;

use folio_search::events::SearchEvent;
use folio_search::models::ContentKind;
use folio_search::search::SearchOptions;
use folio_search::sync::SyncProgress;

use crate::api::{bad_request, ApiError};

/// Query string of the search endpoints / 搜索参数
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    /// 返回外部搜索原始响应
    #[serde(default)]
    pub raw: bool,
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

impl SearchQuery {
    /// `allow_hidden` is false on public routes / 公开接口不允许查看隐藏内容
    pub fn into_options(self, allow_hidden: bool) -> SearchOptions {
        SearchOptions::new(self.keyword)
            .with_page(self.page, self.size)
            .raw(self.raw)
            .include_hidden(allow_hidden && self.include_hidden)
    }
}

pub fn parse_kind(kind: &str) -> Result<ContentKind, ApiError> {
    ContentKind::from_str(kind).map_err(|e| bad_request(&e))
}

/// 推送状态
#[derive(Debug, Serialize)]
pub struct PushStatus {
    pub enabled: bool,
    pub progress: SyncProgress,
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub event: SearchEvent,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub accepted: bool,
}
