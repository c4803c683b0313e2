//! Error taxonomy / 错误分类
//!
//! Library code returns `SearchError`; the binary converts to `anyhow` at the edge.

use thiserror::Error;

use crate::models::ContentKind;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Provider disabled or missing credentials / 外部搜索未启用或配置不完整
    #[error("search provider configuration error: {0}")]
    Configuration(String),

    /// Byte ceiling leaves no room for text / 字节上限不足以容纳正文
    #[error("document {id}: fixed overhead of {overhead} bytes leaves no text budget under max {max_bytes} bytes")]
    ChunkingInvariant {
        id: String,
        overhead: usize,
        max_bytes: usize,
    },

    /// 读取主存储失败
    #[error("content store read failed: {0}")]
    StoreRead(#[from] sqlx::Error),

    /// replace / settings call failed
    #[error("search provider write failed: {0}")]
    ProviderWrite(String),

    #[error("search provider query failed: {0}")]
    ProviderQuery(String),

    /// Hit points at a record the store no longer has / 命中记录在主存储中不存在
    #[error("no {kind} record with id {id}")]
    RehydrationMiss { kind: String, id: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, SearchError::Configuration(_))
    }

    pub(crate) fn miss(kind: ContentKind, id: &str) -> Self {
        SearchError::RehydrationMiss {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
