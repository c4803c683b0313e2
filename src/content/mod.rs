//! Primary content store seam / 主内容存储接口
//!
//! The store only exposes typed reads; writes and validation belong to the content layer.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::Result;
use crate::models::{ArticleRecord, ContentKind, ContentSummary, NoteRecord, PageRecord};

pub use sqlite::SqliteContentStore;

/// Keyword filter for local search / 本地搜索过滤条件
#[derive(Debug, Clone)]
pub struct LocalFilter {
    /// Any pattern matching title or text selects the record / 任一关键词命中即可
    pub patterns: Vec<Regex>,
    /// Include hidden notes / 是否包含隐藏的随记
    pub include_hidden: bool,
    /// Notes scheduled after this instant are excluded / 定时发布时间晚于此刻的随记不可见
    pub now: DateTime<Utc>,
    pub page: u32,
    pub size: u32,
}

impl LocalFilter {
    pub fn matches(&self, title: &str, text: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.is_match(title) || p.is_match(text))
    }
}

/// Store-native paged result / 存储层分页结果
#[derive(Debug, Clone)]
pub struct StorePage<T> {
    pub docs: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All articles with their category / 全部文章
    async fn list_articles(&self) -> Result<Vec<ArticleRecord>>;

    /// All pages / 全部页面
    async fn list_pages(&self) -> Result<Vec<PageRecord>>;

    /// Notes visible to the public index: not hidden, no password, already published
    async fn list_public_notes(&self, now: DateTime<Utc>) -> Result<Vec<NoteRecord>>;

    /// Keyword search over one kind / 按类型本地搜索
    async fn search(
        &self,
        kind: ContentKind,
        filter: &LocalFilter,
    ) -> Result<StorePage<ContentSummary>>;

    /// Summary of one record by store id / 按ID查询摘要
    async fn find_summary(&self, kind: ContentKind, id: &str) -> Result<Option<ContentSummary>>;
}
