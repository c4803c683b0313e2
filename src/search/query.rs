//! Query engine / 查询引擎
//!
//! Two independent strategies:
//! - local: keyword patterns matched against the primary store
//! - external: ranking delegated to the provider, hits rehydrated from the store

use chrono::Utc;
use futures::future::join_all;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use super::pagination::{self, Pagination};
use super::provider::{ProviderHit, ProviderQuery, ProviderSearchResponse, ProviderState};
use super::schema::{source_id, SearchOptions};
use crate::content::{ContentStore, LocalFilter};
use crate::error::{Result, SearchError};
use crate::models::{ContentKind, ContentSummary};

/// Compiled size cap for one keyword pattern / 单个关键词正则的编译上限
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// External search output / 外部搜索结果
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExternalSearchResult {
    /// Provider response, unmodified / 原始响应
    Raw(ProviderSearchResponse),
    Paged {
        #[serde(flatten)]
        page: Pagination<ContentSummary>,
        raw: ProviderSearchResponse,
    },
}

/// Whitespace-separated terms as case-insensitive patterns / 关键词转为不区分大小写的正则
///
/// A term that is not a valid expression is matched literally.
pub fn keyword_patterns(keyword: &str) -> Vec<Regex> {
    keyword
        .split_whitespace()
        .filter_map(|term| {
            let build = |pattern: &str| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .size_limit(PATTERN_SIZE_LIMIT)
                    .build()
            };
            build(term).or_else(|_| build(&regex::escape(term))).ok()
        })
        .collect()
}

#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn ContentStore>,
    provider: ProviderState,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn ContentStore>, provider: ProviderState) -> Self {
        Self { store, provider }
    }

    /// Local pattern search over one kind / 本地搜索
    pub async fn search_content(
        &self,
        kind: ContentKind,
        options: &SearchOptions,
    ) -> Result<Pagination<ContentSummary>> {
        let options = options.clone().normalized();
        let filter = LocalFilter {
            patterns: keyword_patterns(&options.keyword),
            include_hidden: options.include_hidden,
            now: Utc::now(),
            page: options.page,
            size: options.size,
        };

        let page = if filter.patterns.is_empty() {
            crate::content::StorePage {
                docs: Vec::new(),
                total: 0,
                page: options.page,
                limit: options.size,
            }
        } else {
            self.store.search(kind, &filter).await?
        };

        Ok(pagination::from_store_page(page))
    }

    /// Provider search with rehydration / 外部搜索并回查主存储
    pub async fn search_external(&self, options: &SearchOptions) -> Result<ExternalSearchResult> {
        let provider = self.provider.require()?;
        let options = options.clone().normalized();

        let response = provider
            .search(&ProviderQuery {
                query: options.keyword.clone(),
                page: options.page - 1,
                hits_per_page: options.size,
            })
            .await?;

        if options.raw_external {
            return Ok(ExternalSearchResult::Raw(response));
        }

        // segments of one document collapse into a single result
        let mut seen = HashSet::new();
        let hits: Vec<&ProviderHit> = response
            .hits
            .iter()
            .filter(|hit| {
                seen.insert((
                    hit.kind.clone().unwrap_or_default(),
                    source_id(&hit.object_id).to_string(),
                ))
            })
            .collect();

        let lookups = join_all(hits.into_iter().map(|hit| self.rehydrate(hit))).await;

        let mut data = Vec::with_capacity(lookups.len());
        for lookup in lookups {
            match lookup {
                Ok(summary) => data.push(summary),
                Err(e @ SearchError::RehydrationMiss { .. }) => {
                    tracing::debug!("Dropping search hit: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        let page = pagination::from_external(
            data,
            response.nb_hits,
            response.nb_pages,
            response.page,
            response.hits_per_page,
        );
        Ok(ExternalSearchResult::Paged { page, raw: response })
    }

    async fn rehydrate(&self, hit: &ProviderHit) -> Result<ContentSummary> {
        let id = source_id(&hit.object_id);
        let raw_kind = hit.kind.as_deref().unwrap_or_default();
        let kind = ContentKind::from_str(raw_kind).map_err(|_| SearchError::RehydrationMiss {
            kind: raw_kind.to_string(),
            id: id.to_string(),
        })?;

        self.store
            .find_summary(kind, id)
            .await?
            .ok_or_else(|| SearchError::miss(kind, id))
    }
}
