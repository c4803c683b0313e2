//! Content selector / 内容选择器
//!
//! Reads each content kind from the store and normalizes it for the public index.

use chrono::Utc;
use std::sync::Arc;

use super::normalizer::{normalize, RawContent};
use super::schema::SearchableDocument;
use crate::content::ContentStore;
use crate::error::Result;

#[derive(Clone)]
pub struct ContentSelector {
    store: Arc<dyn ContentStore>,
}

impl ContentSelector {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// 全部文章（含分类名）
    pub async fn select_articles(&self) -> Result<Vec<SearchableDocument>> {
        let rows = self.store.list_articles().await?;
        Ok(rows.into_iter().map(|r| normalize(RawContent::Article(r))).collect())
    }

    /// 全部页面
    pub async fn select_pages(&self) -> Result<Vec<SearchableDocument>> {
        let rows = self.store.list_pages().await?;
        Ok(rows.into_iter().map(|r| normalize(RawContent::Page(r))).collect())
    }

    /// Notes for the public index / 推送到公开索引的随记
    ///
    /// Hidden, password-protected and not yet published notes are never selected; the
    /// caller's hidden-visibility preference only applies to local search.
    pub async fn select_notes(&self) -> Result<Vec<SearchableDocument>> {
        let rows = self.store.list_public_notes(Utc::now()).await?;
        Ok(rows.into_iter().map(|r| normalize(RawContent::Note(r))).collect())
    }

    /// All three kinds, read concurrently / 并发读取三类内容
    pub async fn select_all(&self) -> Result<Vec<SearchableDocument>> {
        let (articles, pages, notes) = tokio::try_join!(
            self.select_articles(),
            self.select_pages(),
            self.select_notes()
        )?;

        let mut docs = Vec::with_capacity(articles.len() + pages.len() + notes.len());
        docs.extend(articles);
        docs.extend(pages);
        docs.extend(notes);
        Ok(docs)
    }
}
