//! Test fixtures: in-memory store and a recording provider / 测试辅助

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::content::SqliteContentStore;
use crate::db::run_migrations;
use crate::error::{Result, SearchError};
use crate::search::provider::{IndexSettings, ProviderQuery, ProviderSearchResponse, SearchProvider};
use crate::search::schema::IndexedUnit;

/// Single-connection in-memory pool; separate connections would see separate databases
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub(crate) async fn store() -> SqliteContentStore {
    SqliteContentStore::new(memory_pool().await)
}

pub(crate) async fn insert_article(
    store: &SqliteContentStore,
    id: &str,
    title: &str,
    text: &str,
    category: Option<(&str, &str, &str)>,
) {
    if let Some((cid, name, slug)) = category {
        sqlx::query("INSERT OR IGNORE INTO categories (id, name, slug) VALUES (?, ?, ?)")
            .bind(cid)
            .bind(name)
            .bind(slug)
            .execute(store.pool())
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO posts (id, title, text, slug, category_id, created) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(text)
        .bind(id)
        .bind(category.map(|(cid, _, _)| cid))
        .bind(Utc::now().to_rfc3339())
        .execute(store.pool())
        .await
        .unwrap();
}

pub(crate) async fn insert_page(
    store: &SqliteContentStore,
    id: &str,
    title: &str,
    text: &str,
    subtitle: Option<&str>,
) {
    sqlx::query("INSERT INTO pages (id, title, subtitle, text, slug, created) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(subtitle)
        .bind(text)
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .execute(store.pool())
        .await
        .unwrap();
}

pub(crate) struct NoteSeed {
    id: String,
    nid: i64,
    title: String,
    text: String,
    hidden: bool,
    password: Option<String>,
    public_at: Option<String>,
}

impl NoteSeed {
    pub(crate) fn new(id: &str, nid: i64, title: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            nid,
            title: title.to_string(),
            text: text.to_string(),
            hidden: false,
            password: None,
            public_at: None,
        }
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub(crate) fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub(crate) fn public_at(mut self, at: &str) -> Self {
        self.public_at = Some(at.to_string());
        self
    }
}

pub(crate) async fn insert_note(store: &SqliteContentStore, seed: NoteSeed) {
    sqlx::query(
        "INSERT INTO notes (id, nid, title, text, hidden, password, public_at, created) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&seed.id)
    .bind(seed.nid)
    .bind(&seed.title)
    .bind(&seed.text)
    .bind(seed.hidden)
    .bind(&seed.password)
    .bind(&seed.public_at)
    .bind(Utc::now().to_rfc3339())
    .execute(store.pool())
    .await
    .unwrap();
}

/// Provider that records calls and serves a canned response / 记录调用的内存服务
#[derive(Default)]
pub(crate) struct MemoryProvider {
    pub replaced: Mutex<Vec<Vec<IndexedUnit>>>,
    pub settings: Mutex<Vec<IndexSettings>>,
    pub queries: Mutex<Vec<ProviderQuery>>,
    pub response: Mutex<Option<ProviderSearchResponse>>,
    pub fail_replace: AtomicBool,
    pub fail_settings: AtomicBool,
    pub replace_delay: Option<Duration>,
}

impl MemoryProvider {
    pub(crate) fn with_response(response: ProviderSearchResponse) -> Self {
        let provider = Self::default();
        *provider.response.lock() = Some(response);
        provider
    }

    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            replace_delay: Some(delay),
            ..Default::default()
        }
    }

    pub(crate) fn replace_count(&self) -> usize {
        self.replaced.lock().len()
    }
}

#[async_trait]
impl SearchProvider for MemoryProvider {
    async fn replace_all_objects(&self, units: &[IndexedUnit]) -> Result<()> {
        if let Some(delay) = self.replace_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(SearchError::ProviderWrite("replace rejected".to_string()));
        }
        self.replaced.lock().push(units.to_vec());
        Ok(())
    }

    async fn set_settings(&self, settings: &IndexSettings) -> Result<()> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(SearchError::ProviderWrite("settings rejected".to_string()));
        }
        self.settings.lock().push(settings.clone());
        Ok(())
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderSearchResponse> {
        self.queries.lock().push(query.clone());
        self.response
            .lock()
            .clone()
            .ok_or_else(|| SearchError::ProviderQuery("no canned response".to_string()))
    }
}
