//! SQLite content store / SQLite 内容存储
//!
//! Keyword patterns are regular expressions, so matching happens in Rust over the
//! visibility-filtered candidate rows; SQLite has no built-in REGEXP.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::SqlitePool;

use super::{ContentStore, LocalFilter, StorePage};
use crate::error::Result;
use crate::models::{ArticleRecord, ContentKind, ContentSummary, NoteRecord, PageRecord};

#[derive(Clone)]
pub struct SqliteContentStore {
    db: SqlitePool,
}

/// Local search candidate / 本地搜索候选行
#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: String,
    title: String,
    text: String,
    created: String,
    modified: Option<String>,
    slug: Option<String>,
    category_id: Option<String>,
    nid: Option<i64>,
    public_at: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: String,
    nid: i64,
    title: String,
    text: String,
    public_at: Option<String>,
}

impl CandidateRow {
    fn into_summary(self, kind: ContentKind) -> ContentSummary {
        ContentSummary {
            id: self.id,
            kind: Some(kind),
            title: self.title,
            created: self.created,
            modified: self.modified,
            slug: self.slug,
            category_id: self.category_id,
            nid: self.nid,
        }
    }
}

/// Unset or past publish time / 未设置定时发布或已到发布时间
///
/// An unparseable timestamp is treated as not yet published.
/// SQLite `datetime()` text without offset, read as UTC
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

fn is_published(public_at: Option<&str>, now: DateTime<Utc>) -> bool {
    match public_at.map(str::trim) {
        None | Some("") => true,
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(ts, SQLITE_DATETIME)
                    .map(|t| Utc.from_utc_datetime(&t))
            })
            .map(|t| t <= now)
            .unwrap_or(false),
    }
}

const NOTE_NO_PASSWORD: &str = "(password IS NULL OR password = '')";

impl SqliteContentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    async fn candidates(
        &self,
        kind: ContentKind,
        include_hidden: bool,
    ) -> Result<Vec<CandidateRow>> {
        let rows = match kind {
            ContentKind::Article => {
                sqlx::query_as::<_, CandidateRow>(
                    "SELECT id, title, text, created, modified, slug, category_id, \
                     NULL AS nid, NULL AS public_at FROM posts ORDER BY created DESC",
                )
                .fetch_all(&self.db)
                .await?
            }
            ContentKind::Page => {
                sqlx::query_as::<_, CandidateRow>(
                    "SELECT id, title, text, created, modified, slug, NULL AS category_id, \
                     NULL AS nid, NULL AS public_at FROM pages ORDER BY created DESC",
                )
                .fetch_all(&self.db)
                .await?
            }
            ContentKind::Note => {
                let sql = format!(
                    "SELECT id, title, text, created, modified, NULL AS slug, NULL AS category_id, \
                     nid, public_at FROM notes WHERE {} AND (hidden = 0 OR ?) ORDER BY created DESC",
                    NOTE_NO_PASSWORD
                );
                sqlx::query_as::<_, CandidateRow>(&sql)
                    .bind(include_hidden)
                    .fetch_all(&self.db)
                    .await?
            }
        };
        Ok(rows)
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn list_articles(&self) -> Result<Vec<ArticleRecord>> {
        let rows = sqlx::query_as::<_, ArticleRecord>(
            r#"
            SELECT p.id, p.title, p.text, p.slug, p.category_id,
                   c.name AS category_name, c.slug AS category_slug
            FROM posts p
            LEFT JOIN categories c ON c.id = p.category_id
            ORDER BY p.created
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_pages(&self) -> Result<Vec<PageRecord>> {
        let rows = sqlx::query_as::<_, PageRecord>(
            "SELECT id, title, text, slug, subtitle FROM pages ORDER BY created",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_public_notes(&self, now: DateTime<Utc>) -> Result<Vec<NoteRecord>> {
        let sql = format!(
            "SELECT id, nid, title, text, public_at FROM notes WHERE hidden = 0 AND {} ORDER BY nid",
            NOTE_NO_PASSWORD
        );
        let rows = sqlx::query_as::<_, NoteRow>(&sql).fetch_all(&self.db).await?;

        Ok(rows
            .into_iter()
            .filter(|n| is_published(n.public_at.as_deref(), now))
            .map(|n| NoteRecord {
                id: n.id,
                nid: n.nid,
                title: n.title,
                text: n.text,
            })
            .collect())
    }

    async fn search(
        &self,
        kind: ContentKind,
        filter: &LocalFilter,
    ) -> Result<StorePage<ContentSummary>> {
        let rows = self.candidates(kind, filter.include_hidden).await?;

        let matched: Vec<CandidateRow> = rows
            .into_iter()
            .filter(|r| is_published(r.public_at.as_deref(), filter.now))
            .filter(|r| filter.matches(&r.title, &r.text))
            .collect();

        let total = matched.len() as u64;
        let page = filter.page.max(1);
        let skip = (page as usize - 1) * filter.size as usize;
        let docs = matched
            .into_iter()
            .skip(skip)
            .take(filter.size as usize)
            .map(|r| r.into_summary(kind))
            .collect();

        Ok(StorePage {
            docs,
            total,
            page,
            limit: filter.size,
        })
    }

    async fn find_summary(&self, kind: ContentKind, id: &str) -> Result<Option<ContentSummary>> {
        let sql = match kind {
            ContentKind::Article => {
                "SELECT id, title, created, modified, slug, category_id, NULL AS nid FROM posts WHERE id = ?"
            }
            ContentKind::Page => {
                "SELECT id, title, created, modified, slug, NULL AS category_id, NULL AS nid FROM pages WHERE id = ?"
            }
            ContentKind::Note => {
                "SELECT id, title, created, modified, NULL AS slug, NULL AS category_id, nid FROM notes WHERE id = ?"
            }
        };
        let summary = sqlx::query_as::<_, ContentSummary>(sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(summary.map(|s| s.tagged(kind)))
    }
}
