use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content kind / 内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    Page,
    Note,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Article, ContentKind::Page, ContentKind::Note];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Page => "page",
            ContentKind::Note => "note",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    /// Accepts `post` as an alias of `article` / 兼容旧的 post 类型名
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "article" | "post" => Ok(ContentKind::Article),
            "page" => Ok(ContentKind::Page),
            "note" => Ok(ContentKind::Note),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// Article row joined with its category / 文章（含分类）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

/// 独立页面
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub subtitle: Option<String>,
}

/// Note row / 随记
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteRecord {
    pub id: String,
    pub nid: i64,
    pub title: String,
    pub text: String,
}

/// Search result item without the body text / 搜索结果摘要（不含正文）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: String,
    #[serde(rename = "type")]
    #[sqlx(skip)]
    pub kind: Option<ContentKind>,
    pub title: String,
    pub created: String,
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nid: Option<i64>,
}

impl ContentSummary {
    pub fn tagged(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }
}
