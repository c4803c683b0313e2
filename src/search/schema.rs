//! Search document schema / 搜索文档结构

use serde::{Deserialize, Serialize};

use crate::models::ContentKind;

/// Category reference carried by articles / 文章所属分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// Flat, normalized form of one content record / 归一化后的可搜索文档
///
/// `id` is always the store identifier of the source record.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchableDocument {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub text: String,
    pub slug: Option<String>,
    pub subtitle: Option<String>,
    /// Human-facing note number / 随记编号
    pub nid: Option<i64>,
    pub category_id: Option<String>,
    pub category: Option<CategoryRef>,
}

impl SearchableDocument {
    /// Externally visible id: the note number for notes, the store id otherwise
    pub fn public_id(&self) -> String {
        match self.nid {
            Some(nid) => nid.to_string(),
            None => self.id.clone(),
        }
    }
}

/// Record pushed to the external index / 推送到外部索引的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedUnit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    pub segment_index: usize,
}

impl IndexedUnit {
    /// Build segment `index` of `doc` carrying `text` / 构造第 index 段
    pub fn segment(doc: &SearchableDocument, index: usize, text: String) -> Self {
        Self {
            object_id: object_id(&doc.id, index),
            id: doc.public_id(),
            kind: doc.kind,
            title: doc.title.clone(),
            text,
            slug: doc.slug.clone(),
            subtitle: doc.subtitle.clone(),
            nid: doc.nid,
            category_id: doc.category_id.clone(),
            category: doc.category.clone(),
            segment_index: index,
        }
    }
}

pub fn object_id(source_id: &str, index: usize) -> String {
    format!("{}_{}", source_id, index)
}

/// Strip the `_{segment}` suffix from an object id / 去掉分段后缀，得到源记录ID
pub fn source_id(object_id: &str) -> &str {
    match object_id.rsplit_once('_') {
        Some((base, suffix))
            if !base.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => object_id,
    }
}

pub const MAX_PAGE_SIZE: u32 = 50;

/// Search query options / 搜索查询选项
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub keyword: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default, alias = "raw")]
    pub raw_external: bool,
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

impl SearchOptions {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            page: default_page(),
            size: default_size(),
            raw_external: false,
            include_hidden: false,
        }
    }

    pub fn with_page(mut self, page: u32, size: u32) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw_external = raw;
        self
    }

    /// Clamp paging into a valid window / 规范化分页参数
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.size = self.size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Whitespace separated terms, OR-matched / 按空白切分的关键词
    pub fn terms(&self) -> Vec<&str> {
        self.keyword.split_whitespace().collect()
    }

    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.size as usize
    }
}
