//! Document normalizer / 文档归一化
//!
//! Best-effort removal of markup that should not be searchable. This is not an HTML
//! parser and must not be used for escaping.

use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::{CategoryRef, SearchableDocument};
use crate::models::{ArticleRecord, ContentKind, NoteRecord, PageRecord};

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style pattern"));

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script pattern"));

// ``` or ~~~ fences, up to the matching closing fence or end of text
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*(```|~~~)[^\n]*\n.*?(?:^[ \t]*(```|~~~)[ \t]*$|\z)")
        .expect("valid fence pattern")
});

/// Remove `<style>` and `<script>` blocks / 去除 style 与 script 块
pub fn strip_markup(text: &str) -> String {
    let without_style = STYLE_BLOCK.replace_all(text, "");
    SCRIPT_BLOCK.replace_all(&without_style, "").into_owned()
}

/// Remove fenced markdown code blocks / 去除 Markdown 代码块
pub fn strip_code_blocks(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

/// Raw record as read from the store / 从主存储读出的原始记录
#[derive(Debug, Clone)]
pub enum RawContent {
    Article(ArticleRecord),
    Page(PageRecord),
    Note(NoteRecord),
}

impl RawContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            RawContent::Article(_) => ContentKind::Article,
            RawContent::Page(_) => ContentKind::Page,
            RawContent::Note(_) => ContentKind::Note,
        }
    }
}

/// Convert a raw record into a `SearchableDocument` / 转换为可搜索文档
pub fn normalize(raw: RawContent) -> SearchableDocument {
    match raw {
        RawContent::Article(a) => {
            let category = match (a.category_name, a.category_slug) {
                (Some(name), Some(slug)) => Some(CategoryRef { name, slug }),
                _ => None,
            };
            SearchableDocument {
                id: a.id,
                kind: ContentKind::Article,
                title: a.title,
                text: strip_markup(&strip_code_blocks(&a.text)),
                slug: Some(a.slug),
                subtitle: None,
                nid: None,
                category_id: a.category_id,
                category,
            }
        }
        RawContent::Page(p) => SearchableDocument {
            id: p.id,
            kind: ContentKind::Page,
            title: p.title,
            text: strip_markup(&p.text),
            slug: Some(p.slug),
            subtitle: p.subtitle,
            nid: None,
            category_id: None,
            category: None,
        },
        RawContent::Note(n) => SearchableDocument {
            id: n.id,
            kind: ContentKind::Note,
            title: n.title,
            text: strip_markup(&n.text),
            slug: None,
            subtitle: None,
            nid: Some(n.nid),
            category_id: None,
            category: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_multiline_case_insensitive() {
        let text = "before<STYLE type=\"text/css\">\nbody { color: red }\n</style>middle<script>\nalert(1)\n</SCRIPT>after";
        assert_eq!(strip_markup(text), "beforemiddleafter");
    }

    #[test]
    fn test_strip_markup_non_greedy() {
        let text = "<script>a</script>keep<script>b</script>";
        assert_eq!(strip_markup(text), "keep");
    }

    #[test]
    fn test_strip_markup_leaves_unclosed() {
        let text = "x <script> never closed";
        assert_eq!(strip_markup(text), text);
    }

    #[test]
    fn test_strip_code_blocks() {
        let text = "intro\n```rust\nfn main() {}\n```\noutro";
        assert_eq!(strip_code_blocks(text), "intro\n\noutro");
        assert_eq!(strip_code_blocks("no fences"), "no fences");
    }

    #[test]
    fn test_normalize_note_keeps_store_id() {
        let doc = normalize(RawContent::Note(NoteRecord {
            id: "n-1".to_string(),
            nid: 7,
            title: "日记".to_string(),
            text: "今天<style>p{}</style>很好".to_string(),
        }));
        assert_eq!(doc.id, "n-1");
        assert_eq!(doc.public_id(), "7");
        assert_eq!(doc.kind, ContentKind::Note);
        assert_eq!(doc.text, "今天很好");
    }

    #[test]
    fn test_normalize_article_category() {
        let doc = normalize(RawContent::Article(ArticleRecord {
            id: "p-1".to_string(),
            title: "Post".to_string(),
            text: "body".to_string(),
            slug: "post".to_string(),
            category_id: Some("c-1".to_string()),
            category_name: Some("Tech".to_string()),
            category_slug: Some("tech".to_string()),
        }));
        assert_eq!(doc.public_id(), "p-1");
        assert_eq!(doc.category.unwrap().name, "Tech");
        assert_eq!(doc.category_id.as_deref(), Some("c-1"));
    }
}
