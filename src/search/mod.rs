//! Search module / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Search only exposes primitives: select, chunk, push, query
//! - The sync layer controls when a push happens and how often
//! - Call direction: Sync → Search (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - Articles, pages and notes flattened into one external index
//! - Oversized documents split into byte-bounded segments
//! - Local regex search against the primary store as a fallback

pub mod chunker;
pub mod normalizer;
pub mod pagination;
pub mod provider;
pub mod query;
pub mod schema;
pub mod selector;

pub use chunker::Chunker;
pub use pagination::{Pagination, PaginationMeta};
pub use provider::{AlgoliaProvider, IndexSettings, ProviderState, SearchProvider};
pub use query::{ExternalSearchResult, QueryEngine};
pub use schema::{IndexedUnit, SearchOptions, SearchableDocument};
pub use selector::ContentSelector;
