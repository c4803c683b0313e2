//! Pagination transformer / 分页结构转换
//!
//! Pure functions: store pages and provider responses both come out as `Pagination<T>`.

use serde::{Deserialize, Serialize};

use crate::content::StorePage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl PaginationMeta {
    fn new(current_page: u32, total_items: u64, items_per_page: u32, total_pages: u32) -> Self {
        Self {
            current_page,
            total_items,
            items_per_page,
            total_pages,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

fn bounded<T>(mut data: Vec<T>, items_per_page: u32) -> Vec<T> {
    data.truncate(items_per_page as usize);
    data
}

/// Store-native page (docs + total + one-based page) / 存储层分页结果
pub fn from_store_page<T>(page: StorePage<T>) -> Pagination<T> {
    let per_page = page.limit.max(1);
    let total_pages = page.total.div_ceil(per_page as u64) as u32;
    Pagination {
        data: bounded(page.docs, per_page),
        pagination: PaginationMeta::new(page.page.max(1), page.total, per_page, total_pages),
    }
}

/// Provider page numbers start at 0 / 外部搜索页码从 0 开始
pub fn from_external<T>(
    data: Vec<T>,
    nb_hits: u64,
    nb_pages: u32,
    zero_based_page: u32,
    hits_per_page: u32,
) -> Pagination<T> {
    let per_page = hits_per_page.max(1);
    Pagination {
        data: bounded(data, per_page),
        pagination: PaginationMeta::new(zero_based_page + 1, nb_hits, per_page, nb_pages),
    }
}
