//! 分类与文章的读写服务
//!
//! [`Catalog`] 持有存储、分类缓存和时钟，所有状态都由构造方注入。

mod articles;
mod category_cache;
mod cursor;
mod editor;

use std::sync::Arc;

use chrono::Duration;

pub use self::{
    articles::{ArticlePage, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT, Pagination},
    category_cache::{CategoryCache, DEFAULT_CATEGORY_TTL},
    cursor::{Cursor, Ignored},
};
use crate::{clock::Clock, storage::ContentStore};

/// 默认最大分页大小
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;

pub struct Catalog<S> {
    store: Arc<S>,
    cache: CategoryCache<S>,
    clock: Arc<dyn Clock>,
    max_page_size: i64,
}

impl<S: ContentStore> Catalog<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        category_ttl: Duration,
        max_page_size: i64,
    ) -> Self {
        Self {
            cache: CategoryCache::new(Arc::clone(&store), Arc::clone(&clock), category_ttl),
            store,
            clock,
            max_page_size,
        }
    }

    /// 分类缓存
    pub fn cache(&self) -> &CategoryCache<S> {
        &self.cache
    }
}
