use std::future::Future;

use chrono::{DateTime, Utc};

use super::{ArticleFilter, ArticleQuery};
use crate::content::{Article, ArticleInput, Category, CategoryInput};

/// 后端存储错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// 唯一约束或外键约束冲突
    #[error("conflict: {0}")]
    Conflict(String),

    /// 存储不可达
    #[error("store offline: {0}")]
    Offline(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 分类与文章的关系型存储接口
///
/// 存储是分类和文章的权威来源；缓存和统计都只是派生状态。
/// 文章列表类操作（[`ContentStore::list_articles`]、[`ContentStore::articles_by_ids`]、
/// [`ContentStore::search_articles`]）不加载正文。
pub trait ContentStore: Send + Sync + 'static {
    /// 查询全部分类，按 id 升序
    fn categories(&self) -> impl Future<Output = StoreResult<Vec<Category>>> + Send;

    fn category_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = StoreResult<Option<Category>>> + Send;

    fn category_by_id(&self, id: i64) -> impl Future<Output = StoreResult<Option<Category>>> + Send;

    fn insert_category(
        &self,
        input: &CategoryInput,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Category>> + Send;

    /// 更新分类，不存在时返回 `None`
    fn update_category(
        &self,
        id: i64,
        input: &CategoryInput,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Category>>> + Send;

    /// 删除分类，引用它的文章分类置空；返回是否删除了记录
    fn delete_category(&self, id: i64) -> impl Future<Output = StoreResult<bool>> + Send;

    /// 只按过滤条件计数
    fn count_articles(
        &self,
        filter: &ArticleFilter,
    ) -> impl Future<Output = StoreResult<i64>> + Send;

    /// 执行一次 [`ArticleQuery`]
    fn list_articles(
        &self,
        query: &ArticleQuery,
    ) -> impl Future<Output = StoreResult<Vec<Article>>> + Send;

    /// 按 slug 查询文章详情（含正文）
    fn article_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = StoreResult<Option<Article>>> + Send;

    /// 按 id 查询文章详情（含正文）
    fn article_by_id(&self, id: i64) -> impl Future<Output = StoreResult<Option<Article>>> + Send;

    fn articles_by_ids(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = StoreResult<Vec<Article>>> + Send;

    /// 已发布文章中，中英文标题或摘要包含 `term`（忽略大小写）的文章，
    /// 按 `published_at DESC, id DESC` 排序
    fn search_articles(
        &self,
        term: &str,
        limit: i64,
    ) -> impl Future<Output = StoreResult<Vec<Article>>> + Send;

    /// 插入文章；`publish_now` 时以 `now` 作为 `published_at`
    fn insert_article(
        &self,
        input: &ArticleInput,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Article>> + Send;

    /// 整体更新文章内容，不改变发布状态
    fn update_article(
        &self,
        id: i64,
        input: &ArticleInput,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Article>>> + Send;

    /// 发布时写入 `published_at = now`，取消发布时清空
    fn set_published(
        &self,
        id: i64,
        published: bool,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Article>>> + Send;

    fn delete_article(&self, id: i64) -> impl Future<Output = StoreResult<bool>> + Send;
}
