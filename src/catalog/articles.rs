use std::collections::HashMap;

use serde::Serialize;

use super::{Catalog, Cursor};
use crate::{
    content::{Article, ArticleView, Category, Lang},
    error::{Error, Result},
    storage::{ArticleFilter, ArticleQuery, ContentStore, SortKey, SortOrder},
};

/// 默认搜索条数
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
/// 默认每页条数
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// 分页方式
#[derive(Debug, Clone, PartialEq)]
pub enum Pagination {
    /// 跳过 `offset` 行取 `limit` 行，用于后台列表
    Offset { limit: i64, offset: i64 },
    /// 基于游标的稳定翻页
    Cursor {
        limit: i64,
        cursor: Option<String>,
        sort_by: SortKey,
        sort_order: SortOrder,
    },
}

impl Pagination {
    fn limit(&self) -> i64 {
        match self {
            Pagination::Offset { limit, .. } | Pagination::Cursor { limit, .. } => *limit,
        }
    }
}

/// 文章列表的一页
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    pub articles: Vec<ArticleView>,
    /// 满足过滤条件的总数，与游标位置无关
    pub total: i64,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<S: ContentStore> Catalog<S> {
    /// 分页查询文章列表
    ///
    /// 列表不包含正文。游标模式多取一行判断 `has_next`，
    /// `total` 由单独的计数查询得到，只使用过滤条件。
    pub async fn list_articles(
        &self,
        filter: ArticleFilter,
        lang: Lang,
        pagination: Pagination,
    ) -> Result<ArticlePage> {
        let limit = pagination.limit();
        if !(1..=self.max_page_size).contains(&limit) {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {}, got {limit}",
                self.max_page_size
            )));
        }

        match pagination {
            Pagination::Offset { limit, offset } => {
                self.list_by_offset(filter, lang, limit, offset).await
            }
            Pagination::Cursor {
                limit,
                cursor,
                sort_by,
                sort_order,
            } => {
                self.list_by_cursor(filter, lang, limit, cursor.as_deref(), sort_by, sort_order)
                    .await
            }
        }
    }

    async fn list_by_offset(
        &self,
        filter: ArticleFilter,
        lang: Lang,
        limit: i64,
        offset: i64,
    ) -> Result<ArticlePage> {
        if offset < 0 {
            return Err(Error::Validation(format!(
                "offset must not be negative, got {offset}"
            )));
        }

        let query = ArticleQuery {
            filter,
            sort_key: SortKey::PublishedAt,
            order: SortOrder::Desc,
            seek: None,
            limit,
            offset,
        };

        let (rows, total) = tokio::try_join!(
            self.store.list_articles(&query),
            self.store.count_articles(&query.filter)
        )?;

        let returned = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        Ok(ArticlePage {
            articles: self.project_all(rows, lang).await?,
            total,
            has_next: offset.saturating_add(returned) < total,
            next_cursor: None,
        })
    }

    async fn list_by_cursor(
        &self,
        filter: ArticleFilter,
        lang: Lang,
        limit: i64,
        cursor: Option<&str>,
        sort_by: SortKey,
        sort_order: SortOrder,
    ) -> Result<ArticlePage> {
        let seek = cursor.and_then(|token| match Cursor::decode(token, sort_by) {
            Ok(cursor) => Some(cursor.seek()),
            Err(ignored) => {
                tracing::warn!(%ignored, "ignoring malformed cursor, starting from the top");
                None
            }
        });

        let query = ArticleQuery {
            filter,
            sort_key: sort_by,
            order: sort_order,
            seek,
            limit: limit + 1,
            offset: 0,
        };

        let (mut rows, total) = tokio::try_join!(
            self.store.list_articles(&query),
            self.store.count_articles(&query.filter)
        )?;

        let page_size = usize::try_from(limit).unwrap_or(usize::MAX);
        let has_next = rows.len() > page_size;
        rows.truncate(page_size);

        let next_cursor = has_next
            .then(|| rows.last())
            .flatten()
            .map(|last| Cursor::from_article(last, sort_by).encode());

        Ok(ArticlePage {
            articles: self.project_all(rows, lang).await?,
            total,
            has_next,
            next_cursor,
        })
    }

    /// 按 slug 获取已发布文章详情（含正文）
    pub async fn get_article_by_slug(&self, slug: &str, lang: Lang) -> Result<ArticleView> {
        let article = self
            .store
            .article_by_slug(slug)
            .await?
            .filter(|a| a.published)
            .ok_or(Error::NotFound)?;
        self.project_one(article, lang).await
    }

    /// 按 id 获取文章详情（含正文），不区分发布状态
    pub async fn get_article_by_id(&self, id: i64, lang: Lang) -> Result<ArticleView> {
        let article = self.store.article_by_id(id).await?.ok_or(Error::NotFound)?;
        self.project_one(article, lang).await
    }

    /// 在已发布文章的中英文标题和摘要中搜索
    pub async fn search_articles(
        &self,
        query: &str,
        lang: Lang,
        limit: Option<i64>,
    ) -> Result<Vec<ArticleView>> {
        let term = query.trim();
        if term.is_empty() {
            return Err(Error::Validation("search query must not be empty".into()));
        }

        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if !(1..=self.max_page_size).contains(&limit) {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {}, got {limit}",
                self.max_page_size
            )));
        }

        let rows = self.store.search_articles(term, limit).await?;
        self.project_all(rows, lang).await
    }

    async fn project_one(&self, article: Article, lang: Lang) -> Result<ArticleView> {
        let category = match article.category_id {
            Some(id) => self.cache.get_category_by_id(id).await?,
            None => None,
        };
        Ok(ArticleView::project(
            article,
            lang,
            category.map(|c| c.summary(lang)),
        ))
    }

    /// 列表投影，分类信息经由缓存一次性取得
    async fn project_all(&self, rows: Vec<Article>, lang: Lang) -> Result<Vec<ArticleView>> {
        if rows.iter().all(|a| a.category_id.is_none()) {
            return Ok(rows
                .into_iter()
                .map(|a| ArticleView::project(a, lang, None))
                .collect());
        }

        let categories = self.cache.get_categories().await?;
        let by_id: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

        Ok(rows
            .into_iter()
            .map(|a| {
                let category = a
                    .category_id
                    .and_then(|id| by_id.get(&id))
                    .map(|c| c.summary(lang));
                ArticleView::project(a, lang, category)
            })
            .collect())
    }
}
