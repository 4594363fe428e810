use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::Query;
use serde::Deserialize;

use super::params;
use crate::{
    catalog::{ArticlePage, DEFAULT_PAGE_SIZE, Pagination},
    content::{Article, ArticleInput, ArticleView},
    error::Result,
    state::AppState,
    storage::{ArticleFilter, ContentStore},
};

/// 配置文章相关路由。
///
/// - `GET /articles`：文章列表，游标或 offset 分页
/// - `GET /articles/search`：搜索
/// - `GET /articles/{key}`：按 slug 获取已发布文章
/// - `GET /articles/id/{id}`：按 id 获取文章
/// - `POST /articles`、`PUT|DELETE /articles/{key}`：后台写操作，`key` 为 id
/// - `POST /articles/{id}/publish`、`POST /articles/{id}/unpublish`
pub fn setup_route<S: ContentStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/articles", get(article_list::<S>).post(article_create::<S>))
        .route("/articles/search", get(article_search::<S>))
        .route("/articles/id/{id}", get(article_by_id::<S>))
        .route(
            "/articles/{key}",
            get(article_by_slug::<S>)
                .put(article_update::<S>)
                .delete(article_delete::<S>),
        )
        .route("/articles/{key}/publish", post(article_publish::<S>))
        .route("/articles/{key}/unpublish", post(article_unpublish::<S>))
}

/// 文章列表查询参数
///
/// 带 `offset` 时使用 offset 分页，否则使用游标分页。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    lang: Option<String>,
    category_id: Option<String>,
    featured: Option<String>,
    /// `true`（默认）、`false` 或 `all`
    published: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
    cursor: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

impl ListParams {
    fn filter(&self) -> Result<ArticleFilter> {
        let published = match self.published.as_deref().map(str::trim) {
            Some("all") => None,
            other => params::flag("published", other)?.or(Some(true)),
        };

        Ok(ArticleFilter {
            category_id: params::number("categoryId", self.category_id.as_deref())?,
            featured: params::flag("featured", self.featured.as_deref())?,
            published,
        })
    }

    fn pagination(&self) -> Result<Pagination> {
        let limit = params::number("limit", self.limit.as_deref())?.unwrap_or(DEFAULT_PAGE_SIZE);

        if let Some(offset) = params::number("offset", self.offset.as_deref())? {
            return Ok(Pagination::Offset { limit, offset });
        }

        Ok(Pagination::Cursor {
            limit,
            cursor: self.cursor.clone().filter(|c| !c.is_empty()),
            sort_by: params::choice(self.sort_by.as_deref())?,
            sort_order: params::choice(self.sort_order.as_deref())?,
        })
    }
}

async fn article_list<S: ContentStore>(
    Query(query): Query<ListParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<ArticlePage>> {
    let filter = query.filter()?;
    let pagination = query.pagination()?;
    let lang = params::lang(query.lang.as_deref())?;

    state
        .catalog()
        .list_articles(filter, lang, pagination)
        .await
        .map(Json)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    lang: Option<String>,
    limit: Option<String>,
}

async fn article_search<S: ContentStore>(
    Query(query): Query<SearchParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<ArticleView>>> {
    let lang = params::lang(query.lang.as_deref())?;
    let limit = params::number("limit", query.limit.as_deref())?;

    state
        .catalog()
        .search_articles(&query.q, lang, limit)
        .await
        .map(Json)
}

#[derive(Debug, Default, Deserialize)]
pub struct LangParams {
    lang: Option<String>,
}

/// 根据 slug 获取单篇已发布文章，包含正文。
async fn article_by_slug<S: ContentStore>(
    Path(slug): Path<String>,
    Query(query): Query<LangParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<ArticleView>> {
    let lang = params::lang(query.lang.as_deref())?;
    state
        .catalog()
        .get_article_by_slug(&slug, lang)
        .await
        .map(Json)
}

async fn article_by_id<S: ContentStore>(
    Path(id): Path<String>,
    Query(query): Query<LangParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<ArticleView>> {
    let id = params::id(&id)?;
    let lang = params::lang(query.lang.as_deref())?;
    state.catalog().get_article_by_id(id, lang).await.map(Json)
}

async fn article_create<S: ContentStore>(
    State(state): State<AppState<S>>,
    Json(input): Json<ArticleInput>,
) -> Result<(StatusCode, Json<Article>)> {
    let article = state.catalog().create_article(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn article_update<S: ContentStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Article>> {
    let id = params::id(&id)?;
    state.catalog().update_article(id, input).await.map(Json)
}

async fn article_publish<S: ContentStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<Json<Article>> {
    let id = params::id(&id)?;
    state.catalog().publish_article(id).await.map(Json)
}

async fn article_unpublish<S: ContentStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<Json<Article>> {
    let id = params::id(&id)?;
    state.catalog().unpublish_article(id).await.map(Json)
}

async fn article_delete<S: ContentStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<StatusCode> {
    let id = params::id(&id)?;
    state.catalog().delete_article(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SortKey, SortOrder};

    #[test]
    fn test_offset_param_selects_offset_mode() {
        let params = ListParams {
            limit: Some("5".into()),
            offset: Some("10".into()),
            ..Default::default()
        };
        assert_eq!(
            params.pagination().unwrap(),
            Pagination::Offset {
                limit: 5,
                offset: 10
            }
        );
    }

    #[test]
    fn test_cursor_mode_defaults() {
        let params = ListParams::default();
        assert_eq!(
            params.pagination().unwrap(),
            Pagination::Cursor {
                limit: DEFAULT_PAGE_SIZE,
                cursor: None,
                sort_by: SortKey::PublishedAt,
                sort_order: SortOrder::Desc,
            }
        );
        assert_eq!(params.filter().unwrap(), ArticleFilter::default());
    }

    #[test]
    fn test_published_all_lifts_filter() {
        let params = ListParams {
            published: Some("all".into()),
            category_id: Some("3".into()),
            ..Default::default()
        };
        let filter = params.filter().unwrap();
        assert_eq!(filter.published, None);
        assert_eq!(filter.category_id, Some(3));
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let params = ListParams {
            category_id: Some("news".into()),
            ..Default::default()
        };
        assert!(params.filter().is_err());

        let params = ListParams {
            limit: Some("1O".into()),
            ..Default::default()
        };
        assert!(params.pagination().is_err());
    }
}
