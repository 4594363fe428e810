use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_extra::extract::Query;
use serde::Deserialize;

use super::params;
use crate::{
    content::{Category, CategoryInput, CategoryView},
    error::Result,
    state::AppState,
    storage::ContentStore,
};

/// 配置分类相关路由。
///
/// - `GET /categories`：全部分类
/// - `GET /categories/{key}`：按 slug 获取分类
/// - `POST /categories`、`PUT|DELETE /categories/{key}`：后台写操作，`key` 为 id
pub fn setup_route<S: ContentStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/categories",
            get(category_list::<S>).post(category_create::<S>),
        )
        .route(
            "/categories/{key}",
            get(category_by_slug::<S>)
                .put(category_update::<S>)
                .delete(category_delete::<S>),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct LangParams {
    lang: Option<String>,
}

/// 获取所有分类。
async fn category_list<S: ContentStore>(
    Query(query): Query<LangParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<CategoryView>>> {
    let lang = params::lang(query.lang.as_deref())?;
    state.catalog().get_categories(lang).await.map(Json)
}

async fn category_by_slug<S: ContentStore>(
    Path(slug): Path<String>,
    Query(query): Query<LangParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<CategoryView>> {
    let lang = params::lang(query.lang.as_deref())?;
    state
        .catalog()
        .get_category_by_slug(&slug, lang)
        .await
        .map(Json)
}

async fn category_create<S: ContentStore>(
    State(state): State<AppState<S>>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.catalog().create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn category_update<S: ContentStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let id = params::id(&id)?;
    state.catalog().update_category(id, input).await.map(Json)
}

async fn category_delete<S: ContentStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<StatusCode> {
    let id = params::id(&id)?;
    state.catalog().delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
