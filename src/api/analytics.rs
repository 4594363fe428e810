use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::Query;
use serde::Deserialize;

use super::params;
use crate::{
    analytics::{ContentPerformance, PerformanceReport, TrackEvent, UserInsights},
    error::{Error, Result},
    state::AppState,
    storage::ContentStore,
};

/// 配置行为统计相关路由。
///
/// - `POST /analytics/track`：上报行为，始终返回 202
/// - `GET /analytics/performance`：文章表现
/// - `GET /analytics/trending`：热门文章
/// - `GET /analytics/recommendations`：个性化推荐
/// - `GET /analytics/insights/{session_id}`：session 概览
pub fn setup_route<S: ContentStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/analytics/track", post(track::<S>))
        .route("/analytics/performance", get(performance::<S>))
        .route("/analytics/trending", get(trending::<S>))
        .route("/analytics/recommendations", get(recommendations::<S>))
        .route("/analytics/insights/{session_id}", get(insights::<S>))
}

/// 上报一条行为。
///
/// 上报失败不能影响调用方，无法解析的请求体只记录警告。
async fn track<S: ContentStore>(State(state): State<AppState<S>>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<TrackEvent>(&body) {
        Ok(event) => state.analytics().track_behavior(event).await,
        Err(e) => tracing::warn!(error = %e, "dropping malformed behavior event"),
    }
    StatusCode::ACCEPTED
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceParams {
    article_id: Option<String>,
}

async fn performance<S: ContentStore>(
    Query(query): Query<PerformanceParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<PerformanceReport>> {
    let article_id = params::number("articleId", query.article_id.as_deref())?;

    match state.analytics().get_content_performance(article_id).await {
        PerformanceReport::Article(None) => Err(Error::NotFound),
        report => Ok(Json(report)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingParams {
    limit: Option<String>,
}

async fn trending<S: ContentStore>(
    Query(query): Query<TrendingParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<ContentPerformance>>> {
    let limit = params::number("limit", query.limit.as_deref())?;
    Ok(Json(state.analytics().get_trending_content(limit).await))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationParams {
    #[serde(default)]
    session_id: String,
    current_article_id: Option<String>,
}

async fn recommendations<S: ContentStore>(
    Query(query): Query<RecommendationParams>,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<i64>>> {
    let current = params::number("currentArticleId", query.current_article_id.as_deref())?;
    state
        .analytics()
        .generate_personalized_recommendations(&query.session_id, current)
        .await
        .map(Json)
}

async fn insights<S: ContentStore>(
    Path(session_id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<Json<UserInsights>> {
    state
        .analytics()
        .get_user_insights(&session_id)
        .await
        .map(Json)
}
