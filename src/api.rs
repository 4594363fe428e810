mod analytics;
mod articles;
mod categories;
mod params;

use std::net::SocketAddr;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::{state::AppState, storage::ContentStore};

/// 设置应用的路由。
///
/// 将 `/api` 下的文章、分类和行为统计接口组合在一起，并绑定应用状态。
pub fn setup_route<S: ContentStore>(state: AppState<S>) -> Router {
    Router::new()
        .nest(
            "/api",
            articles::setup_route()
                .merge(categories::setup_route())
                .merge(analytics::setup_route()),
        )
        .with_state(state)
}

/// 启动 HTTP 服务，并使用给定的路由处理请求。
#[instrument(name = "http server", skip(router))]
pub async fn run_server_with_router(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("listening on {addr}");

    axum::serve(listener, router).await
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 添加日志和追踪中间件
/// 3. 启动服务器
pub async fn run_server<S: ContentStore>(state: AppState<S>, addr: SocketAddr) -> std::io::Result<()> {
    let router = setup_route(state);
    let router = add_middlewares(router);
    run_server_with_router(router, addr).await
}

/// 为路由添加中间件，请求失败时输出错误日志。
fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {
                // 关闭请求日志
            }),
    )
}
