// rest/mod.rs — Public REST API server.
//
// Axum HTTP server. Every task route sits behind the auth middleware;
// health and the auth endpoints themselves do not.
//
// Endpoints:
//   GET    /api/v1/health
//   POST   /api/v1/auth/register
//   POST   /api/v1/auth/login
//   GET    /api/v1/auth/me
//   POST   /api/v1/tasks
//   GET    /api/v1/tasks
//   GET    /api/v1/tasks/{id}
//   PUT    /api/v1/tasks/{id}
//   DELETE /api/v1/tasks/{id}
//   PATCH  /api/v1/tasks/{id}/status
//   GET    /api/v1/tasks/stats/overview

pub mod routes;

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::auth;
use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let public = Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/auth/register", post(routes::auth::register))
        .route("/api/v1/auth/login", post(routes::auth::login));

    let protected = Router::new()
        .route("/api/v1/auth/me", get(routes::auth::me))
        .route(
            "/api/v1/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        // Static segment registered alongside {id}; axum prefers the
        // more specific match.
        .route("/api/v1/tasks/stats/overview", get(routes::tasks::stats_overview))
        .route(
            "/api/v1/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/api/v1/tasks/{id}/status", patch(routes::tasks::update_status))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), auth::require_auth));

    public
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
