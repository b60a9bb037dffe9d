//! HTTP 服务模块
//!
//! 暴露桥接能力的 axum 路由。路由与 CORS 只做接线，正确性由框架
//! 负责；认证不在本服务范围内。

pub mod handlers;

use crate::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

/// 构建应用路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat/start", post(handlers::session::chat_start))
        .route("/chat/stream", post(handlers::chat::chat_stream))
        .route(
            "/chat/history/:session_id",
            get(handlers::session::chat_history),
        )
        .route(
            "/session/:session_id",
            delete(handlers::session::delete_session),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
