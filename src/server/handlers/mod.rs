//! 请求处理器

pub mod chat;
pub mod session;

use axum::response::IntoResponse;
use axum::Json;

/// 健康检查端点
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
