//! 会话管理处理器

use crate::error::BridgeError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// 创建会话
pub async fn chat_start(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.create();
    Json(json!({ "session_id": session_id }))
}

/// 查询会话历史
pub async fn chat_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, BridgeError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or(BridgeError::SessionNotFound { session_id })?;

    Ok(Json(json!({
        "session_id": session.id,
        "created_at": session.created_at,
        "updated_at": session.updated_at,
        "messages": session.messages,
    })))
}

/// 删除会话
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, BridgeError> {
    if !state.sessions.delete(&session_id) {
        return Err(BridgeError::SessionNotFound { session_id });
    }
    Ok(Json(json!({ "status": "cleared" })))
}
