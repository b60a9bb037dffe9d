//! 流式聊天处理器

use crate::agent::types::{AgentInvocation, ChatStreamRequest};
use crate::error::BridgeError;
use crate::stream::frames::{UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION};
use crate::stream::pipeline::{create_ui_message_stream, StreamOutcome};
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;

/// 流式聊天端点
///
/// 解析请求，登记用户消息，启动桥接管道，返回 UIMessageStream SSE
/// 响应。工作线程收尾时把累积的助手文本写回会话历史。
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatStreamRequest>,
) -> Result<Response, BridgeError> {
    let prompt = request
        .extract_prompt()
        .ok_or_else(|| BridgeError::InvalidRequest("消息不能为空".to_string()))?;

    let session_id = state.sessions.ensure(request.session_id.as_deref());
    state.sessions.append_message(&session_id, "user", &prompt);

    tracing::info!(
        session_id = %session_id,
        prompt_len = prompt.len(),
        "开始流式会话"
    );

    let invocation = AgentInvocation {
        session_id: session_id.clone(),
        prompt,
    };

    let sessions = state.sessions.clone();
    let record_session_id = session_id.clone();
    let on_finish = Box::new(move |outcome: StreamOutcome| {
        if !outcome.content.is_empty() {
            sessions.append_message(&record_session_id, "assistant", &outcome.content);
        }
    });

    let stream = create_ui_message_stream(
        state.runtime.clone(),
        invocation,
        state.config.bridge.to_bridge_config(),
        Some(on_finish),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .header("x-session-id", session_id.as_str())
        .header(UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION)
        .body(Body::from_stream(stream))
        .map_err(|e| BridgeError::Internal(format!("构建 SSE 响应失败: {e}")))
}
