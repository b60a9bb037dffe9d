//! 错误类型
//!
//! 定义桥接服务的错误分类与 HTTP 映射。
//!
//! 状态机冲突（例如重复关闭块）不在此建模：它们在帧生成器内部
//! 一律吸收为空操作，永远不会上抛。

use crate::agent::runtime::AgentError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// 桥接错误
#[derive(Error, Debug)]
pub enum BridgeError {
    /// 上游 Agent 调用失败
    #[error("上游 Agent 错误: {0}")]
    Agent(#[from] AgentError),

    /// 帧序列化失败
    #[error("帧编码失败: {0}")]
    Encoding(#[from] serde_json::Error),

    /// 请求无效
    #[error("请求无效: {0}")]
    InvalidRequest(String),

    /// 会话不存在
    #[error("会话不存在: {session_id}")]
    SessionNotFound { session_id: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl BridgeError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Agent(_) => 502,
            BridgeError::Encoding(_) => 500,
            BridgeError::InvalidRequest(_) => 400,
            BridgeError::SessionNotFound { .. } => 404,
            BridgeError::Config(_) => 500,
            BridgeError::Internal(_) => 500,
        }
    }

    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Agent(_) => "upstream_agent_error",
            BridgeError::Encoding(_) => "encoding_error",
            BridgeError::InvalidRequest(_) => "invalid_request_error",
            BridgeError::SessionNotFound { .. } => "session_not_found",
            BridgeError::Config(_) => "config_error",
            BridgeError::Internal(_) => "internal_error",
        }
    }

    /// 转换为 JSON 错误响应体
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
                "code": self.status_code()
            }
        })
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        tracing::error!(
            error_type = %self.error_type(),
            error_message = %self.to_string(),
            "请求处理失败"
        );
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
