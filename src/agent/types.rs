//! Agent 类型定义
//!
//! 定义会话、消息与入站请求的核心类型。

use serde::{Deserialize, Serialize};

/// 一次 Agent 调用的输入
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    /// 会话 ID
    pub session_id: String,
    /// 用户提示词
    pub prompt: String,
}

/// Agent 会话
///
/// 每个会话独立持有消息历史，由 `session::SessionStore` 管理，
/// 不存在跨会话共享的全局状态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    /// 会话 ID
    pub id: String,
    /// 消息历史
    pub messages: Vec<AgentMessage>,
    /// 创建时间
    pub created_at: String,
    /// 最后活动时间
    pub updated_at: String,
}

/// 会话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// 角色: user, assistant
    pub role: String,
    /// 文本内容
    pub content: String,
    /// 时间戳
    pub timestamp: String,
}

/// 流式聊天请求
///
/// 兼容 AI SDK useChat 的请求体（messages 数组，消息带 parts），
/// 同时接受旧式的顶层 `message` 字段。
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatStreamRequest {
    /// AI SDK 格式的消息数组
    #[serde(default)]
    pub messages: Vec<UiChatMessage>,
    /// 旧式顶层消息字段
    pub message: Option<String>,
    /// 会话 ID（续聊时传入）
    pub session_id: Option<String>,
}

/// AI SDK 格式的聊天消息
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UiChatMessage {
    /// 角色
    pub role: Option<String>,
    /// 消息分段
    #[serde(default)]
    pub parts: Vec<UiMessagePart>,
    /// 旧格式的内容字符串
    pub content: Option<String>,
}

/// 消息分段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UiMessagePart {
    /// 分段类型
    #[serde(rename = "type", default)]
    pub part_type: String,
    /// 文本内容
    pub text: Option<String>,
}

impl ChatStreamRequest {
    /// 提取用户提示词
    ///
    /// 优先取最后一条消息的第一个文本分段，回退到该消息的
    /// `content` 字符串，再回退到顶层 `message` 字段。
    /// 空白内容返回 `None`。
    pub fn extract_prompt(&self) -> Option<String> {
        if let Some(last) = self.messages.last() {
            for part in &last.parts {
                if part.part_type == "text" {
                    if let Some(text) = &part.text {
                        let text = text.trim();
                        if !text.is_empty() {
                            return Some(text.to_string());
                        }
                    }
                }
            }
            if let Some(content) = &last.content {
                let content = content.trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }

        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}
