//! UIMessageStream 协议帧
//!
//! 定义 AI SDK v5 UIMessageStream 协议的全部帧类型，以及帧到 SSE 线缆
//! 格式的纯编码函数。
//!
//! # 线缆格式
//!
//! ```text
//! data: {"type":"text-delta","id":"t-1a2b3c4d","delta":"Hello"}
//!
//! data: [DONE]
//! ```
//!
//! - 每帧以 `data: <json>\n\n` 传输
//! - 流以字面量 `data: [DONE]\n\n` 结束
//! - 心跳为 SSE 注释行 `: ping\n\n`
//! - 响应必须携带 `x-vercel-ai-ui-message-stream: v1` 头

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UIMessageStream 所需的响应头名称
pub const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";

/// UIMessageStream 协议版本
pub const UI_MESSAGE_STREAM_VERSION: &str = "v1";

/// 流结束标记（字面量，不经过 JSON 序列化）
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// SSE 心跳注释行
pub const PING_FRAME: &str = ": ping\n\n";

/// 协议帧
///
/// 封闭的帧类型集合，每个变体只携带线缆协议需要的字段。
/// 序列化后 `type` 为 kebab-case，字段为 camelCase。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiFrame {
    /// 消息流开始
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    /// 处理步骤开始（一轮 Agent 活动）
    StartStep,

    /// 文本块开始
    TextStart { id: String },

    /// 文本增量
    TextDelta { id: String, delta: String },

    /// 文本块结束
    TextEnd { id: String },

    /// 思考块开始
    ReasoningStart { id: String },

    /// 思考增量
    ReasoningDelta { id: String, delta: String },

    /// 思考块结束
    ReasoningEnd { id: String },

    /// 工具调用首次出现
    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        tool_call_id: String,
        tool_name: String,
    },

    /// 工具调用输入完整可用
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },

    /// 工具执行成功输出
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable { tool_call_id: String, output: Value },

    /// 工具执行失败
    #[serde(rename_all = "camelCase")]
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },

    /// 处理步骤结束
    FinishStep,

    /// 消息流结束
    #[serde(rename_all = "camelCase")]
    Finish {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<FinishReason>,
    },

    /// 错误事件
    #[serde(rename_all = "camelCase")]
    Error { error_text: String },

    /// 流终止标记，编码为字面量 `[DONE]`
    Done,
}

/// 结束原因
///
/// 协议接受的封闭集合。上游 stop_reason 通过
/// [`FinishReason::from_stop_reason`] 映射到这里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// 正常结束
    Stop,
    /// 达到最大 token 数
    Length,
    /// 内容被过滤
    ContentFilter,
    /// 需要工具调用
    ToolCalls,
    /// 错误终止
    Error,
    /// 其他原因
    Other,
}

impl FinishReason {
    /// 从上游 stop_reason 映射结束原因
    ///
    /// 未知或缺失的值一律映射为 `Stop`。
    pub fn from_stop_reason(raw: Option<&str>) -> Self {
        match raw {
            Some("end_turn") | Some("stop_sequence") => Self::Stop,
            Some("max_tokens") => Self::Length,
            Some("tool_use") => Self::ToolCalls,
            _ => Self::Stop,
        }
    }

    /// 线缆格式字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content-filter",
            Self::ToolCalls => "tool-calls",
            Self::Error => "error",
            Self::Other => "other",
        }
    }
}

/// 将帧编码为 SSE 线缆文本
///
/// 纯函数，无状态。`Done` 编码为字面量终止标记，其余帧序列化为
/// `data: <json>\n\n`。序列化失败由调用方记录日志并丢弃该帧。
pub fn encode(frame: &UiFrame) -> Result<String, serde_json::Error> {
    if matches!(frame, UiFrame::Done) {
        return Ok(DONE_FRAME.to_string());
    }
    Ok(format!("data: {}\n\n", serde_json::to_string(frame)?))
}
