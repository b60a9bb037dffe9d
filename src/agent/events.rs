//! Agent 回调事件边界
//!
//! Agent 运行时的同步回调携带的是松散类型的 JSON 负载（kwargs 风格，
//! 每次回调一个生命周期事件）。本模块在边界处将其一次性解析为封闭的
//! [`AgentEvent`] 枚举：
//!
//! - 解析器输出 `AgentEvent`，翻译器只消费 `AgentEvent`
//! - 未知形状解析为 `None`，由调用方直接忽略，绝不报错
//! - 工具输入在边界处归一化：JSON 字符串被解析，解析失败回退为
//!   `{"raw": <原始字符串>}`

use serde_json::{json, Value};

/// Agent 生命周期事件
///
/// 消费接口的封闭中间表示。与线缆协议帧解耦：
/// 运行时回调负载 → `AgentEvent` → 协议帧。
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// 会话/轮次开始信号
    Init,

    /// 思考内容增量
    Reasoning { text: String },

    /// 文本内容增量
    Text { text: String },

    /// 工具调用出现（输入此时已完整）
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    /// 工具流式输出
    ToolStream { id: String, output: Value },

    /// 工具执行结果
    ToolResult {
        id: String,
        status: String,
        content: Vec<Value>,
    },

    /// 流完成信号
    Complete,

    /// 最终结果（携带上游停止原因）
    Result { stop_reason: Option<String> },
}

impl AgentEvent {
    /// 从松散类型的回调负载解析事件
    ///
    /// 按固定优先级探测已知键；无法识别的形状返回 `None`。
    pub fn from_value(value: &Value) -> Option<Self> {
        // 生命周期事件
        if is_truthy(value.get("init_event_loop")) || is_truthy(value.get("start_event_loop")) {
            return Some(Self::Init);
        }

        // 思考内容（需要 reasoning 标记）
        if let Some(text) = value.get("reasoningText").and_then(Value::as_str) {
            if !text.is_empty() && is_truthy(value.get("reasoning")) {
                return Some(Self::Reasoning {
                    text: text.to_string(),
                });
            }
        }

        // 文本内容
        if let Some(text) = value.get("data").and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(Self::Text {
                    text: text.to_string(),
                });
            }
        }

        // 工具调用（name 为空视为部分累积，忽略）
        if let Some(tool_use) = value.get("current_tool_use") {
            if let Some(name) = tool_use.get("name").and_then(Value::as_str) {
                if !name.is_empty() {
                    let id = tool_use
                        .get("toolUseId")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(generated_tool_id);
                    return Some(Self::ToolUse {
                        id,
                        name: name.to_string(),
                        input: normalize_tool_input(tool_use.get("input")),
                    });
                }
            }
        }

        // 工具流式输出
        if let Some(stream_event) = value.get("tool_stream_event") {
            let id = stream_event
                .get("tool_use")
                .and_then(|t| t.get("toolUseId"))
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            return Some(Self::ToolStream {
                id,
                output: stream_event.get("data").cloned().unwrap_or(Value::Null),
            });
        }

        // 工具执行结果
        if let Some(result) = value.get("tool_result") {
            let id = result
                .get("toolUseId")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let status = result
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("success")
                .to_string();
            let content = result
                .get("content")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            return Some(Self::ToolResult {
                id,
                status,
                content,
            });
        }

        // 完成信号
        if is_truthy(value.get("complete")) {
            return Some(Self::Complete);
        }

        // 最终结果
        if let Some(result) = value.get("result") {
            let stop_reason = result
                .get("stop_reason")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Some(Self::Result { stop_reason });
        }

        None
    }
}

/// 归一化工具输入
///
/// 运行时累积的输入可能是已解析对象，也可能是 JSON 编码字符串。
/// 字符串负载在此解析，失败时回退为 `{"raw": <string>}`。
fn normalize_tool_input(input: Option<&Value>) -> Value {
    match input {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| json!({ "raw": raw }))
        }
        Some(other) => other.clone(),
        None => json!({}),
    }
}

/// 为缺失 toolUseId 的调用生成会话内唯一 ID
fn generated_tool_id() -> String {
    format!("tool-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_init_events() {
        assert_eq!(
            AgentEvent::from_value(&json!({"init_event_loop": true})),
            Some(AgentEvent::Init)
        );
        assert_eq!(
            AgentEvent::from_value(&json!({"start_event_loop": true})),
            Some(AgentEvent::Init)
        );
        // false 标记不触发
        assert_eq!(AgentEvent::from_value(&json!({"init_event_loop": false})), None);
    }

    #[test]
    fn test_parse_reasoning_requires_flag() {
        let event = AgentEvent::from_value(&json!({
            "reasoningText": "thinking",
            "reasoning": true
        }));
        assert_eq!(
            event,
            Some(AgentEvent::Reasoning {
                text: "thinking".to_string()
            })
        );

        // 缺少 reasoning 标记时不识别为思考事件
        assert_eq!(
            AgentEvent::from_value(&json!({"reasoningText": "thinking"})),
            None
        );
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(
            AgentEvent::from_value(&json!({"data": "Hello"})),
            Some(AgentEvent::Text {
                text: "Hello".to_string()
            })
        );
        // 空文本忽略
        assert_eq!(AgentEvent::from_value(&json!({"data": ""})), None);
    }

    #[test]
    fn test_parse_tool_use_with_object_input() {
        let event = AgentEvent::from_value(&json!({
            "current_tool_use": {
                "toolUseId": "tool_1",
                "name": "read_file",
                "input": {"path": "/tmp"}
            }
        }));
        assert_eq!(
            event,
            Some(AgentEvent::ToolUse {
                id: "tool_1".to_string(),
                name: "read_file".to_string(),
                input: json!({"path": "/tmp"}),
            })
        );
    }

    #[test]
    fn test_parse_tool_use_parses_string_input() {
        let event = AgentEvent::from_value(&json!({
            "current_tool_use": {
                "toolUseId": "tool_1",
                "name": "read_file",
                "input": "{\"path\":\"/tmp\"}"
            }
        }));
        match event {
            Some(AgentEvent::ToolUse { input, .. }) => {
                assert_eq!(input, json!({"path": "/tmp"}));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_use_raw_fallback() {
        let event = AgentEvent::from_value(&json!({
            "current_tool_use": {
                "toolUseId": "tool_1",
                "name": "read_file",
                "input": "{not json"
            }
        }));
        match event {
            Some(AgentEvent::ToolUse { input, .. }) => {
                assert_eq!(input, json!({"raw": "{not json"}));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_use_without_name_is_ignored() {
        // 部分累积阶段 name 尚未出现
        let event = AgentEvent::from_value(&json!({
            "current_tool_use": {"toolUseId": "tool_1", "input": "{\"pa"}
        }));
        assert_eq!(event, None);
    }

    #[test]
    fn test_parse_tool_use_generates_missing_id() {
        let event = AgentEvent::from_value(&json!({
            "current_tool_use": {"name": "bash", "input": {}}
        }));
        match event {
            Some(AgentEvent::ToolUse { id, .. }) => assert!(id.starts_with("tool-")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_stream_event() {
        let event = AgentEvent::from_value(&json!({
            "tool_stream_event": {
                "tool_use": {"toolUseId": "tool_1"},
                "data": "partial output"
            }
        }));
        assert_eq!(
            event,
            Some(AgentEvent::ToolStream {
                id: "tool_1".to_string(),
                output: json!("partial output"),
            })
        );
    }

    #[test]
    fn test_parse_tool_result() {
        let event = AgentEvent::from_value(&json!({
            "tool_result": {
                "toolUseId": "tool_1",
                "status": "error",
                "content": [{"text": "boom"}]
            }
        }));
        assert_eq!(
            event,
            Some(AgentEvent::ToolResult {
                id: "tool_1".to_string(),
                status: "error".to_string(),
                content: vec![json!({"text": "boom"})],
            })
        );
    }

    #[test]
    fn test_parse_tool_result_defaults() {
        let event = AgentEvent::from_value(&json!({"tool_result": {}}));
        assert_eq!(
            event,
            Some(AgentEvent::ToolResult {
                id: "unknown".to_string(),
                status: "success".to_string(),
                content: Vec::new(),
            })
        );
    }

    #[test]
    fn test_parse_complete_and_result() {
        assert_eq!(
            AgentEvent::from_value(&json!({"complete": true})),
            Some(AgentEvent::Complete)
        );
        assert_eq!(
            AgentEvent::from_value(&json!({"result": {"stop_reason": "max_tokens"}})),
            Some(AgentEvent::Result {
                stop_reason: Some("max_tokens".to_string())
            })
        );
        assert_eq!(
            AgentEvent::from_value(&json!({"result": {}})),
            Some(AgentEvent::Result { stop_reason: None })
        );
    }

    #[test]
    fn test_unknown_shapes_are_ignored() {
        assert_eq!(AgentEvent::from_value(&json!({})), None);
        assert_eq!(AgentEvent::from_value(&json!({"unexpected": 42})), None);
        assert_eq!(AgentEvent::from_value(&json!("just a string")), None);
        assert_eq!(AgentEvent::from_value(&json!(null)), None);
        assert_eq!(AgentEvent::from_value(&json!([1, 2, 3])), None);
    }
}
