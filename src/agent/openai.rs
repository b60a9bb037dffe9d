//! OpenAI 兼容运行时
//!
//! 以阻塞方式调用 OpenAI 兼容的 Chat Completions 流式接口，并把
//! 响应流映射为 Agent 回调事件。调用在专属工作线程上执行，因此
//! 这里刻意使用阻塞客户端，全程不让出。
//!
//! 映射规则：
//! - `delta.content` → `data` 文本事件
//! - `delta.reasoning_content` → `reasoningText` 思考事件
//! - `delta.tool_calls` → 按索引累积参数分片，参数完整后一次性
//!   上报 `current_tool_use`（宣告是原子的，没有增量参数流）
//! - `finish_reason` → `result.stop_reason`（映射回上游风格的取值）

use crate::agent::runtime::{AgentError, AgentRuntime};
use crate::agent::types::AgentInvocation;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::time::Duration;
use tracing::warn;

/// 工具调用增量数据
///
/// Chat Completions 把工具调用参数按分片下发，这里按索引累积
#[derive(Debug, Clone, Default)]
struct ToolCallDelta {
    /// 工具调用 ID
    id: String,
    /// 函数名
    name: String,
    /// 累积的参数（JSON 字符串）
    arguments: String,
}

/// OpenAI 兼容运行时
#[derive(Debug, Clone)]
pub struct OpenAiRuntime {
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiRuntime {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        }
    }

    /// 构建阻塞客户端
    ///
    /// 在工作线程内按调用构建，阻塞客户端的生命周期不跨越异步上下文。
    /// 只设置连接超时；流式响应可能持续很久，不设总超时。
    fn build_client(&self) -> Result<reqwest::blocking::Client, AgentError> {
        Ok(reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None)
            .build()?)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    fn build_request_body(&self, invocation: &AgentInvocation) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": invocation.prompt}
            ],
            "stream": true,
        })
    }
}

impl AgentRuntime for OpenAiRuntime {
    fn run(
        &self,
        invocation: &AgentInvocation,
        emit: &mut dyn FnMut(Value),
    ) -> Result<(), AgentError> {
        emit(json!({"init_event_loop": true}));

        let client = self.build_client()?;
        let mut request = client
            .post(self.endpoint())
            .json(&self.build_request_body(invocation));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message: truncate_chars(&message, 200),
            });
        }

        let mut mapper = ChatStreamMapper::new();
        let reader = BufReader::new(response);
        for line in reader.lines() {
            if mapper.process_line(&line?, emit) {
                break;
            }
        }
        mapper.finish(emit);

        Ok(())
    }
}

/// Chat Completions 流到回调事件的映射器
///
/// 与 HTTP 客户端解耦，逐行消费 SSE 数据。
#[derive(Debug, Default)]
struct ChatStreamMapper {
    /// 按索引累积的工具调用
    tool_calls: HashMap<usize, ToolCallDelta>,
    /// 记录到的停止原因（已映射为上游风格取值）
    stop_reason: Option<String>,
}

impl ChatStreamMapper {
    fn new() -> Self {
        Self::default()
    }

    /// 处理一行 SSE 数据
    ///
    /// 返回 `true` 表示收到 `[DONE]`，流已结束。
    fn process_line(&mut self, line: &str, emit: &mut dyn FnMut(Value)) -> bool {
        let Some(data) = line.strip_prefix("data: ") else {
            return false;
        };
        if data.trim() == "[DONE]" {
            return true;
        }

        let chunk: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                warn!("解析流式响应块失败: {e} - data: {data}");
                return false;
            }
        };

        let Some(choice) = chunk
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
        else {
            return false;
        };

        if let Some(delta) = choice.get("delta") {
            if let Some(text) = delta.get("reasoning_content").and_then(Value::as_str) {
                if !text.is_empty() {
                    emit(json!({"reasoningText": text, "reasoning": true}));
                }
            }
            if let Some(text) = delta.get("content").and_then(Value::as_str) {
                if !text.is_empty() {
                    emit(json!({ "data": text }));
                }
            }
            if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
                for tc in tool_calls {
                    self.accumulate_tool_call(tc);
                }
            }
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            self.stop_reason = Some(map_finish_reason(reason).to_string());
        }

        false
    }

    /// 流结束：上报完整的工具调用与最终结果
    fn finish(&mut self, emit: &mut dyn FnMut(Value)) {
        let mut indices: Vec<usize> = self.tool_calls.keys().copied().collect();
        indices.sort_unstable();

        for index in indices {
            let Some(delta) = self.tool_calls.get(&index) else {
                continue;
            };
            if delta.id.is_empty() || delta.name.is_empty() {
                continue;
            }
            // 参数以累积后的 JSON 字符串上报，由事件边界解析
            emit(json!({
                "current_tool_use": {
                    "toolUseId": delta.id,
                    "name": delta.name,
                    "input": delta.arguments,
                }
            }));
        }

        let stop_reason = self
            .stop_reason
            .clone()
            .unwrap_or_else(|| "end_turn".to_string());
        emit(json!({"result": {"stop_reason": stop_reason}}));
    }

    fn accumulate_tool_call(&mut self, tc: &Value) {
        let index = tc.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
        let entry = self.tool_calls.entry(index).or_default();

        if let Some(id) = tc.get("id").and_then(Value::as_str) {
            entry.id = id.to_string();
        }
        if let Some(function) = tc.get("function") {
            if let Some(name) = function.get("name").and_then(Value::as_str) {
                entry.name = name.to_string();
            }
            if let Some(args) = function.get("arguments").and_then(Value::as_str) {
                entry.arguments.push_str(args);
            }
        }
    }
}

/// 把 Chat Completions 的 finish_reason 映射回上游风格取值
fn map_finish_reason(reason: &str) -> &str {
    match reason {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" => "tool_use",
        other => other,
    }
}

/// 按字符数安全截断，避免 UTF-8 边界问题
fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
