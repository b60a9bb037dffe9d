//! Agent 运行时接口
//!
//! Agent 推理引擎是外部协作者，本 crate 只通过一个窄接口驱动它：
//! [`AgentRuntime::run`] 是阻塞调用，在整个生命周期内不会主动让出，
//! 每个生命周期事件通过同步回调上报一次。因此每个在途会话需要一个
//! 专属工作线程（见 `stream::pipeline`）。

use crate::agent::types::AgentInvocation;
use serde_json::Value;
use thiserror::Error;

/// Agent 调用错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 调用失败
    #[error("Agent 调用失败: {0}")]
    Invocation(String),

    /// 上游服务返回错误状态
    #[error("上游服务错误: HTTP {status} - {message}")]
    Upstream { status: u16, message: String },

    /// 网络请求失败
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),

    /// 响应流读取失败
    #[error("响应流读取失败: {0}")]
    Io(#[from] std::io::Error),
}

/// Agent 运行时
///
/// `run` 为阻塞调用：实现内部同步驱动推理与工具循环，经 `emit`
/// 回调上报松散类型的生命周期事件（由 `agent::events` 在边界解析）。
/// 正常返回 `Ok(())`，调用层面的失败返回错误并由编排器转换为
/// 协议层的 `error` 帧。
pub trait AgentRuntime: Send + Sync {
    /// 阻塞执行一次 Agent 调用
    fn run(
        &self,
        invocation: &AgentInvocation,
        emit: &mut dyn FnMut(Value),
    ) -> Result<(), AgentError>;
}

/// 脚本化运行时
///
/// 按顺序重放固定的事件列表，可选地在末尾返回错误。
/// 用于测试与离线演示。
#[derive(Debug, Clone, Default)]
pub struct ScriptedRuntime {
    /// 要重放的回调负载
    events: Vec<Value>,
    /// 重放结束后返回的错误
    error: Option<String>,
}

impl ScriptedRuntime {
    /// 创建重放指定事件的运行时
    pub fn new(events: Vec<Value>) -> Self {
        Self {
            events,
            error: None,
        }
    }

    /// 创建重放事件后以错误结束的运行时
    pub fn failing(events: Vec<Value>, error: impl Into<String>) -> Self {
        Self {
            events,
            error: Some(error.into()),
        }
    }

    /// 演示运行时：回显用户消息
    ///
    /// 未配置上游服务时的兜底实现，把提示词按词切分为增量回显。
    pub fn echo(prompt: &str) -> Self {
        let mut events = vec![serde_json::json!({"init_event_loop": true})];
        events.push(serde_json::json!({"data": "Echo: "}));
        for word in prompt.split_inclusive(' ') {
            events.push(serde_json::json!({ "data": word }));
        }
        events.push(serde_json::json!({"result": {"stop_reason": "end_turn"}}));
        Self::new(events)
    }
}

impl AgentRuntime for ScriptedRuntime {
    fn run(
        &self,
        _invocation: &AgentInvocation,
        emit: &mut dyn FnMut(Value),
    ) -> Result<(), AgentError> {
        for event in &self.events {
            emit(event.clone());
        }
        match &self.error {
            Some(message) => Err(AgentError::Invocation(message.clone())),
            None => Ok(()),
        }
    }
}

/// 回显运行时
///
/// 对每次调用使用 [`ScriptedRuntime::echo`] 生成事件。
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoRuntime;

impl AgentRuntime for EchoRuntime {
    fn run(
        &self,
        invocation: &AgentInvocation,
        emit: &mut dyn FnMut(Value),
    ) -> Result<(), AgentError> {
        ScriptedRuntime::echo(&invocation.prompt).run(invocation, emit)
    }
}
