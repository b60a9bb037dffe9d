//! Agent 集成模块
//!
//! Agent 推理引擎是外部协作者，本模块只定义消费它的窄接口：
//!
//! ## 架构设计
//! - events - 回调事件边界（松散负载 → 封闭 `AgentEvent`）
//! - runtime - 阻塞运行时接口与脚本化/回显实现
//! - openai - OpenAI 兼容的阻塞运行时
//! - types - 会话、消息与请求类型

pub mod events;
pub mod openai;
pub mod runtime;
pub mod types;

pub use events::AgentEvent;
pub use openai::OpenAiRuntime;
pub use runtime::{AgentError, AgentRuntime, EchoRuntime, ScriptedRuntime};
pub use types::{AgentInvocation, AgentMessage, AgentSession, ChatStreamRequest};
