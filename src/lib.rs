//! Agentcast — AI Agent UIMessageStream 桥接服务
//!
//! 把阻塞的会话式 Agent 运行时桥接为 AI SDK v5 UIMessageStream SSE
//! 流。Agent 调用在专属工作线程上同步执行，回调事件经状态机翻译为
//! 协议帧，通过有界队列移交异步 HTTP 传输。
//!
//! # 架构设计
//!
//! ```text
//! Agent 运行时 ──> [agent::events] ──> [stream::generators] ──> [stream::frames]
//!                                                                     │
//! HTTP (axum) <── [server] <── [stream::pipeline 有界队列 + 工作线程] <─┘
//! ```
//!
//! - `agent` - 运行时接口、回调事件边界、会话类型
//! - `stream` - 协议帧、帧生成器、阻塞/异步桥接管道
//! - `server` - axum 路由与处理器
//! - `session` - 会话注册表
//! - `config` / `logger` / `error` - 配置、日志与错误分类

pub mod agent;
pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod session;
pub mod stream;

use crate::agent::runtime::{AgentRuntime, EchoRuntime};
use crate::agent::OpenAiRuntime;
use crate::config::AppConfig;
use crate::logger::{LogStore, SharedLogStore};
use crate::session::SessionStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 应用共享状态
///
/// 所有会话级对象（生成器、队列、会话记录）按请求构建并显式传递，
/// 这里只持有进程级的依赖。
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// Agent 运行时
    pub runtime: Arc<dyn AgentRuntime>,
    /// 会话注册表
    pub sessions: Arc<SessionStore>,
    /// 日志存储
    pub logs: SharedLogStore,
}

impl AppState {
    /// 根据配置构建状态
    pub fn new(config: AppConfig) -> Self {
        let runtime: Arc<dyn AgentRuntime> = match config.agent.runtime.as_str() {
            "echo" => Arc::new(EchoRuntime),
            other => {
                if other != "openai" {
                    tracing::warn!("未知运行时类型 {other}，回退为 openai");
                }
                Arc::new(OpenAiRuntime::new(
                    config.agent.base_url.clone(),
                    config.agent.api_key.clone(),
                    config.agent.model.clone(),
                ))
            }
        };
        Self::with_runtime(config, runtime)
    }

    /// 使用指定运行时构建状态
    pub fn with_runtime(config: AppConfig, runtime: Arc<dyn AgentRuntime>) -> Self {
        let logs = Arc::new(RwLock::new(LogStore::with_config(&config.logging)));
        Self {
            config: Arc::new(config),
            runtime,
            sessions: Arc::new(SessionStore::new()),
            logs,
        }
    }
}
