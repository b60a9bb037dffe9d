//! 流式处理层
//!
//! 提供 Agent 事件到 UIMessageStream SSE 的完整桥接能力，包括：
//! - 协议帧类型与编码 (frames)
//! - 帧生成器 (generators)
//! - 阻塞/异步桥接管道 (pipeline)
//!
//! # 架构设计
//!
//! ```text
//! Agent 回调负载 ──> [AgentEvent 边界解析] ──> [UiMessageGenerator] ──> UiFrame
//!                                                                        │
//!                                                                    [encode]
//!                                                                        │
//! HTTP 传输 <── [编排器异步轮询] <── 有界帧队列 <──────────────────────────┘
//! ```
//!
//! # 模块结构
//!
//! - `frames`: 协议帧目录与 SSE 编码 (`UiFrame`, `encode`)
//! - `generators`: 帧生成器，持有会话协议状态机
//! - `pipeline`: 有界队列 + 工作线程 + 异步编排器

pub mod frames;
pub mod generators;
pub mod pipeline;

// 重新导出核心类型
pub use frames::{encode, FinishReason, UiFrame};
pub use generators::{BlockRef, UiMessageGenerator};
pub use pipeline::{create_ui_message_stream, BridgeConfig, FinishHook, StreamOutcome};
