//! UIMessageStream 帧生成器
//!
//! 将 Agent 回调事件转换为 UIMessageStream 协议帧。
//!
//! 生成器持有会话内的全部协议状态机：
//!
//! - `start` / `start-step` 每会话至多发送一次
//! - 文本块与思考块互斥，切换前先关闭已打开的另一种块
//! - 工具调用按 ID 去重，`tool-input-start`/`tool-input-available`
//!   成对发送且恰好一次
//! - 终止序列（`finish-step` → `finish` → `done`）幂等，终止后进入
//!   吸收态，任何后续事件不再产生帧
//!
//! # 示例
//!
//! ```ignore
//! use agentcast_lib::stream::generators::UiMessageGenerator;
//! use agentcast_lib::agent::events::AgentEvent;
//!
//! let mut generator = UiMessageGenerator::new();
//! let frames = generator.process_event(&AgentEvent::Text { text: "Hi".into() });
//! ```

use crate::agent::events::AgentEvent;
use crate::stream::frames::{FinishReason, UiFrame};
use serde_json::Value;
use std::collections::HashSet;

/// 内容块引用
///
/// `id` 在块打开时生成一次，会话内唯一；`opened_at` 来自会话内
/// 单调递增计数器，用于调试与排序断言。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    /// 块 ID
    pub id: String,
    /// 打开序号（会话内单调递增）
    pub opened_at: u64,
}

/// UIMessageStream 帧生成器
///
/// 每个会话独占一个实例，事件严格按到达顺序处理，内部无锁。
#[derive(Debug)]
pub struct UiMessageGenerator {
    /// 消息 ID
    message_id: String,
    /// 是否已发送 start 帧
    started: bool,
    /// 步骤是否已打开
    in_step: bool,
    /// 当前打开的文本块
    open_text: Option<BlockRef>,
    /// 当前打开的思考块
    open_reasoning: Option<BlockRef>,
    /// 已宣告但未解决的工具调用 ID
    pending_tools: HashSet<String>,
    /// 是否已进入终止吸收态
    finished: bool,
    /// 块打开序号计数器
    block_seq: u64,
    /// 累积的可见文本（供会话记录使用）
    total_content: String,
}

impl Default for UiMessageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UiMessageGenerator {
    /// 创建新的生成器
    pub fn new() -> Self {
        Self::with_message_id(format!(
            "msg_{}",
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// 使用指定消息 ID 创建生成器
    pub fn with_message_id(message_id: String) -> Self {
        Self {
            message_id,
            started: false,
            in_step: false,
            open_text: None,
            open_reasoning: None,
            pending_tools: HashSet::new(),
            finished: false,
            block_seq: 0,
            total_content: String::new(),
        }
    }

    /// 获取消息 ID
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// 获取累积的可见文本
    pub fn total_content(&self) -> &str {
        &self.total_content
    }

    /// 是否已发送终止序列
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 处理一个 Agent 事件，返回按序生成的协议帧
    ///
    /// 终止后调用恒返回空列表。本方法从不失败：状态机冲突一律在
    /// 内部吸收为空操作。
    pub fn process_event(&mut self, event: &AgentEvent) -> Vec<UiFrame> {
        if self.finished {
            return Vec::new();
        }

        let mut frames = Vec::new();

        match event {
            AgentEvent::Init => {
                self.ensure_started(&mut frames);
            }

            AgentEvent::Reasoning { text } => {
                self.ensure_started(&mut frames);
                // 从文本切换到思考：先关闭文本块
                self.close_text(&mut frames);

                if self.open_reasoning.is_none() {
                    let block = self.next_block("r-");
                    frames.push(UiFrame::ReasoningStart {
                        id: block.id.clone(),
                    });
                    self.open_reasoning = Some(block);
                }
                let id = self
                    .open_reasoning
                    .as_ref()
                    .map(|b| b.id.clone())
                    .unwrap_or_default();
                frames.push(UiFrame::ReasoningDelta {
                    id,
                    delta: text.clone(),
                });
            }

            AgentEvent::Text { text } => {
                self.ensure_started(&mut frames);
                // 从思考切换到文本：先关闭思考块
                self.close_reasoning(&mut frames);

                if self.open_text.is_none() {
                    let block = self.next_block("t-");
                    frames.push(UiFrame::TextStart {
                        id: block.id.clone(),
                    });
                    self.open_text = Some(block);
                }
                let id = self
                    .open_text
                    .as_ref()
                    .map(|b| b.id.clone())
                    .unwrap_or_default();
                frames.push(UiFrame::TextDelta {
                    id,
                    delta: text.clone(),
                });
                self.total_content.push_str(text);
            }

            AgentEvent::ToolUse { id, name, input } => {
                self.ensure_started(&mut frames);
                self.close_reasoning(&mut frames);
                self.close_text(&mut frames);

                // 运行时会对同一调用重复回调（输入逐步累积），按 ID 去重
                if !self.pending_tools.contains(id) {
                    frames.push(UiFrame::ToolInputStart {
                        tool_call_id: id.clone(),
                        tool_name: name.clone(),
                    });
                    frames.push(UiFrame::ToolInputAvailable {
                        tool_call_id: id.clone(),
                        tool_name: name.clone(),
                        input: input.clone(),
                    });
                    self.pending_tools.insert(id.clone());
                }
            }

            AgentEvent::ToolStream { id, output } => {
                frames.push(UiFrame::ToolOutputAvailable {
                    tool_call_id: id.clone(),
                    output: output.clone(),
                });
                self.pending_tools.remove(id);
            }

            AgentEvent::ToolResult {
                id,
                status,
                content,
            } => {
                if status == "error" {
                    frames.push(UiFrame::ToolOutputError {
                        tool_call_id: id.clone(),
                        error_text: extract_error_text(content),
                    });
                } else {
                    frames.push(UiFrame::ToolOutputAvailable {
                        tool_call_id: id.clone(),
                        output: collapse_content(content),
                    });
                }
                // 孤儿结果也要移除，保证不残留 pending 状态
                self.pending_tools.remove(id);
            }

            AgentEvent::Complete => {
                self.terminate(FinishReason::Stop, &mut frames);
            }

            AgentEvent::Result { stop_reason } => {
                let reason = FinishReason::from_stop_reason(stop_reason.as_deref());
                self.terminate(reason, &mut frames);
            }
        }

        frames
    }

    /// 错误终止
    ///
    /// 上游 Agent 调用失败时由编排器调用：先发送 `error` 帧，再强制
    /// 关闭未完成的块并发送终止序列。与正常终止同样幂等。
    pub fn fail(&mut self, error_text: &str) -> Vec<UiFrame> {
        if self.finished {
            return Vec::new();
        }

        let mut frames = vec![UiFrame::Error {
            error_text: error_text.to_string(),
        }];
        self.terminate(FinishReason::Error, &mut frames);
        frames
    }

    // ========================================================================
    // 内部状态迁移
    // ========================================================================

    /// 确保 start 与 start-step 已发送（每会话各至多一次）
    fn ensure_started(&mut self, frames: &mut Vec<UiFrame>) {
        if !self.started {
            frames.push(UiFrame::Start {
                message_id: Some(self.message_id.clone()),
            });
            self.started = true;
        }
        if !self.in_step {
            frames.push(UiFrame::StartStep);
            self.in_step = true;
        }
    }

    /// 关闭思考块（未打开时为空操作）
    fn close_reasoning(&mut self, frames: &mut Vec<UiFrame>) {
        if let Some(block) = self.open_reasoning.take() {
            frames.push(UiFrame::ReasoningEnd { id: block.id });
        }
    }

    /// 关闭文本块（未打开时为空操作）
    fn close_text(&mut self, frames: &mut Vec<UiFrame>) {
        if let Some(block) = self.open_text.take() {
            frames.push(UiFrame::TextEnd { id: block.id });
        }
    }

    /// 发送终止序列并进入吸收态
    fn terminate(&mut self, reason: FinishReason, frames: &mut Vec<UiFrame>) {
        self.close_reasoning(frames);
        self.close_text(frames);

        if self.in_step {
            frames.push(UiFrame::FinishStep);
            self.in_step = false;
        }

        frames.push(UiFrame::Finish {
            finish_reason: Some(reason),
        });
        frames.push(UiFrame::Done);
        self.finished = true;
    }

    /// 分配新的块引用
    fn next_block(&mut self, prefix: &str) -> BlockRef {
        let seq = self.block_seq;
        self.block_seq += 1;
        BlockRef {
            id: format!(
                "{}{}",
                prefix,
                &uuid::Uuid::new_v4().simple().to_string()[..8]
            ),
            opened_at: seq,
        }
    }
}

/// 从错误结果内容中提取错误文本
fn extract_error_text(content: &[Value]) -> String {
    content
        .first()
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str)
        .unwrap_or("Tool execution failed")
        .to_string()
}

/// 折叠结果内容：恰好一项时取该项，否则保留列表
fn collapse_content(content: &[Value]) -> Value {
    if content.len() == 1 {
        content[0].clone()
    } else {
        Value::Array(content.to_vec())
    }
}

// ============================================================================
// 单元测试
// ============================================================================


// ============================================================================
// 属性测试
// ============================================================================
