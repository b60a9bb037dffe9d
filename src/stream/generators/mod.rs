//! 帧生成器
//!
//! 将封闭的 Agent 事件转换为 UIMessageStream 协议帧。
//! 生成器是有状态的：每个会话独占一个实例，持有块生命周期状态机。

pub mod ui_message;

pub use ui_message::{BlockRef, UiMessageGenerator};
