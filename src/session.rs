//! 会话注册表
//!
//! 每个会话持有独立的消息历史，以显式注入的 `SessionStore` 管理，
//! 取代进程级全局状态，保证并发会话互不干扰。
//! 仅内存存储，持久化由外部系统负责。

use crate::agent::types::{AgentMessage, AgentSession};
use chrono::Utc;
use dashmap::DashMap;

/// 会话注册表
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, AgentSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建新会话，返回会话 ID
    pub fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        self.sessions.insert(
            id.clone(),
            AgentSession {
                id: id.clone(),
                messages: Vec::new(),
                created_at: now.clone(),
                updated_at: now,
            },
        );
        tracing::debug!(session_id = %id, "创建会话");
        id
    }

    /// 返回已有会话 ID，不存在（或未提供）时创建新会话
    pub fn ensure(&self, session_id: Option<&str>) -> String {
        match session_id {
            Some(id) if self.sessions.contains_key(id) => id.to_string(),
            _ => self.create(),
        }
    }

    /// 获取会话快照
    pub fn get(&self, session_id: &str) -> Option<AgentSession> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    /// 追加一条消息
    ///
    /// 未知会话静默忽略（会话可能已被删除）。
    pub fn append_message(&self, session_id: &str, role: &str, content: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            let now = Utc::now().to_rfc3339();
            session.messages.push(AgentMessage {
                role: role.to_string(),
                content: content.to_string(),
                timestamp: now.clone(),
            });
            session.updated_at = now;
        }
    }

    /// 删除会话
    pub fn delete(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// 当前会话数量
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
