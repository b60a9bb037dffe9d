//! 配置管理
//!
//! 配置文件位于 `~/.agentcast/config.yaml`，缺失或解析失败时使用
//! 默认值；环境变量在文件之后应用，优先级更高。

use crate::stream::pipeline::BridgeConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// Agent 运行时配置
    pub agent: AgentSettings,
    /// 流桥接配置
    pub bridge: BridgeSettings,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

/// Agent 运行时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// 运行时类型: openai 或 echo
    pub runtime: String,
    /// OpenAI 兼容服务地址
    pub base_url: String,
    /// API Key（也可经环境变量提供）
    pub api_key: Option<String>,
    /// 模型名称
    pub model: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            runtime: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// 流桥接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// 帧队列容量
    pub queue_capacity: usize,
    /// 出队轮询超时（毫秒）
    pub poll_interval_ms: u64,
    /// 心跳间隔（毫秒，None 表示关闭）
    pub heartbeat_interval_ms: Option<u64>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            poll_interval_ms: 100,
            heartbeat_interval_ms: Some(15_000),
        }
    }
}

impl BridgeSettings {
    /// 转换为管道层配置
    pub fn to_bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            queue_capacity: self.queue_capacity.max(1),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            heartbeat_interval: self.heartbeat_interval_ms.map(Duration::from_millis),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 是否写入日志文件
    pub enabled: bool,
    /// 日志保留天数
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: 7,
        }
    }
}

impl AppConfig {
    /// 配置文件路径: ~/.agentcast/config.yaml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentcast")
            .join("config.yaml")
    }

    /// 加载配置
    ///
    /// 文件缺失或解析失败时回退默认值，随后应用环境变量覆盖。
    pub fn load() -> Self {
        let mut config = Self::load_file(&Self::config_path());
        config.apply_env();
        config
    }

    fn load_file(path: &PathBuf) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("配置文件解析失败，使用默认配置: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// 应用环境变量覆盖
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("AGENTCAST_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("AGENTCAST_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(runtime) = std::env::var("AGENTCAST_RUNTIME") {
            if !runtime.is_empty() {
                self.agent.runtime = runtime;
            }
        }
        if let Ok(base_url) = std::env::var("AGENTCAST_BASE_URL") {
            if !base_url.is_empty() {
                self.agent.base_url = base_url;
            }
        }
        if let Ok(model) = std::env::var("AGENTCAST_MODEL") {
            if !model.is_empty() {
                self.agent.model = model;
            }
        }
        for key in ["AGENTCAST_API_KEY", "OPENAI_API_KEY"] {
            if let Ok(api_key) = std::env::var(key) {
                if !api_key.is_empty() {
                    self.agent.api_key = Some(api_key);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8765);
        assert_eq!(config.agent.runtime, "openai");
        assert_eq!(config.bridge.queue_capacity, 256);
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: AppConfig = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        // 未指定的字段保持默认
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.bridge.poll_interval_ms, 100);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such.yaml");
        let config = AppConfig::load_file(&path);
        assert_eq!(config.server.port, 8765);
    }

    #[test]
    fn test_load_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: [not a map").unwrap();
        let config = AppConfig::load_file(&path);
        assert_eq!(config.server.port, 8765);
    }

    #[test]
    fn test_to_bridge_config() {
        let settings = BridgeSettings {
            queue_capacity: 0,
            poll_interval_ms: 50,
            heartbeat_interval_ms: None,
        };
        let config = settings.to_bridge_config();
        // 容量至少为 1
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert!(config.heartbeat_interval.is_none());
    }
}
