//! 日志管理模块
//!
//! 内存环形日志 + 可选文件日志。文件按大小轮转，轮转文件超期后
//! gzip 归档，归档超期后删除。写入前统一脱敏。

use chrono::{DateTime, Duration, Local, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 日志存储配置
#[derive(Debug, Clone)]
pub struct LogStoreConfig {
    /// 内存中保留的日志条数
    pub max_logs: usize,
    /// 轮转文件保留天数
    pub retention_days: u32,
    /// 单个日志文件大小上限
    pub max_file_size: u64,
    /// 是否写入文件
    pub enable_file_logging: bool,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            max_logs: 1000,
            retention_days: 7,
            max_file_size: 10 * 1024 * 1024,
            enable_file_logging: true,
        }
    }
}

/// 单条日志
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// 日志存储
pub struct LogStore {
    logs: VecDeque<LogEntry>,
    config: LogStoreConfig,
    log_file_path: Option<PathBuf>,
}

impl Default for LogStore {
    fn default() -> Self {
        // 默认日志文件路径: ~/.agentcast/logs/agentcast.log
        let log_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentcast")
            .join("logs");
        let _ = fs::create_dir_all(&log_dir);

        Self {
            logs: VecDeque::new(),
            config: LogStoreConfig::default(),
            log_file_path: Some(log_dir.join("agentcast.log")),
        }
    }
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(logging: &crate::config::LoggingConfig) -> Self {
        let mut store = Self::default();
        store.config.retention_days = logging.retention_days;
        store.config.enable_file_logging = logging.enabled;
        store
    }

    /// 记录一条日志
    pub fn add(&mut self, level: &str, message: &str) {
        let sanitized = sanitize_log_message(message);
        self.logs.push_back(LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            message: sanitized.clone(),
        });

        if self.config.enable_file_logging {
            if let Some(path) = self.log_file_path.clone() {
                self.rotate_if_needed(&path);
                let local_time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                let line = format!("{} [{}] {}\n", local_time, level.to_uppercase(), sanitized);
                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
                    let _ = file.write_all(line.as_bytes());
                }
            }
        }

        while self.logs.len() > self.config.max_logs {
            self.logs.pop_front();
        }
    }

    /// 获取内存中的日志快照
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.logs.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }

    pub fn log_file_path(&self) -> Option<String> {
        self.log_file_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// 超过大小上限时轮转当前文件，并维护历史文件
    fn rotate_if_needed(&self, path: &Path) {
        let Ok(metadata) = fs::metadata(path) else {
            return;
        };
        if metadata.len() <= self.config.max_file_size {
            return;
        }

        let suffix = Local::now().format("%Y%m%d-%H%M%S");
        let rotated = path.with_file_name(format!(
            "{}.{}",
            path.file_name().unwrap_or_default().to_string_lossy(),
            suffix
        ));
        let _ = fs::rename(path, &rotated);
        self.maintain_rotated_files(path);
    }

    /// 归档并清理轮转出的历史文件
    ///
    /// 超过保留期的明文轮转文件压缩为 .gz；.gz 超过 30 天删除。
    fn maintain_rotated_files(&self, active_path: &Path) {
        let Some(dir) = active_path.parent() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let prefix = format!(
            "{}.",
            active_path.file_name().unwrap_or_default().to_string_lossy()
        );
        let archive_cutoff = Utc::now() - Duration::days(self.config.retention_days as i64);
        let delete_cutoff = Utc::now() - Duration::days(30);

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if !file_name.starts_with(&prefix) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let modified = DateTime::<Utc>::from(modified);
            let path = entry.path();

            if file_name.ends_with(".gz") {
                if modified < delete_cutoff {
                    let _ = fs::remove_file(path);
                }
                continue;
            }

            if modified < archive_cutoff {
                compress_and_remove(&path);
            }
        }
    }
}

/// 压缩文件为 .gz 并删除原文件
fn compress_and_remove(path: &Path) {
    let mut input = Vec::new();
    let Ok(mut file) = fs::File::open(path) else {
        return;
    };
    if file.read_to_end(&mut input).is_err() {
        return;
    }

    let gz_path = path.with_extension(format!(
        "{}.gz",
        path.extension().unwrap_or_default().to_string_lossy()
    ));
    if let Ok(gz_file) = fs::File::create(&gz_path) {
        let mut encoder = GzEncoder::new(gz_file, Compression::default());
        if encoder.write_all(&input).is_ok() && encoder.finish().is_ok() {
            let _ = fs::remove_file(path);
        }
    }
}

pub type SharedLogStore = Arc<RwLock<LogStore>>;

/// 日志脱敏
///
/// 覆盖 bearer token、api key、access/refresh token、client secret、
/// authorization 头与密码字段。
pub fn sanitize_log_message(message: &str) -> String {
    let patterns = [
        (r"Bearer\s+[A-Za-z0-9._-]+", "Bearer ***"),
        (
            r#"api[_-]?key["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "api_key: ***",
        ),
        (
            r#"access[_-]?token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "access_token: ***",
        ),
        (
            r#"refresh[_-]?token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "refresh_token: ***",
        ),
        (
            r#"client[_-]?secret["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "client_secret: ***",
        ),
        (r#"token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#, "token: ***"),
        (
            r#"[Aa]uthorization["']?\s*[:=]\s*["']?[A-Za-z0-9._\s-]+"#,
            "authorization: ***",
        ),
        (r#"password["']?\s*[:=]\s*["']?[^\s"',}]+"#, "password: ***"),
    ];

    let mut sanitized = message.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            sanitized = re.replace_all(&sanitized, replacement).to_string();
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_bearer_token() {
        let output = sanitize_log_message("Authorization: Bearer abcDEF123._-XYZ");
        assert!(!output.contains("abcDEF123"));
        assert!(output.contains("***"));
    }

    #[test]
    fn test_sanitize_api_key() {
        let output = sanitize_log_message(r#"request api_key="sk-test_123.456-ABC" end"#);
        assert!(output.contains("api_key: ***"));
        assert!(!output.contains("sk-test_123"));
    }

    #[test]
    fn test_sanitize_password() {
        let output = sanitize_log_message(r#"{"password":"p@ssW0rd!"}"#);
        assert!(output.contains("password: ***"));
        assert!(!output.contains("p@ssW0rd!"));
    }

    #[test]
    fn test_plain_text_unchanged() {
        let input = "这是一段普通日志，不包含任何敏感字段。";
        assert_eq!(sanitize_log_message(input), input);
    }

    #[test]
    fn test_memory_ring_respects_max_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore {
            logs: VecDeque::new(),
            config: LogStoreConfig {
                max_logs: 3,
                enable_file_logging: false,
                ..Default::default()
            },
            log_file_path: Some(dir.path().join("test.log")),
        };

        for i in 0..10 {
            store.add("info", &format!("message {i}"));
        }

        let logs = store.get_logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "message 7");
        assert_eq!(logs[2].message, "message 9");
    }

    #[test]
    fn test_file_logging_writes_sanitized_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        let mut store = LogStore {
            logs: VecDeque::new(),
            config: LogStoreConfig::default(),
            log_file_path: Some(path.clone()),
        };

        store.add("warn", "token=secret_value_1 reached");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[WARN]"));
        assert!(content.contains("token: ***"));
        assert!(!content.contains("secret_value_1"));
    }
}
