//! # 传输配置
//!
//! 远端主机和显式的连接、读、写超时。网络调用是阻塞的，超时只来自这里，
//! 不依赖平台默认值。

use crate::error_codes::settings;
use error::{ErrorCategory, ErrorInfo, ErrorSeverity};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认远端主机
pub const DEFAULT_HOST: &str = "spfe.wwpass.com";

/// 传输配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// 远端主机名
    pub host: String,
    /// 连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 读超时（毫秒）
    pub read_timeout_ms: u64,
    /// 写超时（毫秒）
    pub write_timeout_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            connect_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl TransportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置远端主机
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// 设置连接超时
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 设置读超时
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 设置写超时
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// 远端基础地址
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }

    /// 验证配置
    pub fn validate(&self) -> error::Result<()> {
        let host = self.host.trim();
        if host.is_empty() || host.contains('/') || host.contains(char::is_whitespace) {
            return Err(ErrorInfo::new(settings::INVALID_HOST, format!("无效的远端主机: '{}'", self.host))
                .with_category(ErrorCategory::Configuration)
                .with_severity(ErrorSeverity::Error));
        }

        let timeouts = [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(ErrorInfo::new(settings::INVALID_TIMEOUT, format!("{} 必须大于0", name))
                .with_category(ErrorCategory::Configuration)
                .with_severity(ErrorSeverity::Error));
        }

        Ok(())
    }
}
