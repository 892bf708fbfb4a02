//! # WWPass 连接子系统 - wwpass-connect
//!
//! 身份代理访问 WWPass 远端的连接层：按配置别名缓存双向TLS上下文，
//! 申请认证票据，并把票据解析为 PUID（提供者侧的用户标识）。
//!
//! ## 模块架构
//!
//! ```text
//! wwpass-connect/
//! ├── src/
//! │   ├── lib.rs          # 库入口：配置加载、日志初始化
//! │   └── crates/
//! │       ├── error/               # 错误处理框架
//! │       ├── wwpass-types/        # 认证配置、票据等共享类型
//! │       └── wwpass-transport/    # TLS上下文缓存、票据协议、连接提供者
//! ```
//!
//! ## 使用示例
//!
//! ```no_run
//! use std::sync::Arc;
//! use wwpass_connect::{connect, init_logging, load_config, MemoryCredentialStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     init_logging(&config.logging)?;
//!
//!     let store = Arc::new(MemoryCredentialStore::new());
//!     let provider = connect(&config, store)?;
//!     let ticket = provider.get_ticket("cfg1")?;
//!     let puid = provider.get_puid("cfg1", &ticket.value)?;
//!     println!("PUID: {}", puid);
//!     Ok(())
//! }
//! ```

use error::{ErrorCategory, ErrorInfo, ErrorSeverity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use wwpass_transport::{
    CacheStats, ConfigFingerprint, ConnectionError, ConnectionProvider, ConnectionResult,
    CredentialStore, MemoryCredentialStore, TicketClient, TlsContext, TlsContextCache,
    TransportSettings,
};
pub use wwpass_types::{AuthConfig, AuthType, Ticket};

/// 应用程序结果类型
pub type AppResult<T> = error::Result<T>;

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "WWPASS_CONFIG";
/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "wwpass.toml";

#[cfg(feature = "config")]
const CONFIG_PARSE_FAILED: u32 = 8302;
const INVALID_LOG_LEVEL: u32 = 8303;

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别：trace、debug、info、warn、error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 解析日志级别
    pub fn level(&self) -> AppResult<tracing::Level> {
        self.level.trim().parse::<tracing::Level>().map_err(|_| {
            ErrorInfo::new(INVALID_LOG_LEVEL, format!("无效的日志级别: '{}'", self.level))
                .with_category(ErrorCategory::Configuration)
                .with_severity(ErrorSeverity::Error)
        })
    }
}

/// 应用程序配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 传输配置
    pub transport: TransportSettings,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 验证配置
    pub fn validate(&self) -> AppResult<()> {
        self.transport.validate()?;
        self.logging.level()?;
        Ok(())
    }
}

/// 配置文件路径
///
/// 优先使用 `WWPASS_CONFIG` 环境变量，否则使用 `wwpass.toml`。
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// 加载配置
pub fn load_config() -> AppResult<AppConfig> {
    load_config_from(config_path())
}

/// 从指定路径加载配置，文件不存在时使用默认配置
pub fn load_config_from(path: impl AsRef<Path>) -> AppResult<AppConfig> {
    let path = path.as_ref();

    #[cfg(feature = "config")]
    {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ErrorInfo::from(e).with_context(format!("读取配置文件失败: {}", path.display())))?;
            let config: AppConfig = toml::from_str(&content).map_err(|e| {
                ErrorInfo::new(CONFIG_PARSE_FAILED, format!("解析配置文件失败: {}", e))
                    .with_category(ErrorCategory::Parse)
                    .with_context(format!("配置文件: {}", path.display()))
            })?;
            config.validate()?;
            tracing::info!("从配置文件加载: {}", path.display());
            return Ok(config);
        }
    }

    tracing::info!("配置文件 {} 不存在，使用默认配置", path.display());
    Ok(AppConfig::default())
}

/// 初始化日志
///
/// 日志已经初始化时不做任何事。
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let level = config.level()?;
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    Ok(())
}

/// 按配置创建连接提供者
pub fn connect(config: &AppConfig, store: Arc<dyn CredentialStore>) -> AppResult<ConnectionProvider> {
    ConnectionProvider::from_settings(&config.transport, store)
}
