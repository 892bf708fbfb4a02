//! # 错误处理框架
//!
//! 零依赖的统一错误信息结构，供各子模块把自己的领域错误映射为
//! 带错误码、类别和严重程度的 [`ErrorInfo`]，便于身份代理一侧统一处理。
//!
//! ## 使用示例
//!
//! ```rust
//! use error::{ErrorInfo, ErrorCategory, ErrorSeverity};
//!
//! let error = ErrorInfo::new(8001, "配置不存在: cfg1".to_string())
//!     .with_category(ErrorCategory::Configuration)
//!     .with_severity(ErrorSeverity::Error)
//!     .with_context("获取票据".to_string());
//! assert_eq!(error.code(), 8001);
//! ```

use std::fmt;

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 调试级别
    Debug = 0,
    /// 信息级别
    Info = 1,
    /// 警告级别：可重试或可忽略
    Warning = 2,
    /// 错误级别：需要处理的错误
    Error = 3,
    /// 严重级别：配置或安全材料损坏
    Critical = 4,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Debug => write!(f, "调试"),
            ErrorSeverity::Info => write!(f, "信息"),
            ErrorSeverity::Warning => write!(f, "警告"),
            ErrorSeverity::Error => write!(f, "错误"),
            ErrorSeverity::Critical => write!(f, "严重"),
        }
    }
}

/// 错误类别
///
/// 调用方按类别决定处理策略，只有 [`ErrorCategory::Network`] 属于瞬时故障。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 配置错误
    Configuration,
    /// 凭据错误（证书或私钥缺失）
    Credential,
    /// TLS 上下文构建错误
    Tls,
    /// 网络错误
    Network,
    /// 远端协议错误
    Protocol,
    /// 解析错误
    Parse,
    /// IO 错误
    Io,
    /// 其他错误
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "配置错误"),
            ErrorCategory::Credential => write!(f, "凭据错误"),
            ErrorCategory::Tls => write!(f, "TLS错误"),
            ErrorCategory::Network => write!(f, "网络错误"),
            ErrorCategory::Protocol => write!(f, "协议错误"),
            ErrorCategory::Parse => write!(f, "解析错误"),
            ErrorCategory::Io => write!(f, "IO错误"),
            ErrorCategory::Other => write!(f, "其他错误"),
        }
    }
}

/// 错误类型的核心trait
///
/// 领域错误实现此trait后即可作为 [`ErrorInfo`] 的源错误。
pub trait ErrorKind: fmt::Debug + fmt::Display + Send + Sync {
    /// 获取错误码
    fn error_code(&self) -> u32;

    /// 获取错误消息
    fn error_message(&self) -> String;
}

/// 错误信息结构体
#[derive(Debug)]
pub struct ErrorInfo {
    code: u32,
    message: String,
    source: Option<Box<dyn ErrorKind + Send + Sync>>,
    context: Vec<String>,
    severity: ErrorSeverity,
    category: ErrorCategory,
}

impl Clone for ErrorInfo {
    fn clone(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            source: None, // 源错误不克隆
            context: self.context.clone(),
            severity: self.severity,
            category: self.category,
        }
    }
}

impl PartialEq for ErrorInfo {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.message == other.message
            && self.context == other.context
            && self.severity == other.severity
            && self.category == other.category
    }
}

impl ErrorInfo {
    /// 创建一个新的错误信息
    ///
    /// 默认严重程度为 [`ErrorSeverity::Error`]，类别为 [`ErrorCategory::Other`]。
    pub fn new(code: u32, message: String) -> Self {
        Self {
            code,
            message,
            source: None,
            context: Vec::new(),
            severity: ErrorSeverity::Error,
            category: ErrorCategory::Other,
        }
    }

    /// 创建一个带有源错误的错误信息
    pub fn with_source<E: ErrorKind + 'static>(code: u32, message: String, source: E) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(code, message)
        }
    }

    /// 链式添加错误上下文
    pub fn with_context(mut self, context: String) -> Self {
        self.context.push(context);
        self
    }

    /// 添加错误上下文
    pub fn add_context(&mut self, context: String) {
        self.context.push(context);
    }

    /// 设置错误严重程度
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// 设置错误类别
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> Option<&(dyn ErrorKind + Send + Sync)> {
        self.source.as_deref()
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// 是否为瞬时故障，调用方可自行决定是否重试
    pub fn is_transient(&self) -> bool {
        self.category == ErrorCategory::Network
    }

    /// 判断是否为严重错误
    pub fn is_critical(&self) -> bool {
        self.severity == ErrorSeverity::Critical
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}][错误码: {}] {}",
               self.severity, self.category, self.code, self.message)?;

        for ctx in &self.context {
            write!(f, "\n  上下文: {}", ctx)?;
        }

        if let Some(source) = &self.source {
            write!(f, "\n  由以下错误引起: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorInfo {}

/// 使用 `ErrorInfo` 作为错误类型的 Result 别名
pub type Result<T> = std::result::Result<T, ErrorInfo>;

impl From<std::io::Error> for ErrorInfo {
    fn from(err: std::io::Error) -> Self {
        let (code, category) = match err.kind() {
            std::io::ErrorKind::NotFound => (404, ErrorCategory::Io),
            std::io::ErrorKind::PermissionDenied => (403, ErrorCategory::Io),
            std::io::ErrorKind::InvalidData => (400, ErrorCategory::Parse),
            std::io::ErrorKind::TimedOut => (504, ErrorCategory::Network),
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => (503, ErrorCategory::Network),
            _ => (500, ErrorCategory::Io),
        };

        ErrorInfo::new(code, err.to_string())
            .with_category(category)
            .with_severity(ErrorSeverity::Error)
    }
}
