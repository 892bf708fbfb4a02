//! # 连接子系统错误定义
//!
//! 每个变体对应一种失败类别，调用方据此分支处理，而不是捕获笼统的错误。

use crate::error_codes::{context, protocol};
use error::{ErrorCategory, ErrorInfo, ErrorKind, ErrorSeverity};
use std::fmt;

/// 连接子系统错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// 凭据存储中不存在该配置别名
    ConfigNotFound(String),

    /// 证书或私钥缺失、为空
    CredentialError {
        alias: String,
        reason: String,
    },

    /// 证书/私钥解析或 TLS 上下文构建失败
    TlsBuildError {
        alias: String,
        reason: String,
    },

    /// 连接、握手或超时等传输层故障
    RemoteUnavailable(String),

    /// 远端返回 `result != "true"`，携带远端消息
    ProtocolError(String),

    /// 响应缺少字段或格式错误
    MalformedResponse(String),
}

impl ConnectionError {
    /// 错误码
    pub fn code(&self) -> u32 {
        match self {
            ConnectionError::ConfigNotFound(_) => context::CONFIG_NOT_FOUND,
            ConnectionError::CredentialError { .. } => context::CREDENTIAL_MISSING,
            ConnectionError::TlsBuildError { .. } => context::TLS_BUILD_FAILED,
            ConnectionError::RemoteUnavailable(_) => protocol::REMOTE_UNAVAILABLE,
            ConnectionError::ProtocolError(_) => protocol::REMOTE_REJECTED,
            ConnectionError::MalformedResponse(_) => protocol::MALFORMED_RESPONSE,
        }
    }

    /// 是否为瞬时故障
    ///
    /// 本模块从不重试，是否重试由调用方决定。
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectionError::RemoteUnavailable(_))
    }

    /// 配置相关错误携带的别名
    pub fn alias(&self) -> Option<&str> {
        match self {
            ConnectionError::ConfigNotFound(alias)
            | ConnectionError::CredentialError { alias, .. }
            | ConnectionError::TlsBuildError { alias, .. } => Some(alias.as_str()),
            _ => None,
        }
    }

    pub(crate) fn tls_build(alias: &str, reason: impl Into<String>) -> Self {
        ConnectionError::TlsBuildError {
            alias: alias.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConfigNotFound(alias) => write!(f, "配置不存在: {}", alias),
            ConnectionError::CredentialError { alias, reason } => {
                write!(f, "凭据错误 [{}]: {}", alias, reason)
            }
            ConnectionError::TlsBuildError { alias, reason } => {
                write!(f, "TLS上下文构建失败 [{}]: {}", alias, reason)
            }
            ConnectionError::RemoteUnavailable(reason) => write!(f, "远端不可用: {}", reason),
            ConnectionError::ProtocolError(message) => write!(f, "远端错误: {}", message),
            ConnectionError::MalformedResponse(reason) => write!(f, "响应格式错误: {}", reason),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl ErrorKind for ConnectionError {
    fn error_code(&self) -> u32 {
        self.code()
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

impl From<ConnectionError> for ErrorInfo {
    fn from(err: ConnectionError) -> Self {
        let (summary, category, severity) = match &err {
            ConnectionError::ConfigNotFound(_) => ("配置不存在", ErrorCategory::Configuration, ErrorSeverity::Error),
            ConnectionError::CredentialError { .. } => ("凭据无效", ErrorCategory::Credential, ErrorSeverity::Error),
            ConnectionError::TlsBuildError { .. } => ("TLS上下文构建失败", ErrorCategory::Tls, ErrorSeverity::Critical),
            ConnectionError::RemoteUnavailable(_) => ("远端不可用", ErrorCategory::Network, ErrorSeverity::Warning),
            ConnectionError::ProtocolError(_) => ("远端拒绝请求", ErrorCategory::Protocol, ErrorSeverity::Error),
            ConnectionError::MalformedResponse(_) => ("响应格式错误", ErrorCategory::Parse, ErrorSeverity::Error),
        };

        let context = err.alias().map(|alias| format!("配置别名: {}", alias));
        let mut info = ErrorInfo::with_source(err.code(), summary.to_string(), err)
            .with_category(category)
            .with_severity(severity);
        if let Some(context) = context {
            info.add_context(context);
        }
        info
    }
}
