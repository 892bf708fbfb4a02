//! # 错误代码常量模块
//!
//! 定义 wwpass-transport 包使用的所有错误代码常量，避免硬编码

/// 凭据与 TLS 上下文错误代码
pub mod context {
    /// 配置别名不存在
    pub const CONFIG_NOT_FOUND: u32 = 8001;
    /// 证书或私钥缺失
    pub const CREDENTIAL_MISSING: u32 = 8002;
    /// TLS 上下文构建失败
    pub const TLS_BUILD_FAILED: u32 = 8003;
}

/// 远端协议错误代码
pub mod protocol {
    /// 远端不可达（连接、握手、超时）
    pub const REMOTE_UNAVAILABLE: u32 = 8101;
    /// 远端明确返回失败
    pub const REMOTE_REJECTED: u32 = 8102;
    /// 响应缺少字段或格式错误
    pub const MALFORMED_RESPONSE: u32 = 8103;
}

/// 传输配置错误代码
pub mod settings {
    /// 远端主机为空
    pub const INVALID_HOST: u32 = 8201;
    /// 超时时间无效
    pub const INVALID_TIMEOUT: u32 = 8202;
}
