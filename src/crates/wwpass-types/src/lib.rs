//! # WWPass 共享类型定义
//!
//! 定义连接子系统与身份代理之间共享的数据类型：认证配置快照、票据和认证方式。
//! 本模块不依赖任何 TLS 或网络库，避免循环依赖。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 证书属性名
pub const CERTIFICATE_PROPERTY: &str = "certificate";
/// 私钥属性名
pub const PRIVATE_KEY_PROPERTY: &str = "privateKey";
/// PIN 开关属性名
pub const USE_PIN_PROPERTY: &str = "usePIN";

/// 认证配置快照
///
/// 由外部凭据存储按配置别名提供的不可变快照，包含 PEM 格式的客户端证书、
/// PEM 格式的私钥以及是否要求 PIN。存储中同一别名下的其他属性保存在
/// `extra` 中，同样参与配置指纹计算。
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 客户端证书（PEM）
    #[serde(default)]
    certificate: String,
    /// 客户端私钥（PEM）
    #[serde(default, rename = "privateKey")]
    private_key: String,
    /// 是否使用 PIN
    #[serde(default, rename = "usePIN")]
    use_pin: bool,
    /// 其他属性
    #[serde(skip)]
    extra: BTreeMap<String, String>,
}

impl AuthConfig {
    /// 创建新的认证配置
    pub fn new(certificate: impl Into<String>, private_key: impl Into<String>, use_pin: bool) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
            use_pin,
            extra: BTreeMap::new(),
        }
    }

    /// 从属性表构建配置
    ///
    /// `usePIN` 仅在值恰好为 `true`（区分大小写）时视为开启，缺失视为关闭；
    /// 证书或私钥缺失时保留为空字符串，由构建 TLS 上下文时报告凭据错误。
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        properties
            .into_iter()
            .fold(Self::default(), |config, (key, value)| config.with_property(key, value))
    }

    /// 从 JSON 表示解析配置
    ///
    /// 接受 `{"certificate": "...", "privateKey": "...", "usePIN": true}` 形式。
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 设置一个属性，已知属性名映射到对应字段
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            CERTIFICATE_PROPERTY => self.certificate = value,
            PRIVATE_KEY_PROPERTY => self.private_key = value,
            USE_PIN_PROPERTY => self.use_pin = value == "true",
            _ => {
                self.extra.insert(key, value);
            }
        }
        self
    }

    pub fn certificate(&self) -> &str {
        &self.certificate
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn use_pin(&self) -> bool {
        self.use_pin
    }

    /// 证书和私钥是否都存在且非空
    pub fn has_credentials(&self) -> bool {
        !self.certificate.trim().is_empty() && !self.private_key.trim().is_empty()
    }

    /// 按键排序的全部属性
    ///
    /// 返回的有序表是配置指纹的规范输入，迭代顺序与插入顺序无关。
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut properties = self.extra.clone();
        properties.insert(CERTIFICATE_PROPERTY.to_string(), self.certificate.clone());
        properties.insert(PRIVATE_KEY_PROPERTY.to_string(), self.private_key.clone());
        properties.insert(USE_PIN_PROPERTY.to_string(), self.use_pin.to_string());
        properties
    }

    /// 认证方式
    pub fn auth_type(&self) -> AuthType {
        AuthType::from_use_pin(self.use_pin)
    }
}

// 私钥和证书内容不进入调试输出
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("certificate", &format_args!("<{} bytes>", self.certificate.len()))
            .field("private_key", &"<redacted>")
            .field("use_pin", &self.use_pin)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 认证方式
///
/// 对应远端协议的 `auth_type` 查询参数，只有两个已知取值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// 仅硬件凭据
    Default,
    /// 硬件凭据加 PIN
    Pin,
}

impl AuthType {
    pub fn from_use_pin(use_pin: bool) -> Self {
        if use_pin {
            AuthType::Pin
        } else {
            AuthType::Default
        }
    }

    /// `auth_type` 查询参数的取值
    pub fn as_query_value(&self) -> &'static str {
        match self {
            AuthType::Default => "",
            AuthType::Pin => "p",
        }
    }
}

/// WWPass 票据
///
/// 远端签发的短期票据及其有效期（秒）。序列化为 `{"ticket": "...", "ttl": N}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// 票据值
    #[serde(rename = "ticket")]
    pub value: String,
    /// 有效期（秒）
    pub ttl: u64,
}

impl Ticket {
    pub fn new(value: impl Into<String>, ttl: u64) -> Self {
        Self {
            value: value.into(),
            ttl,
        }
    }
}
