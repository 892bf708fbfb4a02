//! # 配置指纹
//!
//! 对认证配置的全部键值对按键排序后做 SHA-256 摘要，用于发现凭据轮换而
//! 不必每次重新解析证书、重建 TLS 上下文。键和值都带长度前缀写入摘要，
//! 保证不同的键值切分不会得到相同的输入。

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use wwpass_types::AuthConfig;

/// 配置指纹（SHA-256）
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint([u8; 32]);

impl ConfigFingerprint {
    /// 计算认证配置的指纹
    pub fn compute(config: &AuthConfig) -> Self {
        Self::from_properties(&config.properties())
    }

    /// 按键的字典序计算属性表的指纹
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Self {
        let mut hasher = Sha256::new();
        for (key, value) in properties {
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 十六进制表示
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 日志用的短指纹（前 6 字节）
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Debug for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigFingerprint({})", self.short())
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
