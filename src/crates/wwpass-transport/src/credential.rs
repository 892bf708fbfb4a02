//! # 凭据存储接口
//!
//! 身份代理按配置别名保存 WWPass 客户端证书、私钥和 PIN 开关。本模块只消费
//! 这些快照，从不修改它们。

use crate::error::ConnectionError;
use crate::ConnectionResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use wwpass_types::AuthConfig;

/// 凭据存储
///
/// 每次调用都返回当前的快照；别名不存在时返回 [`ConnectionError::ConfigNotFound`]。
pub trait CredentialStore: Send + Sync {
    fn get_config(&self, alias: &str) -> ConnectionResult<AuthConfig>;
}

/// 内存凭据存储
///
/// 供嵌入使用和测试；替换某个别名的配置即模拟凭据轮换。
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    configs: RwLock<HashMap<String, AuthConfig>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或替换配置，返回旧配置
    pub fn insert(&self, alias: impl Into<String>, config: AuthConfig) -> Option<AuthConfig> {
        self.configs.write().insert(alias.into(), config)
    }

    pub fn remove(&self, alias: &str) -> Option<AuthConfig> {
        self.configs.write().remove(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.configs.read().contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_config(&self, alias: &str) -> ConnectionResult<AuthConfig> {
        self.configs
            .read()
            .get(alias)
            .cloned()
            .ok_or_else(|| ConnectionError::ConfigNotFound(alias.to_string()))
    }
}
