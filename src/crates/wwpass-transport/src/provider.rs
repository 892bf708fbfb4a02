//! # 连接提供者
//!
//! 身份代理调用的门面：按配置别名取得TLS上下文，再通过票据协议客户端访问
//! 远端。提供者本身不保存任何请求状态，可以在线程间共享。

use crate::config::TransportSettings;
use crate::context_cache::TlsContextCache;
use crate::credential::CredentialStore;
use crate::error::ConnectionError;
use crate::protocol::TicketClient;
use crate::ConnectionResult;
use std::sync::Arc;
use tracing::{error, info, warn};
use wwpass_types::Ticket;

/// 连接提供者
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    cache: Arc<TlsContextCache>,
    client: TicketClient,
}

impl ConnectionProvider {
    /// 使用外部注入的缓存和客户端
    pub fn new(cache: Arc<TlsContextCache>, client: TicketClient) -> Self {
        Self { cache, client }
    }

    /// 按传输配置创建，使用 ureq 传输
    pub fn from_settings(
        settings: &TransportSettings,
        store: Arc<dyn CredentialStore>,
    ) -> error::Result<Self> {
        settings.validate()?;
        info!(host = %settings.host, "初始化WWPass连接提供者");
        Ok(Self::new(
            Arc::new(TlsContextCache::new(store)),
            TicketClient::with_settings(settings.clone()),
        ))
    }

    /// 为指定配置申请票据
    pub fn get_ticket(&self, alias: &str) -> ConnectionResult<Ticket> {
        let result = self.cache.resolve(alias).and_then(|entry| {
            self.client
                .request_ticket(entry.context(), entry.snapshot().use_pin())
        });
        self.finish("get_ticket", alias, result)
    }

    /// 将票据解析为 PUID
    pub fn get_puid(&self, alias: &str, ticket: &str) -> ConnectionResult<String> {
        let result = self.cache.resolve(alias).and_then(|entry| {
            self.client
                .resolve_puid(entry.context(), ticket, entry.snapshot().use_pin())
        });
        self.finish("get_puid", alias, result)
    }

    /// TLS上下文缓存
    pub fn cache(&self) -> &Arc<TlsContextCache> {
        &self.cache
    }

    /// 使别名的缓存和连接失效
    pub fn invalidate(&self, alias: &str) -> bool {
        self.client.release(alias);
        self.cache.invalidate(alias)
    }

    fn finish<T>(&self, operation: &str, alias: &str, result: ConnectionResult<T>) -> ConnectionResult<T> {
        if let Err(ref e) = result {
            // 配置类错误意味着缓存项已被移除
            if e.alias().is_some() {
                self.client.release(alias);
            }
            log_error(operation, alias, e);
        }
        result
    }
}

fn log_error(operation: &str, alias: &str, e: &ConnectionError) {
    if e.is_retryable() {
        warn!(operation, alias, code = e.code(), "远端暂时不可用: {}", e);
    } else {
        error!(operation, alias, code = e.code(), "WWPass请求失败: {}", e);
    }
}
