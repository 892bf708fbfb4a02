//! # TLS上下文缓存
//!
//! 按配置别名缓存双向TLS上下文。每次查询都从凭据存储取最新快照并计算指纹，
//! 指纹不变时直接复用缓存，指纹变化时重建并整体替换缓存项。
//!
//! 分片映射只保护查找和写入，凭据获取和上下文构建在锁外进行，不同别名之间
//! 互不阻塞。同一别名并发重建时以最后写入者为准。

use crate::credential::CredentialStore;
use crate::error::ConnectionError;
use crate::fingerprint::ConfigFingerprint;
use crate::tls::{build_tls_context, TlsContext};
use crate::ConnectionResult;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wwpass_types::AuthConfig;

/// 缓存项：指纹、上下文和构建时的配置快照
#[derive(Debug)]
pub struct CacheEntry {
    fingerprint: ConfigFingerprint,
    context: TlsContext,
    snapshot: AuthConfig,
}

impl CacheEntry {
    pub fn fingerprint(&self) -> ConfigFingerprint {
        self.fingerprint
    }

    pub fn context(&self) -> &TlsContext {
        &self.context
    }

    /// 构建上下文时使用的配置快照
    pub fn snapshot(&self) -> &AuthConfig {
        &self.snapshot
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// 查询次数
    pub lookups: u64,
    /// 缓存命中次数
    pub cache_hits: u64,
    /// 缓存未命中次数
    pub cache_misses: u64,
    /// 上下文构建次数
    pub context_builds: u64,
    /// 构建失败次数
    pub build_failures: u64,
    /// 主动失效次数
    pub invalidations: u64,
}

#[derive(Debug, Default)]
struct CacheCounters {
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    context_builds: AtomicU64,
    build_failures: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            context_builds: self.context_builds.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// TLS上下文缓存
pub struct TlsContextCache {
    store: Arc<dyn CredentialStore>,
    entries: DashMap<String, Arc<CacheEntry>>,
    counters: CacheCounters,
}

impl TlsContextCache {
    /// 创建空缓存
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
            counters: CacheCounters::default(),
        }
    }

    /// 获取别名对应的TLS上下文
    pub fn get(&self, alias: &str) -> ConnectionResult<TlsContext> {
        self.resolve(alias).map(|entry| entry.context.clone())
    }

    /// 获取别名对应的缓存项
    ///
    /// 返回的快照与上下文来自同一次构建，调用方据此读取 `usePIN`。
    pub fn resolve(&self, alias: &str) -> ConnectionResult<Arc<CacheEntry>> {
        CacheCounters::bump(&self.counters.lookups);

        let snapshot = match self.store.get_config(alias) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if matches!(e, ConnectionError::ConfigNotFound(_)) && self.entries.remove(alias).is_some() {
                    info!(alias, "配置已删除，移除缓存的TLS上下文");
                }
                return Err(e);
            }
        };
        let fingerprint = ConfigFingerprint::compute(&snapshot);

        // 读分片锁在此语句结束时释放
        let cached = self.entries.get(alias).map(|entry| Arc::clone(entry.value()));
        if let Some(entry) = cached {
            if entry.fingerprint == fingerprint {
                CacheCounters::bump(&self.counters.cache_hits);
                return Ok(entry);
            }
            info!(
                alias,
                old = %entry.fingerprint.short(),
                new = %fingerprint.short(),
                "配置指纹变化，重建TLS上下文"
            );
        }
        CacheCounters::bump(&self.counters.cache_misses);

        match build_tls_context(alias, &snapshot, fingerprint) {
            Ok(context) => {
                CacheCounters::bump(&self.counters.context_builds);
                let entry = Arc::new(CacheEntry {
                    fingerprint,
                    context,
                    snapshot,
                });
                self.entries.insert(alias.to_string(), Arc::clone(&entry));
                debug!(alias, fingerprint = %fingerprint.short(), "TLS上下文已缓存");
                Ok(entry)
            }
            Err(e) => {
                CacheCounters::bump(&self.counters.build_failures);
                // 旧上下文对应的凭据已经不是当前凭据
                self.entries.remove_if(alias, |_, entry| entry.fingerprint != fingerprint);
                warn!(alias, fingerprint = %fingerprint.short(), error = %e, "TLS上下文构建失败");
                Err(e)
            }
        }
    }

    /// 当前缓存的指纹
    pub fn fingerprint_of(&self, alias: &str) -> Option<ConfigFingerprint> {
        self.entries.get(alias).map(|entry| entry.fingerprint)
    }

    /// 移除单个别名的缓存，返回是否存在
    pub fn invalidate(&self, alias: &str) -> bool {
        let removed = self.entries.remove(alias).is_some();
        if removed {
            CacheCounters::bump(&self.counters.invalidations);
            debug!(alias, "TLS上下文缓存已失效");
        }
        removed
    }

    /// 清空缓存
    pub fn clear(&self) {
        let count = self.entries.len() as u64;
        self.entries.clear();
        self.counters.invalidations.fetch_add(count, Ordering::Relaxed);
        info!("TLS上下文缓存已清空，移除 {} 项", count);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取统计信息
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl std::fmt::Debug for TlsContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContextCache")
            .field("entries", &self.entries.len())
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}
