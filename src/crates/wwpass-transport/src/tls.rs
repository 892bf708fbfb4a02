//! # 双向TLS上下文构建
//!
//! 从认证配置快照构建 rustls 客户端配置：出示配置中的客户端证书，并且只信任
//! 内置根证书签发的服务器证书链。构建结果不可变，可在线程间共享。

use crate::error::ConnectionError;
use crate::fingerprint::ConfigFingerprint;
use crate::trust_anchor;
use crate::ConnectionResult;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use wwpass_types::AuthConfig;

/// 客户端证书摘要
///
/// 只包含可以写入日志的公开信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// 证书主题
    pub subject: String,
    /// 证书签发者
    pub issuer: String,
    /// 证书过期时间
    pub not_after: String,
    /// 构建时证书是否在有效期内
    pub currently_valid: bool,
}

/// 双向TLS上下文
///
/// 克隆只增加引用计数。
#[derive(Clone)]
pub struct TlsContext {
    inner: Arc<TlsContextInner>,
}

struct TlsContextInner {
    alias: String,
    fingerprint: ConfigFingerprint,
    client_config: Arc<rustls::ClientConfig>,
    summary: CertificateSummary,
}

impl TlsContext {
    /// 构建该上下文的配置别名
    pub fn alias(&self) -> &str {
        &self.inner.alias
    }

    /// 构建该上下文时的配置指纹
    pub fn fingerprint(&self) -> ConfigFingerprint {
        self.inner.fingerprint
    }

    /// rustls 客户端配置
    pub fn client_config(&self) -> Arc<rustls::ClientConfig> {
        Arc::clone(&self.inner.client_config)
    }

    pub fn certificate_summary(&self) -> &CertificateSummary {
        &self.inner.summary
    }

    /// 是否为同一次构建的结果
    pub fn same_build(&self, other: &TlsContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("alias", &self.inner.alias)
            .field("fingerprint", &self.inner.fingerprint)
            .field("subject", &self.inner.summary.subject)
            .finish()
    }
}

/// 为指定别名构建双向TLS上下文
///
/// 证书PEM可以包含证书链，第一个证书作为客户端证书。私钥支持 PKCS#8、
/// PKCS#1 和 SEC1 格式。
pub fn build_tls_context(
    alias: &str,
    config: &AuthConfig,
    fingerprint: ConfigFingerprint,
) -> ConnectionResult<TlsContext> {
    if !config.has_credentials() {
        return Err(ConnectionError::CredentialError {
            alias: alias.to_string(),
            reason: "WWPass认证需要客户端证书和私钥".to_string(),
        });
    }

    let cert_chain = decode_certificates(alias, config.certificate())?;
    let private_key = decode_private_key(alias, config.private_key())?;
    let summary = summarize_certificate(alias, &cert_chain[0])?;

    if !summary.currently_valid {
        warn!(alias, not_after = %summary.not_after, "客户端证书不在有效期内");
    }

    let root_store = trust_anchor::root_store()
        .map_err(|e| ConnectionError::tls_build(alias, e))?;

    let client_config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| ConnectionError::tls_build(alias, format!("TLS协议版本配置失败: {}", e)))?
    .with_root_certificates(root_store)
    .with_client_auth_cert(cert_chain, private_key)
    .map_err(|e| ConnectionError::tls_build(alias, format!("客户端证书配置失败: {}", e)))?;

    debug!(alias, fingerprint = %fingerprint.short(), subject = %summary.subject, "TLS上下文构建完成");

    Ok(TlsContext {
        inner: Arc::new(TlsContextInner {
            alias: alias.to_string(),
            fingerprint,
            client_config: Arc::new(client_config),
            summary,
        }),
    })
}

fn decode_certificates(alias: &str, pem: &str) -> ConnectionResult<Vec<CertificateDer<'static>>> {
    let mut reader = pem.as_bytes();
    let chain = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConnectionError::tls_build(alias, format!("证书PEM解码失败: {}", e)))?;

    if chain.is_empty() {
        return Err(ConnectionError::tls_build(alias, "证书PEM中没有证书"));
    }
    Ok(chain)
}

fn decode_private_key(alias: &str, pem: &str) -> ConnectionResult<PrivateKeyDer<'static>> {
    let mut reader = pem.as_bytes();
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ConnectionError::tls_build(alias, format!("私钥PEM解码失败: {}", e)))?
        .ok_or_else(|| ConnectionError::tls_build(alias, "私钥PEM中没有私钥"))
}

fn summarize_certificate(alias: &str, der: &CertificateDer<'_>) -> ConnectionResult<CertificateSummary> {
    let (_, cert) = x509_parser::parse_x509_certificate(der.as_ref())
        .map_err(|e| ConnectionError::tls_build(alias, format!("证书解析失败: {}", e)))?;

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_after: cert.validity().not_after.to_string(),
        currently_valid: cert.validity().is_valid(),
    })
}
