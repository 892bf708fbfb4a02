//! # 内置信任锚
//!
//! WWPass Corporation Primary Root CA 以 DER 形式编译进二进制，只用于验证远端
//! 服务器证书。信任库在首次使用时构建一次，此后只读共享。

use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// 根证书（DER）
pub const WWPASS_ROOT_CA_DER: &[u8] = include_bytes!("wwpass_ca.der");

/// 根证书的 SHA-256 指纹（小写十六进制）
pub const WWPASS_ROOT_CA_SHA256: &str =
    "9c191a40362aa4e705337e1b2e39e12c34752b299bbaea0e96b566bbaf6ca1e9";

static ROOT_STORE: OnceLock<Result<Arc<RootCertStore>, String>> = OnceLock::new();

/// 只包含内置根证书的信任库
pub fn root_store() -> Result<Arc<RootCertStore>, String> {
    ROOT_STORE
        .get_or_init(|| {
            let mut store = RootCertStore::empty();
            store
                .add(CertificateDer::from(WWPASS_ROOT_CA_DER))
                .map_err(|e| format!("加载内置根证书失败: {}", e))?;
            debug!("内置根证书已加载，指纹: {}", WWPASS_ROOT_CA_SHA256);
            Ok(Arc::new(store))
        })
        .clone()
}

/// 计算内置根证书指纹
pub fn anchor_fingerprint() -> String {
    hex::encode(Sha256::digest(WWPASS_ROOT_CA_DER))
}
