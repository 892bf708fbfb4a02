//! 测试公共工具：临时证书和脚本化传输

#![allow(dead_code)]

use parking_lot::Mutex;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use wwpass_transport::{
    ConnectionError, ConnectionProvider, ConnectionResult, CredentialStore, HttpTransport,
    MemoryCredentialStore, ProtocolRequest, TicketClient, TlsContext, TlsContextCache,
};
use wwpass_types::AuthConfig;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// 生成自签名客户端证书和私钥（PEM）
pub fn generate_credentials(common_name: &str) -> (String, String) {
    let mut params = CertificateParams::default();
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    params.distinguished_name = name;
    let key_pair = KeyPair::generate().expect("生成密钥对失败");
    let cert = params.self_signed(&key_pair).expect("生成证书失败");
    (cert.pem(), key_pair.serialize_pem())
}

pub fn auth_config(common_name: &str, use_pin: bool) -> AuthConfig {
    let (cert, key) = generate_credentials(common_name);
    AuthConfig::new(cert, key, use_pin)
}

/// 记录下来的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub alias: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    /// 按顺序拼接的查询字符串
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// 脚本化传输：按顺序回放预置的响应体并记录请求
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ConnectionResult<String>>>,
    fallback: Mutex<Option<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delays: Mutex<HashMap<String, Duration>>,
    released: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_body(&self, body: &str) {
        self.replies.lock().push_back(Ok(body.to_string()));
    }

    pub fn push_error(&self, error: ConnectionError) {
        self.replies.lock().push_back(Err(error));
    }

    /// 脚本用尽后一直返回的响应体
    pub fn always(&self, body: &str) {
        *self.fallback.lock() = Some(body.to_string());
    }

    /// 对指定别名的请求注入延迟
    pub fn delay_alias(&self, alias: &str, delay: Duration) {
        self.delays.lock().insert(alias.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// 被释放过的别名
    pub fn released(&self) -> Vec<String> {
        self.released.lock().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, context: &TlsContext, request: &ProtocolRequest) -> ConnectionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(RecordedRequest {
            alias: context.alias().to_string(),
            path: request.path().to_string(),
            query: request.query().to_vec(),
        });

        let delay = self.delays.lock().get(context.alias()).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        match self.fallback.lock().clone() {
            Some(body) => Ok(body),
            None => Err(ConnectionError::RemoteUnavailable("脚本已用尽".to_string())),
        }
    }

    fn release(&self, alias: &str) {
        self.released.lock().push(alias.to_string());
    }
}

/// 内存存储、脚本化传输和提供者
pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub transport: Arc<ScriptedTransport>,
    pub provider: ConnectionProvider,
}

impl Harness {
    pub fn new() -> Self {
        init_logging();
        let store = Arc::new(MemoryCredentialStore::new());
        let transport = ScriptedTransport::new();
        let credential_store: Arc<dyn CredentialStore> = store.clone();
        let cache = Arc::new(TlsContextCache::new(credential_store));
        let provider = ConnectionProvider::new(cache, TicketClient::new(transport.clone()));
        Self {
            store,
            transport,
            provider,
        }
    }

    pub fn with_alias(self, alias: &str, use_pin: bool) -> Self {
        self.store.insert(alias, auth_config(alias, use_pin));
        self
    }
}
