//! # 票据协议客户端
//!
//! 通过双向TLS向 WWPass 远端发起两个阻塞的 HTTPS GET 请求：
//!
//! - `/get.json?auth_type=<p|>` 申请票据
//! - `/puid.json?ticket=<T>&auth_type=<p|>` 将票据解析为 PUID
//!
//! 远端用 JSON 对象 `{result, data, ttl?}` 回复，非 2xx 状态码的响应体同样
//! 按协议解释。本模块不做重试。

use crate::config::TransportSettings;
use crate::error::ConnectionError;
use crate::fingerprint::ConfigFingerprint;
use crate::tls::TlsContext;
use crate::ConnectionResult;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;
use wwpass_types::{AuthType, Ticket};

/// 申请票据的路径
pub const TICKET_PATH: &str = "/get.json";
/// 解析 PUID 的路径
pub const PUID_PATH: &str = "/puid.json";

const GENERIC_REMOTE_ERROR: &str = "远端拒绝请求，未提供原因";

/// 协议请求：路径和有序的查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRequest {
    path: &'static str,
    query: Vec<(String, String)>,
}

impl ProtocolRequest {
    /// 申请票据请求
    pub fn ticket(auth_type: AuthType) -> Self {
        Self {
            path: TICKET_PATH,
            query: vec![("auth_type".to_string(), auth_type.as_query_value().to_string())],
        }
    }

    /// 解析 PUID 请求
    pub fn puid(ticket: &str, auth_type: AuthType) -> Self {
        Self {
            path: PUID_PATH,
            query: vec![
                ("ticket".to_string(), ticket.to_string()),
                ("auth_type".to_string(), auth_type.as_query_value().to_string()),
            ],
        }
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// 日志中使用的操作名
    pub fn operation(&self) -> &'static str {
        if self.path == PUID_PATH {
            "resolve_puid"
        } else {
            "request_ticket"
        }
    }
}

/// HTTPS 传输
///
/// 返回响应体文本，无论状态码如何；连接、握手、超时和读取失败都映射为
/// [`ConnectionError::RemoteUnavailable`]，无法解码的响应体映射为
/// [`ConnectionError::MalformedResponse`]。错误文本不得包含查询参数。
pub trait HttpTransport: Send + Sync {
    fn get(&self, context: &TlsContext, request: &ProtocolRequest) -> ConnectionResult<String>;

    /// 释放别名占用的连接资源
    fn release(&self, _alias: &str) {}
}

/// 响应体大小上限
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// 基于 ureq 的阻塞传输
///
/// 每个别名保留一个 agent 以复用连接，指纹变化时替换，别名失效时释放。
pub struct UreqTransport {
    settings: TransportSettings,
    agents: DashMap<String, (ConfigFingerprint, ureq::Agent)>,
}

impl UreqTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            agents: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// 当前持有 agent 的别名数
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn agent_for(&self, context: &TlsContext) -> ureq::Agent {
        if let Some(cached) = self.agents.get(context.alias()) {
            if cached.0 == context.fingerprint() {
                return cached.1.clone();
            }
        }

        let agent = ureq::AgentBuilder::new()
            .tls_config(context.client_config())
            .timeout_connect(self.settings.connect_timeout())
            .timeout_read(self.settings.read_timeout())
            .timeout_write(self.settings.write_timeout())
            .build();
        self.agents.insert(
            context.alias().to_string(),
            (context.fingerprint(), agent.clone()),
        );
        agent
    }

    fn prepare(&self, agent: &ureq::Agent, request: &ProtocolRequest) -> ureq::Request {
        let url = format!("{}{}", self.settings.base_url(), request.path());
        request
            .query()
            .iter()
            .fold(agent.get(&url).set("Accept", "application/json"), |call, (name, value)| {
                call.query(name, value)
            })
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, context: &TlsContext, request: &ProtocolRequest) -> ConnectionResult<String> {
        let agent = self.agent_for(context);
        let response = match self.prepare(&agent, request).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                debug!(alias = context.alias(), status, "远端返回非成功状态码");
                response
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(ConnectionError::RemoteUnavailable(describe_transport_failure(
                    request, &transport,
                )));
            }
        };

        read_body(request, response.into_reader())
    }

    fn release(&self, alias: &str) {
        if self.agents.remove(alias).is_some() {
            debug!(alias, "已释放连接");
        }
    }
}

/// 传输失败描述：只含路径、错误类别和底层原因，不含URL和查询参数
fn describe_transport_failure(request: &ProtocolRequest, transport: &ureq::Transport) -> String {
    let mut text = format!("{} 请求失败: {}", request.path(), transport.kind());
    if let Some(message) = transport.message() {
        text.push_str(&format!(" ({})", message));
    }
    if let Some(source) = std::error::Error::source(transport) {
        text.push_str(&format!(": {}", source));
    }
    redact_query(request, text)
}

fn redact_query(request: &ProtocolRequest, text: String) -> String {
    match request.query_value("ticket") {
        Some(ticket) if !ticket.is_empty() => text.replace(ticket, "***"),
        _ => text,
    }
}

/// 读取响应体
///
/// 读取阶段的 IO 故障属于传输故障；超过上限或不是 UTF-8 的响应体属于格式错误。
fn read_body(request: &ProtocolRequest, reader: impl Read) -> ConnectionResult<String> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| {
            let reason = redact_query(request, e.to_string());
            if e.kind() == std::io::ErrorKind::InvalidData {
                ConnectionError::MalformedResponse(format!("{} 响应体无法解码: {}", request.path(), reason))
            } else {
                ConnectionError::RemoteUnavailable(format!("{} 读取响应失败: {}", request.path(), reason))
            }
        })?;

    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(ConnectionError::MalformedResponse(format!(
            "{} 响应体超过 {} 字节",
            request.path(),
            MAX_BODY_BYTES
        )));
    }
    String::from_utf8(bytes).map_err(|_| {
        ConnectionError::MalformedResponse(format!("{} 响应体不是合法的UTF-8", request.path()))
    })
}

/// 协议响应
///
/// 标量值统一转为字符串，`null` 视为字段缺失。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtocolResponse {
    fields: BTreeMap<String, String>,
}

impl ProtocolResponse {
    /// 解析响应体
    pub fn parse(body: &str) -> ConnectionResult<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ConnectionError::MalformedResponse(format!("响应不是合法的JSON: {}", e)))?;
        let Value::Object(object) = value else {
            return Err(ConnectionError::MalformedResponse("响应不是JSON对象".to_string()));
        };

        let mut fields = BTreeMap::new();
        for (key, value) in object {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(ConnectionError::MalformedResponse(format!(
                        "字段 '{}' 不是字符串",
                        key
                    )));
                }
            };
            fields.insert(key, text);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.get("result") == Some("true")
    }

    fn keys(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// 失败时转为 [`ConnectionError::ProtocolError`]，成功时返回 `data`
    fn into_data(self) -> ConnectionResult<(String, Self)> {
        if !self.is_success() {
            let message = self.get("data").unwrap_or(GENERIC_REMOTE_ERROR).to_string();
            return Err(ConnectionError::ProtocolError(message));
        }
        match self.get("data").map(str::to_string) {
            Some(data) => Ok((data, self)),
            None => Err(ConnectionError::MalformedResponse("成功响应缺少 data 字段".to_string())),
        }
    }
}

/// 票据协议客户端
#[derive(Clone)]
pub struct TicketClient {
    transport: Arc<dyn HttpTransport>,
}

impl TicketClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// 使用 ureq 传输
    pub fn with_settings(settings: TransportSettings) -> Self {
        Self::new(Arc::new(UreqTransport::new(settings)))
    }

    /// 申请票据
    pub fn request_ticket(&self, context: &TlsContext, use_pin: bool) -> ConnectionResult<Ticket> {
        let request = ProtocolRequest::ticket(AuthType::from_use_pin(use_pin));
        let (data, response) = self.exchange(context, &request)?.into_data()?;

        let ttl = response
            .get("ttl")
            .ok_or_else(|| ConnectionError::MalformedResponse("成功响应缺少 ttl 字段".to_string()))?;
        let ttl = ttl
            .trim()
            .parse::<u64>()
            .map_err(|_| ConnectionError::MalformedResponse(format!("ttl 不是数字: '{}'", ttl)))?;

        Ok(Ticket::new(data, ttl))
    }

    /// 将票据解析为 PUID
    pub fn resolve_puid(&self, context: &TlsContext, ticket: &str, use_pin: bool) -> ConnectionResult<String> {
        let request = ProtocolRequest::puid(ticket, AuthType::from_use_pin(use_pin));
        let (puid, _) = self.exchange(context, &request)?.into_data()?;
        Ok(puid)
    }

    /// 释放别名占用的连接资源
    pub fn release(&self, alias: &str) {
        self.transport.release(alias);
    }

    fn exchange(&self, context: &TlsContext, request: &ProtocolRequest) -> ConnectionResult<ProtocolResponse> {
        let body = self.transport.get(context, request)?;
        let response = ProtocolResponse::parse(&body)?;
        debug!(
            alias = context.alias(),
            operation = request.operation(),
            success = response.is_success(),
            keys = ?response.keys(),
            "收到远端响应"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for TicketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketClient").finish_non_exhaustive()
    }
}
