//! 真实 ureq 传输的本地回环测试
//!
//! 远端只信任内置根证书，这里的本地服务都无法通过验证，因此只覆盖故障路径。

mod common;

use common::{auth_config, generate_credentials};
use rcgen::{CertificateParams, KeyPair};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use wwpass_transport::{
    build_tls_context, ConfigFingerprint, ConnectionError, HttpTransport, ProtocolRequest,
    TlsContext, TransportSettings, UreqTransport,
};
use wwpass_types::AuthType;

const SECRET_TICKET: &str = "SECRET-TICKET-42";

fn context(alias: &str) -> TlsContext {
    let config = auth_config(alias, false);
    build_tls_context(alias, &config, ConfigFingerprint::compute(&config)).expect("构建TLS上下文失败")
}

fn transport_for(port: u16) -> UreqTransport {
    UreqTransport::new(
        TransportSettings::new()
            .with_host(format!("127.0.0.1:{}", port))
            .with_connect_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_secs(2))
            .with_write_timeout(Duration::from_secs(2)),
    )
}

/// 启动本地服务，每个连接交给 handler 处理
fn serve(handler: fn(TcpStream)) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("绑定端口失败");
    let port = listener.local_addr().expect("获取端口失败").port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            handler(stream);
        }
    });
    port
}

fn drop_connection(stream: TcpStream) {
    drop(stream);
}

fn plaintext_http(mut stream: TcpStream) {
    let mut buf = [0u8; 1024];
    let _ = stream.read(&mut buf);
    let body = r#"{"result":"true","data":"T1","ttl":"60"}"#;
    let _ = write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
}

fn self_signed_tls(mut stream: TcpStream) {
    let key_pair = KeyPair::generate().expect("生成密钥对失败");
    let cert = CertificateParams::new(vec!["127.0.0.1".to_string()])
        .expect("证书参数无效")
        .self_signed(&key_pair)
        .expect("生成证书失败");
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let Ok(builder) = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions() else {
        return;
    };
    let Ok(config) = builder
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
    else {
        return;
    };
    let Ok(mut connection) = rustls::ServerConnection::new(Arc::new(config)) else {
        return;
    };
    while connection.is_handshaking() {
        if connection.complete_io(&mut stream).is_err() {
            break;
        }
    }
}

fn assert_remote_unavailable(result: Result<String, ConnectionError>) -> String {
    match result {
        Err(err @ ConnectionError::RemoteUnavailable(_)) => {
            assert!(err.is_retryable());
            err.to_string()
        }
        other => panic!("应该是远端不可用: {:?}", other),
    }
}

/// 连接被直接关闭
#[test]
fn test_dropped_connection_is_remote_unavailable() {
    let transport = transport_for(serve(drop_connection));
    let ctx = context("cfg1");

    assert_remote_unavailable(transport.get(&ctx, &ProtocolRequest::ticket(AuthType::Default)));
}

/// 错误文本不包含票据
#[test]
fn test_failure_text_never_contains_ticket() {
    let transport = transport_for(serve(drop_connection));
    let ctx = context("cfg1");

    let text = assert_remote_unavailable(
        transport.get(&ctx, &ProtocolRequest::puid(SECRET_TICKET, AuthType::Default)),
    );
    assert!(!text.contains(SECRET_TICKET), "错误文本泄露了票据: {}", text);
    assert!(!text.contains("ticket="), "错误文本不应该包含查询参数: {}", text);
    assert!(text.contains("/puid.json"));
}

/// 对端不讲TLS
#[test]
fn test_plaintext_peer_is_remote_unavailable() {
    let transport = transport_for(serve(plaintext_http));
    let ctx = context("cfg1");

    let text = assert_remote_unavailable(
        transport.get(&ctx, &ProtocolRequest::puid(SECRET_TICKET, AuthType::Pin)),
    );
    assert!(!text.contains(SECRET_TICKET));
}

/// 服务器证书不是由内置根证书签发
#[test]
fn test_untrusted_server_is_rejected() {
    let transport = transport_for(serve(self_signed_tls));
    let ctx = context("cfg1");

    assert_remote_unavailable(transport.get(&ctx, &ProtocolRequest::ticket(AuthType::Default)));
}

/// 别名释放后不再持有 agent
#[test]
fn test_release_drops_agent() {
    let transport = transport_for(serve(drop_connection));
    let first = context("cfg1");
    let second = context("cfg2");

    let _ = transport.get(&first, &ProtocolRequest::ticket(AuthType::Default));
    let _ = transport.get(&second, &ProtocolRequest::ticket(AuthType::Default));
    assert_eq!(transport.agent_count(), 2);

    // 凭据轮换后替换而不是新增
    let (cert, key) = generate_credentials("cfg1-rotated");
    let rotated_config = wwpass_types::AuthConfig::new(cert, key, false);
    let rotated = build_tls_context("cfg1", &rotated_config, ConfigFingerprint::compute(&rotated_config))
        .expect("构建TLS上下文失败");
    let _ = transport.get(&rotated, &ProtocolRequest::ticket(AuthType::Default));
    assert_eq!(transport.agent_count(), 2);

    transport.release("cfg1");
    assert_eq!(transport.agent_count(), 1);
    transport.release("cfg1");
    assert_eq!(transport.agent_count(), 1);
}
