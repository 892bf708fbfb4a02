//! 集成测试模块
//!
//! 测试配置文件加载、日志初始化和连接提供者的组装。

use error::ErrorCategory;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wwpass_connect::{
    connect, load_config_from, AppConfig, AuthConfig, ConnectionError, CredentialStore,
    MemoryCredentialStore,
};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("创建临时文件失败");
    file.write_all(content.as_bytes()).expect("写入配置失败");
    file
}

/// 测试从TOML文件加载完整配置
#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[transport]
host = "spfe.example.test"
connect_timeout_ms = 2500
read_timeout_ms = 15000
write_timeout_ms = 15000

[logging]
level = "debug"
"#,
    );

    let config = load_config_from(file.path()).expect("加载配置应该成功");
    assert_eq!(config.transport.host, "spfe.example.test");
    assert_eq!(config.transport.connect_timeout(), Duration::from_millis(2500));
    assert_eq!(config.transport.read_timeout(), Duration::from_secs(15));
    assert_eq!(config.logging.level, "debug");
}

/// 测试部分配置使用默认值
#[test]
fn test_partial_config_uses_defaults() {
    let file = write_config("[transport]\nread_timeout_ms = 5000\n");

    let config = load_config_from(file.path()).expect("加载配置应该成功");
    assert_eq!(config.transport.host, "spfe.wwpass.com");
    assert_eq!(config.transport.read_timeout_ms, 5000);
    assert_eq!(config.transport.connect_timeout_ms, 10_000);
    assert_eq!(config.logging.level, "info");
}

/// 测试配置文件不存在时使用默认配置
#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().expect("创建临时目录失败");
    let config = load_config_from(dir.path().join("absent.toml")).expect("缺失的配置文件不应该报错");
    assert_eq!(config, AppConfig::default());
}

/// 测试格式错误的配置文件
#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("[transport\nhost = ");
    let err = load_config_from(file.path()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    assert!(err.context().iter().any(|c| c.contains("配置文件")));
}

/// 测试配置路径无法读取
#[test]
fn test_unreadable_path_is_io_error() {
    let dir = TempDir::new().expect("创建临时目录失败");
    let err = load_config_from(dir.path()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Io);
    assert!(err.context().iter().any(|c| c.contains("读取配置文件失败")), "{}", err);
}

/// 测试非法取值在加载时被拒绝
#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config("[transport]\nconnect_timeout_ms = 0\n");
    let err = load_config_from(file.path()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let file = write_config("[logging]\nlevel = \"verbose\"\n");
    assert!(load_config_from(file.path()).is_err(), "未知的日志级别应该被拒绝");
}

/// 测试从配置组装连接提供者
#[test]
fn test_connect_from_loaded_config() {
    let file = write_config("[transport]\nhost = \"spfe.example.test\"\n");
    let config = load_config_from(file.path()).expect("加载配置应该成功");

    let store = Arc::new(MemoryCredentialStore::new());
    store.insert("empty", AuthConfig::new("", "", false));
    let credential_store: Arc<dyn CredentialStore> = store.clone();
    let provider = connect(&config, credential_store).expect("创建连接提供者失败");

    assert_eq!(
        provider.get_ticket("cfg1").unwrap_err(),
        ConnectionError::ConfigNotFound("cfg1".to_string())
    );
    assert!(matches!(
        provider.get_ticket("empty").unwrap_err(),
        ConnectionError::CredentialError { .. }
    ));
}

/// 测试认证配置的JSON表示
#[test]
fn test_auth_config_from_json() {
    let config = AuthConfig::from_json(r#"{"certificate": "C", "privateKey": "K", "usePIN": true}"#)
        .expect("解析认证配置失败");
    assert!(config.use_pin());
    assert_eq!(config.private_key(), "K");
}
