use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn write_config(content: &str) -> (tempfile::TempDir, String) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("relay.toml");
    std::fs::write(&config_path, content).unwrap();
    let path = config_path.to_str().unwrap().to_string();
    (temp_dir, path)
}

const VALID_CONFIG: &str = r#"
    [listen]
    addr = "0.0.0.0"
    port = 16379

    [slave]
    info = "/tmp/relay/slave.info"

    [redis]
    addr = "127.0.0.1"
    port = 6379
    "#;

#[test]
#[serial]
fn load_should_read_all_required_keys() {
    let (_dir, path) = write_config(VALID_CONFIG);

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.listen.addr, "0.0.0.0");
        assert_eq!(settings.listen.port, 16379);
        assert_eq!(settings.redis.addr, "127.0.0.1");
        assert_eq!(settings.redis.port, 6379);
        assert_eq!(settings.slave.info.to_str().unwrap(), "/tmp/relay/slave.info");
        assert!(settings.log.dir.is_none());
    });
}

#[test]
#[serial]
fn load_should_fail_on_missing_required_key() {
    // redis section absent entirely
    let (_dir, path) = write_config(
        r#"
        [listen]
        addr = "0.0.0.0"
        port = 16379

        [slave]
        info = "/tmp/relay/slave.info"
        "#,
    );

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        assert!(Settings::load(Some(&path)).is_err());
    });
}

#[test]
#[serial]
fn load_should_merge_environment_overrides() {
    let (_dir, path) = write_config(VALID_CONFIG);

    with_vars(vec![("RELAY__REDIS__PORT", Some("6380"))], || {
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.redis.port, 6380);
    });
}

#[test]
fn validate_should_reject_zero_port() {
    let endpoint = Endpoint {
        addr: "127.0.0.1".to_string(),
        port: 0,
    };

    assert!(endpoint.validate("listen").is_err());
}

#[test]
fn validate_should_reject_empty_addr() {
    let endpoint = Endpoint {
        addr: String::new(),
        port: 6379,
    };

    assert!(endpoint.validate("redis").is_err());
}
