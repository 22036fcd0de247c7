//! Fail-fast coverage for malformed configuration inputs.

use std::ffi::OsString;
use std::fs;

use tempfile::TempDir;

use eventgate_config::Config;

#[test]
fn malformed_config_file_fails_loading() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("eventgate.toml");
    fs::write(&path, r#"max_connections = "plenty""#).expect("write malformed config");

    let args = vec![
        OsString::from("eventgated"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "error should describe the failure"
    );
}

#[test]
fn invalid_listen_flag_is_rejected() {
    let args = vec![
        OsString::from("eventgated"),
        OsString::from("--listen"),
        OsString::from("unix:///tmp/gate.sock"),
    ];

    assert!(Config::load_from_iter(args).is_err());
}
