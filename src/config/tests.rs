use super::*;

#[test]
fn defaults_apply_with_no_file() {
    let cfg = Config::default_snapshot().unwrap();
    assert_eq!(cfg.socket_path, PathBuf::from("/tmp/nova_socket"));
    assert_eq!(cfg.poll_interval_secs, 10);
    assert_eq!(cfg.heartbeat_interval_secs, 180);
    assert_eq!(cfg.evolve_interval_secs, 600);
    assert_eq!(cfg.bridge_dir, cfg.data_dir.join("bridge"));
    assert_eq!(cfg.db_path, cfg.data_dir.join("nova.db"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = Config::load("/nonexistent/path/to/nova.toml").unwrap();
    assert_eq!(cfg.heartbeat_interval_secs, 180);
}

#[test]
fn malformed_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova.toml");
    std::fs::write(&path, "not = [valid toml").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), "CONFIG_ERROR");
}

#[test]
fn zero_interval_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova.toml");
    std::fs::write(&path, "poll_interval_secs = 0\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), "CONFIG_ERROR");
}

#[test]
fn debug_output_redacts_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova.toml");
    std::fs::write(&path, "external_api_key = \"super-secret\"\n").unwrap();
    let cfg = Config::load(&path).unwrap();
    let rendered = format!("{:?}", cfg);
    assert!(!rendered.contains("super-secret"));
    assert_eq!(cfg.external_api_key(), Some("super-secret"));
}

#[test]
fn custom_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova.toml");
    std::fs::write(
        &path,
        r#"
        socket_path = "/tmp/custom_socket"
        poll_interval_secs = 5
        heartbeat_interval_secs = 60
        evolve_interval_secs = 120
        "#,
    )
    .unwrap();
    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.socket_path, PathBuf::from("/tmp/custom_socket"));
    assert_eq!(cfg.poll_interval_secs, 5);
    assert_eq!(cfg.heartbeat_interval_secs, 60);
    assert_eq!(cfg.evolve_interval_secs, 120);
}

#[test]
fn ensure_directories_creates_bridge_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova.toml");
    let data_dir = dir.path().join("data");
    std::fs::write(
        &path,
        format!("data_dir = \"{}\"\n", data_dir.display()),
    )
    .unwrap();
    let cfg = Config::load(&path).unwrap();
    cfg.ensure_directories().unwrap();
    assert!(cfg.bridge_dir.join("outbox").is_dir());
    assert!(cfg.bridge_dir.join("inbox").is_dir());
    assert!(cfg.bridge_dir.join("archive").is_dir());
    assert!(cfg.logs_dir.is_dir());
}
