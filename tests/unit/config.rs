use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "strokefx_config_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn defaults_match_documented_values() {
    let cfg = StrokeFxConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.job_dir, PathBuf::from("temp"));
    assert_eq!(cfg.store_dir, PathBuf::from("images"));
    assert_eq!(cfg.timeout(), Duration::from_secs(60));

    let runner = cfg.runner_config();
    assert_eq!(runner.poll_interval, Duration::from_millis(20));
    assert!(!runner.keep_artifacts);
    assert_eq!(runner.paths.dir(), Path::new("temp"));
}

#[test]
fn zero_timeout_or_poll_interval_is_rejected() {
    let cfg = StrokeFxConfig {
        timeout_ms: 0,
        ..StrokeFxConfig::default()
    };
    assert!(cfg.validate().is_err());
    let cfg = StrokeFxConfig {
        poll_interval_ms: 0,
        ..StrokeFxConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn load_fills_defaults_and_resolves_manifests() {
    let dir = temp_dir("load");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("sepia.json"),
        r#"{ "id": "sepia", "command": ["sepia-fx"] }"#,
    )
    .unwrap();
    let path = dir.join("strokefx.json");
    std::fs::write(
        &path,
        r#"{ "timeout_ms": 1500, "manifests": ["sepia.json"] }"#,
    )
    .unwrap();

    let cfg = StrokeFxConfig::load(&path).unwrap();
    assert_eq!(cfg.timeout(), Duration::from_millis(1500));
    assert_eq!(cfg.store_dir, PathBuf::from("images"));
    assert_eq!(cfg.manifests, [dir.join("sepia.json")]);

    let reg = cfg.registry().unwrap();
    assert!(reg.effect("sepia").is_ok());
    assert!(reg.effect("fill").is_ok());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = temp_dir("unknown");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("strokefx.json");
    std::fs::write(&path, r#"{ "timeout": 5 }"#).unwrap();
    assert!(matches!(
        StrokeFxConfig::load(&path),
        Err(StrokeFxError::Serde(_))
    ));

    let _ = std::fs::remove_dir_all(&dir);
}
