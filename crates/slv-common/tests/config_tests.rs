//! ---
//! slv_section: "01-core-functionality"
//! slv_subsection: "integration-tests"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Configuration loading tests."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use slv_common::config::AppConfig;
use tempfile::tempdir;

const SAMPLE: &str = r#"
[service]
base_url = "https://slv.example.invalid/reports"
username = "operator"
password = "from-file"
password_env = "SLV_CONFIG_TESTS_UNSET_PASSWORD"

[output]
data_dir = "pages"
history_dir = "pages/history"
errors_dir = "errs"

[harvest]
format = "xml"
write_pages = false
"#;

#[test]
fn load_picks_first_existing_candidate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("slv.toml");
    fs::write(&path, SAMPLE).unwrap();

    let missing = dir.path().join("missing.toml");
    let candidates = vec![missing, path.clone()];
    let loaded = AppConfig::load_with_source(&candidates).unwrap();

    assert_eq!(loaded.source, path);
    assert_eq!(loaded.config.output.data_dir, PathBuf::from("pages"));
    assert_eq!(loaded.config.output.errors_dir, PathBuf::from("errs"));
    assert_eq!(loaded.config.harvest.format, "xml");
    assert!(!loaded.config.harvest.write_pages);
}

#[test]
fn load_reports_inspected_candidates() {
    let dir = tempdir().unwrap();
    let candidates = vec![dir.path().join("a.toml"), dir.path().join("b.toml")];
    let err = AppConfig::load(&candidates).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("a.toml"));
    assert!(message.contains("b.toml"));
}

#[test]
fn password_falls_back_to_file_value() {
    let config: AppConfig = SAMPLE.parse().unwrap();
    assert_eq!(config.service.resolve_password().unwrap(), "from-file");
}

#[test]
fn password_environment_overrides_file_value() {
    let raw = SAMPLE.replace(
        "SLV_CONFIG_TESTS_UNSET_PASSWORD",
        "SLV_CONFIG_TESTS_OVERRIDE_PASSWORD",
    );
    std::env::set_var("SLV_CONFIG_TESTS_OVERRIDE_PASSWORD", "from-env");
    let config: AppConfig = raw.parse().unwrap();
    assert_eq!(config.service.resolve_password().unwrap(), "from-env");
}

#[test]
fn shipped_example_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/slv.toml");
    let config: AppConfig = fs::read_to_string(path).unwrap().parse().unwrap();
    assert_eq!(config.harvest.counter_category, "electricalCounter");
    assert_eq!(config.output.history_dir, PathBuf::from("data/history"));
    assert!(config.service.password.is_none());
}
