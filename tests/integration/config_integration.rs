//! Configuration layering: files, ORAC_ENV and ORAC_* environment inputs.

use super::test_utils::ENV_MUTEX;
use orac::config::ConfigLoader;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "ORAC_DATA_IN",
    "ORAC_DATA_OUT",
    "ORAC_DATA_CAL",
    "ORAC_RECIPE_DIR",
    "ORAC_PRIMITIVE_DIR",
    "ORAC_INSTRUMENT",
    "ORAC_ENV",
];

/// Clears the ORAC_* variables on creation and again on drop.
struct CleanEnv;

impl CleanEnv {
    fn new() -> Self {
        for var in VARS {
            std::env::remove_var(var);
        }
        CleanEnv
    }
}

impl Drop for CleanEnv {
    fn drop(&mut self) {
        for var in VARS {
            std::env::remove_var(var);
        }
    }
}

fn workspace(base: &str, env_specific: Option<(&str, &str)>) -> TempDir {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), base).unwrap();
    if let Some((name, body)) = env_specific {
        fs::write(config_dir.join(format!("{}.toml", name)), body).unwrap();
    }
    temp
}

#[test]
fn workspace_file_sets_sections() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = CleanEnv::new();
    let ws = workspace(
        r#"
[paths]
input_dir = "/data/raw"
output_dir = "/data/reduced"

[instrument]
name = "UFTI"
prefix = "f"
group_by = ["GRPNUM", "FILTER"]

[arrival]
poll_interval_ms = 500

[engines.kappa]
program = "/star/bin/kappa"
prestart = true
"#,
        None,
    );

    let config = ConfigLoader::load(ws.path()).unwrap();
    assert_eq!(config.paths.input_dir, PathBuf::from("/data/raw"));
    assert_eq!(config.instrument.name, "UFTI");
    assert_eq!(config.instrument.group_by, vec!["GRPNUM", "FILTER"]);
    assert_eq!(config.instrument.digits, 5);
    assert_eq!(config.arrival.poll_interval_ms, 500);
    assert_eq!(config.arrival.timeout_secs, 7200);
    assert!(config.engines["kappa"].prestart);
    assert!(config.validate().is_ok());
}

#[test]
fn env_specific_file_overrides_base() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = CleanEnv::new();
    let ws = workspace(
        "[instrument]\nname = \"UFTI\"\n[arrival]\ntimeout_secs = 60\n",
        Some(("night", "[arrival]\ntimeout_secs = 600\n")),
    );
    std::env::set_var("ORAC_ENV", "night");

    let config = ConfigLoader::load(ws.path()).unwrap();
    assert_eq!(config.instrument.name, "UFTI");
    assert_eq!(config.arrival.timeout_secs, 600);
}

#[test]
fn environment_inputs_win_over_files() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = CleanEnv::new();
    let ws = workspace(
        "[paths]\ninput_dir = \"/from/file\"\n[instrument]\nname = \"UFTI\"\n",
        None,
    );
    std::env::set_var("ORAC_DATA_IN", "/from/env");
    std::env::set_var("ORAC_DATA_CAL", "/cal");
    std::env::set_var("ORAC_INSTRUMENT", "IRCAM");
    std::env::set_var("ORAC_RECIPE_DIR", "/mine:/shared");

    let config = ConfigLoader::load(ws.path()).unwrap();
    assert_eq!(config.paths.input_dir, PathBuf::from("/from/env"));
    assert_eq!(config.paths.calibration_dir(), PathBuf::from("/cal"));
    assert_eq!(config.instrument.name, "IRCAM");
    assert_eq!(
        config.paths.recipe_dirs,
        vec![PathBuf::from("/mine"), PathBuf::from("/shared")]
    );
}

#[test]
fn empty_environment_values_are_ignored() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = CleanEnv::new();
    let ws = workspace("[paths]\noutput_dir = \"/reduced\"\n", None);
    std::env::set_var("ORAC_DATA_OUT", "  ");

    let config = ConfigLoader::load(ws.path()).unwrap();
    assert_eq!(config.paths.output_dir, PathBuf::from("/reduced"));
}

#[test]
fn explicit_file_bypasses_workspace_lookup() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = CleanEnv::new();
    let ws = workspace("[instrument]\nname = \"UFTI\"\n", None);
    let other = ws.path().join("other.toml");
    fs::write(&other, "[instrument]\nname = \"SCUBA\"\n").unwrap();

    let config = ConfigLoader::load_from_file(&other).unwrap();
    assert_eq!(config.instrument.name, "SCUBA");
    assert!(ConfigLoader::load_from_file(&ws.path().join("missing.toml")).is_err());
}

#[test]
fn invalid_values_are_all_reported() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = CleanEnv::new();
    let ws = workspace(
        "[instrument]\ndigits = 0\n[arrival]\npoll_interval_ms = 0\n",
        None,
    );
    let config = ConfigLoader::load(ws.path()).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
}
