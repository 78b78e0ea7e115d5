//! Command-line and environment configuration
//!
//! Tests that set TOTEM_* variables are marked #[serial] so they do not race.

use clap::Parser;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;
use totem_common::config::TomlConfig;
use totem_player::config::{Args, PlayerConfig};

#[test]
#[serial]
fn test_env_supplies_device_and_port() {
    env::set_var("TOTEM_DEVICE_ID", "env-device");
    env::set_var("TOTEM_PORT", "6100");

    let args = Args::try_parse_from(["totem-player"]).unwrap();
    let config = PlayerConfig::resolve(&args, &TomlConfig::default());

    env::remove_var("TOTEM_DEVICE_ID");
    env::remove_var("TOTEM_PORT");

    assert_eq!(config.device_id.as_deref(), Some("env-device"));
    assert_eq!(config.port, 6100);
}

#[test]
#[serial]
fn test_flag_beats_env() {
    env::set_var("TOTEM_DEVICE_ID", "env-device");

    let args = Args::try_parse_from(["totem-player", "--device-id", "flag-device"]).unwrap();

    env::remove_var("TOTEM_DEVICE_ID");

    assert_eq!(args.device_id.as_deref(), Some("flag-device"));
}

#[test]
#[serial]
fn test_toml_file_under_flags() {
    env::remove_var("TOTEM_PORT");
    env::remove_var("TOTEM_API_URL");
    env::remove_var("TOTEM_DEVICE_ID");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
port = 5999
api_url = "http://signage.local:3001/"
device_id = "toml-device"

[logging]
level = "debug"
"#
    )
    .unwrap();

    let path = file.path().to_string_lossy().to_string();
    let args = Args::try_parse_from(["totem-player", "--config", &path, "--port", "6001"]).unwrap();
    let config = PlayerConfig::load(&args).unwrap();

    assert_eq!(config.port, 6001);
    assert_eq!(config.api_url, "http://signage.local:3001");
    assert_eq!(config.device_id.as_deref(), Some("toml-device"));
    assert_eq!(config.log_level, "debug");
}
