#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "serialmq-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn serialmq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_serialmq"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("SERIALMQ_CONFIG")
        .output()
        .expect("serialmq should run")
}

#[test]
fn version_prints_package_version() {
    let output = serialmq(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("serialmq {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_as_json() {
    let output = serialmq(&["--format", "json", "version", "--extended"]);

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("version output should be json");
    assert_eq!(value["name"], "serialmq");
    assert!(value["features"]
        .as_array()
        .expect("features should be an array")
        .iter()
        .any(|f| f == "cli"));
}

#[test]
fn encode_raw_emits_framed_bytes() {
    let output = serialmq(&["--format", "raw", "encode", "M1"]);

    assert!(output.status.success());
    assert_eq!(output.stdout, vec![0x02, b'M', b'1', 0x03]);
}

#[test]
fn encode_honours_custom_delimiters() {
    let output = serialmq(&["--format", "pretty", "encode", "ok", "--stx", "1", "--etx", "4"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "01 6f 6b 04");
}

#[test]
fn encode_rejects_message_containing_delimiter() {
    let output = serialmq(&["--format", "raw", "encode", "a\u{3}b"]);

    assert_eq!(output.status.code(), Some(64));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("delimiter"));
}

#[test]
fn encode_rejects_identical_delimiters() {
    let output = serialmq(&["encode", "M1", "--stx", "7", "--etx", "7"]);

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn config_prints_effective_values_as_json() {
    let dir = unique_temp_dir("config");
    let path = dir.join("config.yaml");
    std::fs::write(
        &path,
        "serial_port: /dev/ttyACM1\nmqtt_publish_channel: lab/out\nmax_retry_attempts: 4\n",
    )
    .expect("config should write");

    let output = serialmq(&[
        "--format",
        "json",
        "config",
        "--config",
        path.to_str().expect("temp path should be utf-8"),
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config output should be json");
    assert_eq!(value["serial_port"], "/dev/ttyACM1");
    assert_eq!(value["mqtt_publish_channel"], "lab/out");
    assert_eq!(value["max_retry_attempts"], 4);
    assert_eq!(value["serial_STX"], 2);
    assert_eq!(value["wait_time_seconds"], 5.0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn config_reads_path_from_environment() {
    let dir = unique_temp_dir("config-env");
    let path = dir.join("bridge.yaml");
    std::fs::write(&path, "mqtt_port: 8883\n").expect("config should write");

    let output = Command::new(env!("CARGO_BIN_EXE_serialmq"))
        .args(["--log-level", "error", "--format", "json", "config"])
        .env("SERIALMQ_CONFIG", &path)
        .output()
        .expect("serialmq should run");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config output should be json");
    assert_eq!(value["mqtt_port"], 8883);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = unique_temp_dir("config-missing");
    let path = dir.join("absent.yaml");

    let output = serialmq(&[
        "--format",
        "json",
        "config",
        "--config",
        path.to_str().expect("temp path should be utf-8"),
    ]);

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config output should be json");
    assert_eq!(value["serial_baud"], 9600);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = unique_temp_dir("config-invalid");
    let path = dir.join("config.yaml");
    std::fs::write(&path, "serial_STX: 5\nserial_ETX: 5\n").expect("config should write");

    let output = serialmq(&[
        "config",
        "--config",
        path.to_str().expect("temp path should be utf-8"),
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("serial_STX"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = unique_temp_dir("config-unknown");
    let path = dir.join("config.yaml");
    std::fs::write(&path, "serial_prot: /dev/ttyS0\n").expect("config should write");

    let output = serialmq(&[
        "config",
        "--config",
        path.to_str().expect("temp path should be utf-8"),
    ]);

    assert_eq!(output.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn log_file_receives_debug_output() {
    let dir = unique_temp_dir("log-file");
    let log = dir.join("debug.log");
    let config = dir.join("config.yaml");
    std::fs::write(&config, "serial_port: /dev/ttyS9\n").expect("config should write");

    let output = serialmq(&[
        "--log-file",
        log.to_str().expect("temp path should be utf-8"),
        "--format",
        "json",
        "config",
        "--config",
        config.to_str().expect("temp path should be utf-8"),
    ]);

    assert!(output.status.success());
    let logged = std::fs::read_to_string(&log).expect("log file should exist");
    assert!(logged.contains("serial settings loaded"));
    assert!(output.stderr.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
