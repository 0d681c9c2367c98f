//! Unit tests for HarnessConfig file loading

use clap::Parser;
use core_types::HarnessError;
use std::io::Write;
use std::time::Duration;
use step_timing::{Cli, HarnessConfig};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_config_file() {
    let file = write_config(
        r#"{
            "measurementMethod": "async",
            "warmupBeforeSync": 5,
            "waitBeforeSync": 20,
            "iterations": 3,
            "frameIntervalMs": 10,
            "stepTimeoutMs": 2500
        }"#,
    );

    let config = HarnessConfig::from_file(file.path()).unwrap();
    assert_eq!(config.params.measurement_method, "async");
    assert_eq!(config.params.warmup_before_sync(), Some(5.0));
    assert_eq!(config.params.wait_before_sync(), Ok(Some(Duration::from_millis(20))));
    assert_eq!(config.iterations, 3);
    assert_eq!(
        config.event_loop_config().unwrap().frame_interval,
        Duration::from_millis(10)
    );
    assert_eq!(config.step_timeout(), Ok(Some(Duration::from_millis(2500))));
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = HarnessConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn unknown_method_in_file_is_rejected() {
    let file = write_config(r#"{"measurementMethod": "bogus"}"#);
    assert_eq!(
        HarnessConfig::from_file(file.path()),
        Err(HarnessError::UnknownMeasurementMethod("bogus".to_string()))
    );
}

#[test]
fn flags_override_file_values() {
    let file = write_config(r#"{"measurementMethod": "async", "iterations": 5}"#);
    let config = HarnessConfig::from_file(file.path()).unwrap();

    let cli = Cli::try_parse_from([
        "step-bench",
        "--config",
        file.path().to_str().unwrap(),
        "--measurement-method",
        "raf",
        "--use-async-steps",
    ])
    .unwrap();
    let config = cli.apply(config);

    assert_eq!(config.params.measurement_method, "raf");
    assert!(config.params.use_async_steps);
    assert_eq!(config.iterations, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn oversized_values_in_file_are_rejected() {
    for contents in [
        r#"{"stepTimeoutMs": 1e30}"#,
        r#"{"waitBeforeSync": 1e30}"#,
        r#"{"warmupBeforeSync": 1e30}"#,
        r#"{"frameIntervalMs": 1e30}"#,
    ] {
        let file = write_config(contents);
        let err = HarnessConfig::from_file(file.path()).unwrap_err();
        assert!(
            matches!(err, HarnessError::InvalidConfig(_)),
            "{} gave {:?}",
            contents,
            err
        );
    }
}

#[test]
fn oversized_flag_overrides_valid_file() {
    let file = write_config(r#"{"waitBeforeSync": 20}"#);
    let config = HarnessConfig::from_file(file.path()).unwrap();

    let cli = Cli::try_parse_from(["step-bench", "--wait-before-sync", "1e30"]).unwrap();
    let config = cli.apply(config);
    assert!(config.validate().unwrap_err().is_config_error());
    assert!(config.params.wait_before_sync().is_err());
}

#[test]
fn runner_override_from_file() {
    let file = write_config(r#"{"runner": "remote"}"#);
    let config = HarnessConfig::from_file(file.path()).unwrap();
    assert_eq!(config.runner_kind(), Ok(Some(step_timing::RunnerKind::Remote)));
}
