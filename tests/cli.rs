use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use zeroapi_json::NormalizedSpec;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zeroapi-json"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

#[test]
fn missing_argument_prints_usage_and_no_json() {
    let output = run(&[]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "no JSON on stdout");
    assert!(stderr(&output).to_lowercase().contains("usage"), "{}", stderr(&output));
}

#[test]
fn single_file_pretty_by_default() {
    let output = run(&[&fixture("order.api")]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("{\n  \"syntax\": \"v1\""), "{text}");
    let spec = NormalizedSpec::from_json(&text).unwrap();
    assert_eq!(spec.services[0].routes.len(), 5);
}

#[test]
fn compact_flag_emits_one_line() {
    let output = run(&["--compact", &fixture("minimal.api")]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert_eq!(text.trim_end().lines().count(), 1, "{text}");
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["services"][0]["name"], "ping-api");
}

#[test]
fn parse_failure_exits_non_zero_with_diagnostic() {
    let output = run(&[&fixture("broken.api")]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let err = stderr(&output);
    assert!(err.contains("broken.api:4:11"), "{err}");
    assert!(err.contains("unterminated struct tag"), "{err}");
}

#[test]
fn missing_file_is_reported() {
    let output = run(&["does-not-exist.api"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("input file does not exist"), "{}", stderr(&output));
}

#[test]
fn batch_mode_keys_by_path_and_keeps_going() {
    let order = fixture("order.api");
    let broken = fixture("broken.api");
    let minimal = fixture("minimal.api");
    let output = run(&[&order, &broken, &minimal]);
    assert!(!output.status.success(), "one file failed, so the run fails");

    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let object = value.as_object().unwrap();
    let keys: Vec<&String> = object.keys().collect();
    assert_eq!(keys, vec![&order, &broken, &minimal], "input order kept");
    assert_eq!(value[&order]["services"][0]["name"], "order-api");
    assert!(value[&broken]["error"].as_str().unwrap().contains("unterminated struct tag"));
    assert_eq!(value[&minimal]["services"][0]["routes"][0]["handler"], "Ping");
}

#[test]
fn glob_input_uses_batch_output() {
    let pattern = fixture("m*.api");
    let output = run(&["--compact", &pattern]);
    assert!(output.status.success(), "{}", stderr(&output));
    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(object.keys().all(|k| k.ends_with("minimal.api")));
}

#[test]
fn out_flag_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested/out.json");
    let output = run(&["-o", target.to_str().unwrap(), &fixture("order.api")]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(output.stdout.is_empty(), "nothing on stdout when --out is set");

    let written = std::fs::read_to_string(&target).unwrap();
    let spec = NormalizedSpec::from_json(&written).unwrap();
    assert_eq!(spec.info.title, "Order Service");
}
