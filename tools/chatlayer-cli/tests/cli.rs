use std::io::Write;
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::NamedTempFile;

fn settings_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp settings");
    writeln!(
        file,
        "channel_id: chan-1\naccess_token: secret\nverify_token: T"
    )
    .expect("write settings");
    file
}

fn json_file(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp json");
    write!(file, "{value}").expect("write json");
    file
}

fn run(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_chatlayer"))
        .env("RUST_LOG", "debug")
        .env("LOG_FORMAT", "json")
        .args(args)
        .output()
        .expect("run chatlayer CLI");
    if !output.status.success() {
        panic!(
            "CLI command {:?} failed: status={:?}\nstdout={}\nstderr={}",
            args,
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    output
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not a single JSON document ({err}):\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn encode_prints_only_the_request_body() {
    let settings = settings_file();
    let message = json_file(&json!({ "messageText": "hi" }));
    let output = run(&[
        "--config",
        settings.path().to_str().unwrap(),
        "encode",
        "--conversation-id",
        "conv-1",
        "--message",
        message.path().to_str().unwrap(),
    ]);

    assert_eq!(
        stdout_json(&output),
        json!({ "conversationId": "conv-1", "message": { "textMessage": { "text": "hi" } } })
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("telemetry installed"), "stderr={stderr}");
}

#[test]
fn ignored_webhook_prints_null_and_logs_to_stderr() {
    let settings = settings_file();
    let payload = json_file(&json!({ "verifyToken": "other", "message": { "text": "hi" } }));
    let output = run(&[
        "--config",
        settings.path().to_str().unwrap(),
        "decode",
        "--payload",
        payload.path().to_str().unwrap(),
    ]);

    assert_eq!(stdout_json(&output), Value::Null);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("webhook ignored"), "stderr={stderr}");
}
