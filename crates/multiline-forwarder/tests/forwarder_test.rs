// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;

const INPUT: &str = r#"{"container":{"id":"abc","name":"/billing","labels":{"com.logspout.name":"billing"}},"source":"stderr","data":"java.lang.IllegalStateException: boom"}
{"container":{"id":"abc","name":"/billing","labels":{"com.logspout.name":"billing"}},"source":"stderr","data":"    at Billing.charge(Billing.java:42)"}
plain line
  plain continuation
{"container":{"id":"abc","name":"/billing"},"source":"stderr","data":"done"}
"#;

#[tokio::test]
async fn test_forwards_coalesced_stdin_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let mut child = Command::new(env!("CARGO_BIN_EXE_multiline-forwarder"))
        .env("LOGSTASH_ADDRESS", &address)
        .env("LOGSTASH_TRANSPORT", "tcp")
        .env("MULTILINE_JAVA_EXCEPTIONS", "true")
        .env("MULTILINE_DEFAULT_SOURCE", "app")
        .env("LOG_LEVEL", "off")
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();

    let (socket, _) = timeout(Duration::from_secs(10), listener.accept())
        .await
        .unwrap()
        .unwrap();
    {
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(INPUT.as_bytes()).unwrap();
    }

    let mut lines = BufReader::new(socket).lines();
    let mut documents = Vec::new();
    while let Some(line) = timeout(Duration::from_secs(10), lines.next_line())
        .await
        .unwrap()
        .unwrap()
    {
        documents.push(serde_json::from_str::<Value>(&line).unwrap());
    }
    assert!(child.wait().unwrap().success());

    assert_eq!(documents.len(), 3);
    let trace = documents
        .iter()
        .find(|d| d.get("exception").is_some())
        .unwrap();
    assert_eq!(
        trace["message"],
        "java.lang.IllegalStateException: boom\n    at Billing.charge(Billing.java:42)"
    );
    assert_eq!(trace["stream"], "stderr");
    assert_eq!(trace["app"]["name"], "billing");
    assert_eq!(trace["exception"]["class"], "java.lang.IllegalStateException");

    let plain = documents
        .iter()
        .find(|d| d["stream"] == "app")
        .unwrap();
    assert_eq!(plain["message"], "plain line\n  plain continuation");
    assert_eq!(plain["docker"]["id"], "");

    assert!(documents.iter().any(|d| d["message"] == "done"));
}

#[test]
fn test_missing_address_fails() {
    let status = Command::new(env!("CARGO_BIN_EXE_multiline-forwarder"))
        .env_remove("LOGSTASH_ADDRESS")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());
}
