// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns coalesced records into Logstash JSON documents.
//!
//! Plain text records are wrapped:
//!
//! ```json
//! {"message": "...", "stream": "stdout", "docker": {...}, "app": {...}}
//! ```
//!
//! Records whose text already is a JSON object keep their fields and get the
//! `docker` and `app` objects merged in.

use crate::constants::DEFAULT_LABEL_PREFIX;
use crate::errors::Emission;
use crate::message::{CoalescedRecord, Container};
use serde::Serialize;
use serde_json::{Map, Value};

/// Post-processing applied to the JSON fields of a record before it is
/// serialized.
pub trait RecordStage: Send + Sync {
    fn apply(&self, record: &CoalescedRecord, fields: &mut Map<String, Value>);
}

#[derive(Debug, Serialize)]
struct DockerInfo<'a> {
    name: &'a str,
    id: &'a str,
    image: &'a str,
    hostname: &'a str,
}

impl<'a> From<&'a Container> for DockerInfo<'a> {
    fn from(container: &'a Container) -> Self {
        Self {
            name: &container.name,
            id: &container.id,
            image: &container.image,
            hostname: &container.hostname,
        }
    }
}

#[derive(Debug, Serialize)]
struct AppInfo<'a> {
    name: &'a str,
    env: &'a str,
    version: &'a str,
}

#[derive(Debug, Serialize)]
struct LogstashMessage<'a> {
    message: &'a str,
    stream: &'a str,
    docker: DockerInfo<'a>,
    app: AppInfo<'a>,
}

pub struct Enricher {
    label_prefix: String,
    stages: Vec<Box<dyn RecordStage>>,
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_PREFIX)
    }
}

impl Enricher {
    /// `label_prefix` selects the container labels read into the `app`
    /// object: `<prefix>.name`, `<prefix>.env` and `<prefix>.version`.
    #[must_use]
    pub fn new(label_prefix: impl Into<String>) -> Self {
        Self {
            label_prefix: label_prefix.into(),
            stages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_stage(mut self, stage: impl RecordStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Serializes `record` into one JSON document, without trailing newline.
    pub fn serialize(&self, record: &CoalescedRecord) -> Result<Vec<u8>, Emission> {
        let container = &record.origin.container;
        let app = self.app_info(container);

        let mut fields = match serde_json::from_str::<Map<String, Value>>(&record.text) {
            Ok(mut fields) => {
                fields.insert("docker".to_string(), serde_json::to_value(DockerInfo::from(container))?);
                fields.insert("app".to_string(), serde_json::to_value(&app)?);
                fields
            }
            Err(_) => {
                let message = LogstashMessage {
                    message: &record.text,
                    stream: &record.origin.source,
                    docker: DockerInfo::from(container),
                    app,
                };
                match serde_json::to_value(&message)? {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                }
            }
        };

        for stage in &self.stages {
            stage.apply(record, &mut fields);
        }

        Ok(serde_json::to_vec(&fields)?)
    }

    fn app_info<'a>(&self, container: &'a Container) -> AppInfo<'a> {
        let label = |suffix: &str| {
            container
                .labels
                .get(&format!("{}.{}", self.label_prefix, suffix))
                .map_or("", String::as_str)
        };
        AppInfo {
            name: label("name"),
            env: label("env"),
            version: label("version"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::java_exception::JavaExceptionStage;
    use crate::message::Origin;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn container() -> Container {
        Container {
            id: "ID".to_string(),
            name: "name".to_string(),
            image: "image".to_string(),
            hostname: "hostname".to_string(),
            labels: HashMap::from([
                ("com.logspout.name".to_string(), "billing".to_string()),
                ("com.logspout.env".to_string(), "prod".to_string()),
                ("com.logspout.version".to_string(), "1.2.3".to_string()),
            ]),
        }
    }

    fn record(text: &str) -> CoalescedRecord {
        let origin = Arc::new(Origin::new(container(), "FOOOOO"));
        CoalescedRecord {
            source_key: origin.source_key(),
            text: text.to_string(),
            arrival_time: SystemTime::now(),
            emitted_at: SystemTime::now(),
            origin,
        }
    }

    fn to_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_plain_text_is_wrapped() {
        let document = to_json(&Enricher::default().serialize(&record("Line1\n   Line1.1")).unwrap());

        assert_eq!(document["message"], "Line1\n   Line1.1");
        assert_eq!(document["stream"], "FOOOOO");
        assert_eq!(document["docker"]["name"], "name");
        assert_eq!(document["docker"]["id"], "ID");
        assert_eq!(document["docker"]["image"], "image");
        assert_eq!(document["docker"]["hostname"], "hostname");
        assert_eq!(document["app"]["name"], "billing");
        assert_eq!(document["app"]["env"], "prod");
        assert_eq!(document["app"]["version"], "1.2.3");
    }

    #[test]
    fn test_json_text_is_merged() {
        let text = r#"{ "remote_user": "-", "body_bytes_sent": "25", "request_time": "0.821", "status": "200", "request_method": "POST" }"#;
        let document = to_json(&Enricher::default().serialize(&record(text)).unwrap());

        assert_eq!(document["remote_user"], "-");
        assert_eq!(document["body_bytes_sent"], "25");
        assert_eq!(document["request_time"], "0.821");
        assert_eq!(document["status"], "200");
        assert_eq!(document["request_method"], "POST");
        assert_eq!(document["docker"]["id"], "ID");
        assert_eq!(document["app"]["env"], "prod");
        assert!(document.get("message").is_none());
    }

    #[test]
    fn test_json_scalar_is_treated_as_text() {
        let document = to_json(&Enricher::default().serialize(&record("42")).unwrap());
        assert_eq!(document["message"], "42");
    }

    #[test]
    fn test_custom_label_prefix_and_missing_labels() {
        let document = to_json(&Enricher::new("org.example").serialize(&record("x")).unwrap());
        assert_eq!(document["app"]["name"], "");
        assert_eq!(document["app"]["env"], "");
        assert_eq!(document["app"]["version"], "");
    }

    #[test]
    fn test_stage_adds_exception_fields() {
        let enricher = Enricher::default().with_stage(JavaExceptionStage::new().unwrap());
        let document = to_json(
            &enricher
                .serialize(&record(
                    "java.lang.IllegalStateException: boom\n    at Main.main(Main.java:3)",
                ))
                .unwrap(),
        );
        assert_eq!(document["exception"]["class"], "java.lang.IllegalStateException");
        assert_eq!(document["exception"]["message"], "boom");
        assert_eq!(document["exception"]["frames"], 1);
    }

    #[test]
    fn test_stage_leaves_plain_records_alone() {
        let enricher = Enricher::default().with_stage(JavaExceptionStage::new().unwrap());
        let document = to_json(&enricher.serialize(&record("line1\n  line1.1")).unwrap());
        assert!(document.get("exception").is_none());
    }
}
