use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::instrument;

use taskbot_core::export::{ExportError, ExportOutcome, SheetExporter};
use taskbot_core::task::Task;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP bridge to the spreadsheet service. POSTs the owner's task set
/// and tolerates both response shapes the contract allows.
pub struct HttpSheetExporter {
    http: Client,
    endpoint: String,
}

impl HttpSheetExporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SheetExporter for HttpSheetExporter {
    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    async fn export(
        &self,
        tasks: &[Task],
        owner_label: &str,
    ) -> Result<ExportOutcome, ExportError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "owner": owner_label, "tasks": tasks }))
            .send()
            .await
            .map_err(|e| ExportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Service(format!("status {status}: {body}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ExportError::Service(format!("invalid response body: {e}")))?;
        decode_outcome(payload)
    }
}

/// Decode the tolerant response union: a JSON string is already the URL;
/// an object may carry any subset of url/tab/gid/tab_name, with numbers
/// accepted where strings are expected.
pub(crate) fn decode_outcome(payload: Value) -> Result<ExportOutcome, ExportError> {
    match payload {
        Value::String(url) => Ok(ExportOutcome::Url(url)),
        Value::Object(fields) => Ok(ExportOutcome::Sheet {
            url: field_string(&fields, "url"),
            tab: field_string(&fields, "tab"),
            gid: field_string(&fields, "gid"),
            tab_name: field_string(&fields, "tab_name"),
        }),
        other => Err(ExportError::Service(format!(
            "unexpected response shape: {other}"
        ))),
    }
}

fn field_string(fields: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stand-in for deployments without an export service; every job fails
/// with a configuration error and the user gets the generic message.
pub struct UnconfiguredExporter;

#[async_trait]
impl SheetExporter for UnconfiguredExporter {
    async fn export(
        &self,
        _tasks: &[Task],
        _owner_label: &str,
    ) -> Result<ExportOutcome, ExportError> {
        Err(ExportError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbot_core::ids::{ChatId, TaskId};
    use taskbot_core::task::{Category, TaskStatus};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn one_task() -> Vec<Task> {
        vec![Task {
            id: TaskId(1),
            owner: ChatId(5),
            title: "Fix bug".into(),
            description: String::new(),
            category: Category::Development,
            status: TaskStatus::Open,
            created_at: "2026-01-01T00:00:00Z".into(),
        }]
    }

    #[test]
    fn decode_bare_string() {
        let outcome = decode_outcome(json!("https://x/y")).unwrap();
        assert_eq!(outcome, ExportOutcome::Url("https://x/y".into()));
    }

    #[test]
    fn decode_structured_with_numeric_gid() {
        let outcome = decode_outcome(json!({ "gid": 42 })).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Sheet {
                url: None,
                tab: None,
                gid: Some("42".into()),
                tab_name: None,
            }
        );
    }

    #[test]
    fn decode_structured_full() {
        let outcome =
            decode_outcome(json!({ "url": "https://u", "tab": "alice", "extra": [1, 2] })).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Sheet {
                url: Some("https://u".into()),
                tab: Some("alice".into()),
                gid: None,
                tab_name: None,
            }
        );
    }

    #[test]
    fn decode_rejects_other_shapes() {
        assert!(decode_outcome(json!([1, 2, 3])).is_err());
        assert!(decode_outcome(json!(17)).is_err());
    }

    #[tokio::test]
    async fn export_posts_owner_and_tasks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/export"))
            .and(body_partial_json(json!({ "owner": "alice" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "url": "https://sheet", "tab": "alice" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let exporter = HttpSheetExporter::new(format!("{}/export", server.uri()));
        let outcome = exporter.export(&one_task(), "alice").await.unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Sheet {
                url: Some("https://sheet".into()),
                tab: Some("alice".into()),
                gid: None,
                tab_name: None,
            }
        );
    }

    #[tokio::test]
    async fn non_success_status_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let exporter = HttpSheetExporter::new(server.uri());
        let err = exporter.export(&one_task(), "alice").await.unwrap_err();
        assert!(matches!(err, ExportError::Service(_)));
    }

    #[tokio::test]
    async fn unconfigured_exporter_always_fails() {
        let err = UnconfiguredExporter
            .export(&one_task(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NotConfigured));
    }
}
