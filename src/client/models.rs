use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    extract::{FormField, FormSettings, WorkflowSummary},
    model::{Connections, NodeModel, WorkflowModel},
};

/// Keys the chat reply text is looked up under, in order.
const REPLY_KEYS: [&str; 4] = ["response", "message", "text", "output"];

/// One page of `GET /api/v1/workflows`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowList {
    #[serde(default)]
    pub data: Vec<WorkflowSummary>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Body of `POST /api/v1/workflows`. The server rejects read-only keys, so only
/// these four are sent.
#[derive(Debug, Serialize)]
pub struct CreateWorkflowRequest<'a> {
    pub name: &'a str,
    pub nodes: &'a [NodeModel],
    pub connections: &'a Connections,
    pub settings: &'a Value,
}

impl<'a> From<&'a WorkflowModel> for CreateWorkflowRequest<'a> {
    fn from(workflow: &'a WorkflowModel) -> Self {
        Self {
            name: &workflow.name,
            nodes: &workflow.nodes,
            connections: &workflow.connections,
            settings: &workflow.settings,
        }
    }
}

/// Result of probing an instance with its API key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    /// Distinct workflows with a chat or form trigger.
    pub workflow_count: usize,
    pub chat_workflows: Vec<String>,
    pub form_workflows: Vec<String>,
    /// The server holds more workflows than one page returned.
    pub has_more: bool,
}

/// Payload a transformed chat workflow's webhook expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Reply text, trimmed.
    pub response: String,
    pub status: u16,
    pub elapsed_ms: i64,
    pub raw: Value,
}

impl ChatReply {
    /// Reply text of a webhook answer: the body itself when it is a string, else
    /// the first string among `response`, `message`, `text`, `output`, else the
    /// body as JSON text.
    pub fn reply_text(body: &Value) -> String {
        if let Value::String(s) = body {
            return s.clone();
        }
        REPLY_KEYS.iter().find_map(|key| body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())).map(str::to_string).unwrap_or_else(|| body.to_string())
    }
}

/// Status and decoded body of a webhook call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Multipart entries for a form workflow's webhook, keyed the way the
/// transformed workflow reads them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmission {
    pub(crate) parts: Vec<(String, FormValue)>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(
        mut self,
        field: &FormField,
        value: impl Into<String>,
    ) -> Self {
        self.parts.push((field.webhook_key(), FormValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        field: &FormField,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            field.webhook_key(),
            FormValue::File {
                file_name: file_name.into(),
                content_type,
                bytes,
            },
        ));
        self
    }

    pub fn parts(&self) -> &[(String, FormValue)] {
        &self.parts
    }

    /// Labels of required fields with no entry.
    pub fn missing_required<'a>(
        &self,
        settings: &'a FormSettings,
    ) -> Vec<&'a str> {
        settings.required_fields().filter(|field| !self.parts.iter().any(|(key, _)| *key == field.webhook_key())).map(|field| field.field_label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reply_text() {
        assert_eq!(ChatReply::reply_text(&json!("plain")), "plain");
        assert_eq!(ChatReply::reply_text(&json!({ "output": "from agent" })), "from agent");
        assert_eq!(ChatReply::reply_text(&json!({ "text": "t", "output": "o" })), "t");
        assert_eq!(ChatReply::reply_text(&json!({ "response": 1, "message": "m" })), "m");
        assert_eq!(ChatReply::reply_text(&json!({ "data": [1] })), r#"{"data":[1]}"#);
    }

    #[test]
    fn test_create_request_sends_only_writable_keys() {
        let workflow = WorkflowModel::from_value(json!({
            "id": "wf1",
            "name": "Flow",
            "active": true,
            "versionId": "v",
            "nodes": [],
            "connections": {},
            "settings": { "executionOrder": "v1" }
        }))
        .unwrap();
        let value = serde_json::to_value(CreateWorkflowRequest::from(&workflow)).unwrap();
        assert_eq!(value, json!({ "name": "Flow", "nodes": [], "connections": {}, "settings": { "executionOrder": "v1" } }));
    }

    #[test]
    fn test_chat_request_without_session() {
        let request = ChatRequest {
            message: "hi".to_string(),
            timestamp: "2025-01-01T00:00:00.000Z".to_string(),
            session_id: None,
        };
        assert_eq!(serde_json::to_value(request).unwrap(), json!({ "message": "hi", "timestamp": "2025-01-01T00:00:00.000Z" }));
    }

    #[test]
    fn test_form_submission_keys() {
        let settings: FormSettings = serde_json::from_value(json!({
            "formTitle": "Apply",
            "formFields": [
                { "fieldLabel": "Full Name", "requiredField": true },
                { "fieldLabel": "Resume", "fieldType": "file", "requiredField": true },
                { "fieldLabel": "Note" }
            ]
        }))
        .unwrap();

        let submission = FormSubmission::new().text(&settings.form_fields[0], "Jane").text(&settings.form_fields[2], "hi");
        assert_eq!(submission.parts()[0].0, "Full_Name");
        assert_eq!(submission.missing_required(&settings), vec!["Resume"]);

        let submission = submission.file(&settings.form_fields[1], "cv.pdf", Some("application/pdf".to_string()), vec![1, 2]);
        assert!(submission.missing_required(&settings).is_empty());
    }
}
