//! HTTP client for the workflow server and the webhooks of transformed workflows.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{
    Method, RequestBuilder, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue},
    multipart,
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    Config, FlowfrontError, Result,
    extract::group_by_trigger,
    model::WorkflowModel,
    utils::time_millis,
};

pub use models::{ChatReply, ChatRequest, ConnectionReport, CreateWorkflowRequest, FormSubmission, FormValue, WebhookResponse, WorkflowList};

/// Header carrying the API key. Sent on REST API calls only, never to webhooks.
pub const API_KEY_HEADER: &str = "x-n8n-api-key";
/// Page size of the workflow list request.
pub const LIST_LIMIT: usize = 100;

const USER_AGENT: &str = concat!("flowfront/", env!("CARGO_PKG_VERSION"));

/// Operations the transformation needs from a workflow server.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    async fn list_workflows(&self) -> Result<WorkflowList>;

    async fn fetch_workflow_by_name(
        &self,
        name: &str,
    ) -> Result<WorkflowModel>;

    /// Upload a new workflow and return it as stored by the server.
    async fn create_workflow(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<WorkflowModel>;

    /// POST a JSON payload to a webhook url.
    async fn invoke_webhook(
        &self,
        url: &str,
        payload: &Value,
    ) -> Result<WebhookResponse>;
}

/// Client for an n8n instance's public REST API.
#[derive(Debug, Clone)]
pub struct N8nClient {
    client: reqwest::Client,
    base_url: String,
    api_key: HeaderValue,
}

impl N8nClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(api_key).map_err(|e| FlowfrontError::Config(format!("invalid api key: {}", e)))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder().default_headers(headers).timeout(timeout).user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let url = config.instance.url.as_deref().filter(|s| !s.is_empty()).ok_or(FlowfrontError::Config("instance url is required".to_string()))?;
        let api_key = config.instance.api_key.as_deref().filter(|s| !s.is_empty()).ok_or(FlowfrontError::Config("api key is required".to_string()))?;
        Self::new(url, api_key, Duration::from_millis(config.request_timeout))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Production url of a webhook path on this instance.
    pub fn webhook_url(
        &self,
        path: &str,
    ) -> String {
        format!("{}/webhook/{}", self.base_url, path)
    }

    fn api_url(
        &self,
        path: &str,
    ) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Request against the instance's REST API, authenticated with the API key.
    fn api_request(
        &self,
        method: Method,
        url: &str,
    ) -> RequestBuilder {
        self.client.request(method, url).header(HeaderName::from_static(API_KEY_HEADER), self.api_key.clone())
    }

    /// List workflows and report which of them a front end can be generated for.
    pub async fn test_connection(&self) -> Result<ConnectionReport> {
        let list = self.list_workflows().await?;
        let groups = group_by_trigger(&list.data);
        let report = ConnectionReport {
            workflow_count: list.data.iter().filter(|wf| !wf.is_archived && wf.trigger_type().is_some()).count(),
            chat_workflows: groups.chat_names().into_iter().map(str::to_string).collect(),
            form_workflows: groups.form_names().into_iter().map(str::to_string).collect(),
            has_more: list.next_cursor.is_some_and(|cursor| !cursor.is_empty()),
        };
        info!(chat = report.chat_workflows.len(), form = report.form_workflows.len(), has_more = report.has_more, "connected to {}", self.base_url);
        Ok(report)
    }

    /// Send one chat message to a transformed chat workflow and read its answer.
    pub async fn send_chat_message(
        &self,
        url: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(FlowfrontError::Validation("message is required".to_string()));
        }
        let request = ChatRequest {
            message: message.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: session_id.filter(|s| !s.is_empty()).map(str::to_string),
        };

        let start = time_millis();
        let response = self.invoke_webhook(url, &serde_json::to_value(&request)?).await?;
        let elapsed_ms = time_millis() - start;

        Ok(ChatReply {
            response: ChatReply::reply_text(&response.body).trim().to_string(),
            status: response.status,
            elapsed_ms,
            raw: response.body,
        })
    }

    /// Submit a form workflow's webhook as multipart form data.
    pub async fn submit_form(
        &self,
        url: &str,
        submission: FormSubmission,
    ) -> Result<WebhookResponse> {
        let mut form = multipart::Form::new();
        for (key, value) in submission.parts {
            form = match value {
                FormValue::Text(text) => form.text(key, text),
                FormValue::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(content_type) = content_type {
                        part = part.mime_str(&content_type).map_err(|e| FlowfrontError::Validation(format!("invalid content type '{}': {}", content_type, e)))?;
                    }
                    form.part(key, part)
                }
            };
        }

        debug!(url = %url, "submitting form");
        let response = self.client.post(url).multipart(form).send().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "message": text }));

        if !status.is_success() {
            return Err(webhook_error(status, &body));
        }
        Ok(WebhookResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        debug!(url = %url, "GET");
        let response = self.api_request(Method::GET, url).query(query).send().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
        read_json(response).await
    }
}

#[async_trait]
impl WorkflowService for N8nClient {
    async fn list_workflows(&self) -> Result<WorkflowList> {
        let limit = LIST_LIMIT.to_string();
        let value = self.get_json(&self.api_url("workflows"), &[("limit", limit.as_str()), ("active", "false")]).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fetch_workflow_by_name(
        &self,
        name: &str,
    ) -> Result<WorkflowModel> {
        let list = self.list_workflows().await?;
        let Some(summary) = list.data.iter().find(|wf| wf.name == name) else {
            return Err(FlowfrontError::NotFound(format!("workflow \"{}\" not found", name)));
        };

        let value = self.get_json(&self.api_url(&format!("workflows/{}", summary.id)), &[]).await?;
        WorkflowModel::from_value(value)
    }

    async fn create_workflow(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<WorkflowModel> {
        let url = self.api_url("workflows");
        debug!(url = %url, name = %workflow.name, "POST");
        let response = self.api_request(Method::POST, &url).json(&CreateWorkflowRequest::from(workflow)).send().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
        let created = WorkflowModel::from_value(read_json(response).await?)?;
        info!(id = ?created.id, name = %created.name, "workflow created");
        Ok(created)
    }

    async fn invoke_webhook(
        &self,
        url: &str,
        payload: &Value,
    ) -> Result<WebhookResponse> {
        debug!(url = %url, "invoking webhook");
        let response = self.client.post(url).json(payload).send().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "response": text }));

        if !status.is_success() {
            return Err(webhook_error(status, &body));
        }
        Ok(WebhookResponse {
            status: status.as_u16(),
            body,
        })
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(|e| FlowfrontError::Network(e.to_string()))?;
    debug!(status = status.as_u16(), "response");

    if !status.is_success() {
        return Err(api_error(status, text));
    }
    Ok(serde_json::from_str(&text)?)
}

fn api_error(
    status: StatusCode,
    body: String,
) -> FlowfrontError {
    warn!(status = status.as_u16(), body = %body, "workflow server returned an error");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FlowfrontError::Auth("invalid API key or insufficient permissions".to_string()),
        StatusCode::NOT_FOUND => FlowfrontError::NotFound(body),
        StatusCode::BAD_REQUEST => FlowfrontError::Validation(body),
        _ => FlowfrontError::Http {
            status: status.as_u16(),
            message: body,
        },
    }
}

fn webhook_error(
    status: StatusCode,
    body: &Value,
) -> FlowfrontError {
    warn!(status = status.as_u16(), "webhook returned an error");
    FlowfrontError::Http {
        status: status.as_u16(),
        message: format!("webhook returned error: {}", body),
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, body_partial_json, header, method, path, query_param},
    };

    use super::*;
    use crate::{
        extract::FormSettings,
        transform::{Flavor, Transformer},
    };

    fn client(server: &MockServer) -> N8nClient {
        N8nClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    fn list_body() -> Value {
        json!({
            "data": [
                { "id": "1", "name": "Support bot", "isArchived": false, "nodes": [{ "name": "Chat", "type": "@n8n/n8n-nodes-langchain.chatTrigger" }] },
                { "id": "2", "name": "Contact", "nodes": [{ "name": "Form", "type": "n8n-nodes-base.formTrigger" }] },
                { "id": "3", "name": "Archived bot", "isArchived": true, "nodes": [{ "name": "Chat", "type": "@n8n/n8n-nodes-langchain.chatTrigger" }] },
                { "id": "4", "name": "Hybrid", "nodes": [
                    { "name": "Form", "type": "n8n-nodes-base.formTrigger" },
                    { "name": "Chat", "type": "@n8n/n8n-nodes-langchain.chatTrigger" }
                ] }
            ],
            "nextCursor": "abc"
        })
    }

    async fn mount_list(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/v1/workflows"))
            .and(query_param("limit", "100"))
            .and(query_param("active", "false"))
            .and(header(API_KEY_HEADER, "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body()))
            .mount(server)
            .await;
    }

    fn stored_workflow() -> Value {
        json!({
            "id": "1",
            "name": "Support bot",
            "active": false,
            "nodes": [
                { "id": "t", "name": "When chat message received", "type": "@n8n/n8n-nodes-langchain.chatTrigger", "position": [0, 0], "parameters": {} },
                { "id": "a", "name": "AI Agent", "type": "@n8n/n8n-nodes-langchain.agent", "position": [200, 0], "parameters": {} }
            ],
            "connections": {
                "When chat message received": { "main": [[{ "node": "AI Agent", "type": "main", "index": 0 }]] }
            },
            "settings": {}
        })
    }

    // ==================== workflow api ====================

    #[tokio::test]
    async fn test_connection_report() {
        let server = MockServer::start().await;
        mount_list(&server).await;

        let report = client(&server).test_connection().await.unwrap();
        assert_eq!(report.chat_workflows, vec!["Support bot", "Hybrid"]);
        assert_eq!(report.form_workflows, vec!["Contact", "Hybrid"]);
        assert_eq!(report.workflow_count, 3);
        assert!(report.has_more);
    }

    #[tokio::test]
    async fn test_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/api/v1/workflows")).respond_with(ResponseTemplate::new(401).set_body_string("unauthorized")).mount(&server).await;

        let result = client(&server).list_workflows().await;
        assert!(matches!(result, Err(FlowfrontError::Auth(_))));
    }

    #[tokio::test]
    async fn test_fetch_workflow_by_name() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        Mock::given(method("GET")).and(path("/api/v1/workflows/1")).respond_with(ResponseTemplate::new(200).set_body_json(stored_workflow())).mount(&server).await;

        let workflow = client(&server).fetch_workflow_by_name("Support bot").await.unwrap();
        assert_eq!(workflow.id.as_deref(), Some("1"));
        assert_eq!(workflow.nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_unknown_name() {
        let server = MockServer::start().await;
        mount_list(&server).await;

        let result = client(&server).fetch_workflow_by_name("Nope").await;
        assert!(matches!(result, Err(FlowfrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_transformed_workflow() {
        let server = MockServer::start().await;
        let source = WorkflowModel::from_value(stored_workflow()).unwrap();
        let output = Transformer::new().transform(&source, Flavor::Chat).unwrap().into_output().unwrap();
        let upload = output.finalize();

        let mut created = serde_json::to_value(&upload).unwrap();
        created["id"] = json!("99");
        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .and(body_json(serde_json::to_value(CreateWorkflowRequest::from(&upload)).unwrap()))
            .respond_with(ResponseTemplate::new(200).set_body_json(created))
            .mount(&server)
            .await;

        let stored = client(&server).create_workflow(&upload).await.unwrap();
        assert_eq!(stored.id.as_deref(), Some("99"));
        assert!(stored.name.ends_with("-FINAL"));
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/api/v1/workflows")).respond_with(ResponseTemplate::new(400).set_body_string("request/body must have required property 'settings'")).mount(&server).await;

        let result = client(&server).create_workflow(&WorkflowModel::new("x")).await;
        assert!(matches!(result, Err(FlowfrontError::Validation(_))));
    }

    #[tokio::test]
    async fn test_network_error() {
        let client = N8nClient::new("http://127.0.0.1:9", "k", Duration::from_millis(500)).unwrap();
        let result = client.list_workflows().await;
        assert!(matches!(result, Err(FlowfrontError::Network(_))));
    }

    // ==================== webhooks ====================

    #[tokio::test]
    async fn test_send_chat_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/abc"))
            .and(body_partial_json(json!({ "message": "hello", "sessionId": "s1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": "  Hi there!  " })))
            .mount(&server)
            .await;

        let client = client(&server);
        let reply = client.send_chat_message(&client.webhook_url("abc"), "  hello ", Some("s1")).await.unwrap();
        assert_eq!(reply.response, "Hi there!");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.raw, json!({ "output": "  Hi there!  " }));
    }

    #[tokio::test]
    async fn test_webhook_calls_omit_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/webhook/abc")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": "ok" }))).mount(&server).await;
        Mock::given(method("POST")).and(path("/webhook/form")).respond_with(ResponseTemplate::new(200).set_body_string("ok")).mount(&server).await;

        let client = client(&server);
        client.send_chat_message(&client.webhook_url("abc"), "hi", None).await.unwrap();
        client.invoke_webhook(&client.webhook_url("abc"), &json!({ "message": "hi" })).await.unwrap();
        client.submit_form(&client.webhook_url("form"), FormSubmission::new()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|request| request.headers.get(API_KEY_HEADER).is_none()));
    }

    #[tokio::test]
    async fn test_chat_plain_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/webhook/abc")).respond_with(ResponseTemplate::new(200).set_body_string("plain answer")).mount(&server).await;

        let client = client(&server);
        let reply = client.send_chat_message(&client.webhook_url("abc"), "hi", None).await.unwrap();
        assert_eq!(reply.response, "plain answer");
    }

    #[tokio::test]
    async fn test_chat_empty_message() {
        let server = MockServer::start().await;
        let client = client(&server);
        let result = client.send_chat_message(&client.webhook_url("abc"), "   ", None).await;
        assert!(matches!(result, Err(FlowfrontError::Validation(_))));
    }

    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/webhook/abc")).respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not registered" }))).mount(&server).await;

        let client = client(&server);
        let result = client.invoke_webhook(&client.webhook_url("abc"), &json!({})).await;
        assert!(matches!(result, Err(FlowfrontError::Http { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_submit_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/webhook/form")).respond_with(ResponseTemplate::new(200).set_body_string("Workflow was started")).mount(&server).await;

        let settings: FormSettings = serde_json::from_value(json!({
            "formTitle": "Apply",
            "formFields": [{ "fieldLabel": "Full Name" }, { "fieldLabel": "Resume", "fieldType": "file" }]
        }))
        .unwrap();
        let submission = FormSubmission::new().text(&settings.form_fields[0], "Jane").file(&settings.form_fields[1], "cv.txt", Some("text/plain".to_string()), b"hello".to_vec());

        let client = client(&server);
        let response = client.submit_form(&client.webhook_url("form"), submission).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({ "message": "Workflow was started" }));
    }

    #[test]
    fn test_from_config_requires_instance() {
        let result = N8nClient::from_config(&Config::default());
        assert!(matches!(result, Err(FlowfrontError::Config(_))));
    }

    #[test]
    fn test_webhook_url() {
        let client = N8nClient::new("https://n8n.example.com/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(client.webhook_url("p1"), "https://n8n.example.com/webhook/p1");
    }
}
