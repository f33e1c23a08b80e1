use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Fully-qualified type tags of the nodes the transformation reads or writes.
pub mod node_types {
    pub const CHAT_TRIGGER: &str = "@n8n/n8n-nodes-langchain.chatTrigger";
    pub const FORM_TRIGGER: &str = "n8n-nodes-base.formTrigger";
    pub const WEBHOOK: &str = "n8n-nodes-base.webhook";
    pub const RESPOND_TO_WEBHOOK: &str = "n8n-nodes-base.respondToWebhook";
    pub const AGENT: &str = "@n8n/n8n-nodes-langchain.agent";
}

/// Canvas coordinates. Numbers are kept as parsed so integer positions stay integers.
pub type Position = [Number; 2];

/// Build a [`Position`] from integer coordinates.
pub fn position(
    x: i64,
    y: i64,
) -> Position {
    [Number::from(x), Number::from(y)]
}

/// A single step of a workflow.
///
/// Keys the transformation does not interpret (`credentials`, `disabled`, `notes`, ...)
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeModel {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_version: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default = "empty_object")]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl NodeModel {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            type_version: None,
            position: None,
            parameters: empty_object(),
            webhook_id: None,
            extra: Map::new(),
        }
    }

    /// Exact match on the type tag.
    pub fn is_type(
        &self,
        node_type: &str,
    ) -> bool {
        self.node_type == node_type
    }

    /// Type name without its package prefix, e.g. `agent` for `@n8n/n8n-nodes-langchain.agent`.
    pub fn local_type(&self) -> &str {
        self.node_type.rsplit('.').next().unwrap_or(&self.node_type)
    }

    /// Orchestrator nodes. Tool wrappers such as `agentTool` are not orchestrators.
    pub fn is_agent(&self) -> bool {
        let local = self.local_type();
        local.contains("agent") && !local.ends_with("Tool")
    }

    /// Model provider nodes (`lmChatOpenAi`, `lmChatAnthropic`, `lmOllama`, ...).
    pub fn is_language_model(&self) -> bool {
        self.local_type().starts_with("lm")
    }

    pub fn is_webhook(&self) -> bool {
        self.is_type(node_types::WEBHOOK)
    }

    /// Look up a parameter by key at the top level of the parameter tree.
    pub fn parameter(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.parameters.get(key)
    }
}
