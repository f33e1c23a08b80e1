use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::{
    model::{NodeModel, WorkflowModel, node_types},
    transform::find_trigger,
};

const DEFAULT_CHAT_TITLE: &str = "Chat Interface";

/// Sampling options found under the trigger's `options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySettings {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_messages: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub settings: Value,
}

impl ConnectedNode {
    fn from_node(node: &NodeModel) -> Self {
        Self {
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            model: text_value(&node.parameters, "model"),
            settings: node.parameters.clone(),
        }
    }
}

/// Direct successors of the chat trigger that matter to a chat front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedNodes {
    pub ai_models: Vec<ConnectedNode>,
    pub agents: Vec<ConnectedNode>,
}

impl ConnectedNodes {
    /// Classify the trigger's successors. `None` when the trigger has no
    /// outgoing edges or the connection map is broken.
    pub fn analyze(
        workflow: &WorkflowModel,
        trigger_name: &str,
    ) -> Option<ConnectedNodes> {
        let successors = match workflow.successors(trigger_name) {
            Ok(successors) => successors,
            Err(e) => {
                debug!(trigger = %trigger_name, error = %e, "skip connected node analysis");
                return None;
            }
        };
        if successors.is_empty() {
            return None;
        }

        let mut connected = ConnectedNodes::default();
        for node in successors {
            if node.is_language_model() {
                connected.ai_models.push(ConnectedNode::from_node(node));
            } else if node.is_agent() {
                connected.agents.push(ConnectedNode::from_node(node));
            }
        }
        Some(connected)
    }
}

/// What a chat front end needs to know about the workflow's chat trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub chat_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    pub trigger_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_version: Option<Number>,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_settings: Option<ModelSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_settings: Option<MemorySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_settings: Option<SessionSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_nodes: Option<ConnectedNodes>,
    pub raw_parameters: Value,
}

impl ChatSettings {
    /// Project the workflow's chat trigger; `None` without one.
    pub fn extract(workflow: &WorkflowModel) -> Option<ChatSettings> {
        let trigger = find_trigger(&workflow.nodes, node_types::CHAT_TRIGGER)?;
        let node = &trigger.node;
        let params = &node.parameters;
        let options = params.get("options").cloned().unwrap_or(Value::Null);

        let model_settings = ModelSettings {
            temperature: number_value(&options, "temperature"),
            max_tokens: number_value(&options, "maxTokens").or_else(|| number_value(&options, "maxOutputTokens")),
            top_p: number_value(&options, "topP"),
            frequency_penalty: number_value(&options, "frequencyPenalty"),
            presence_penalty: number_value(&options, "presencePenalty"),
        };
        let memory_settings = MemorySettings {
            memory_type: text_value(params, "memory"),
            max_messages: number_value(&options, "maxMessages").or_else(|| number_value(params, "maxMessages")),
            return_messages: options.get("returnMessages").or_else(|| params.get("returnMessages")).cloned(),
        };
        let session_settings = SessionSettings {
            response_mode: text_value(params, "responseMode"),
            session_id_expression: plain_text(params, "sessionIdExpression").or_else(|| plain_text(params, "sessionId")),
        };

        if !params.is_object() {
            warn!(trigger = %node.name, "chat trigger parameters are not an object");
        }

        Some(ChatSettings {
            chat_title: Some(node.name.clone()).filter(|name| !name.is_empty()).unwrap_or_else(|| DEFAULT_CHAT_TITLE.to_string()),
            webhook_id: node.webhook_id.clone(),
            is_public: params.get("public").and_then(Value::as_bool),
            trigger_type: node.node_type.clone(),
            type_version: node.type_version.clone(),
            node_id: node.id.clone(),
            chat_description: plain_text(params, "description").or_else(|| plain_text(params, "chatDescription")),
            chat_model: text_value(params, "model"),
            model_settings: Some(model_settings).filter(|s| *s != ModelSettings::default()),
            system_message: text_value(params, "systemMessage").or_else(|| plain_text(params, "prompt")),
            memory_settings: Some(memory_settings).filter(|s| *s != MemorySettings::default()),
            prompt_template: text_value(params, "promptTemplate"),
            chat_settings: Some(session_settings).filter(|s| *s != SessionSettings::default()),
            connected_nodes: ConnectedNodes::analyze(workflow, &node.name),
            raw_parameters: params.clone(),
        })
    }
}

/// Non-empty string at `key`.
fn plain_text(
    params: &Value,
    key: &str,
) -> Option<String> {
    params.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Non-empty string at `key.value` (resource locator form) or at `key`.
fn text_value(
    params: &Value,
    key: &str,
) -> Option<String> {
    let value = params.get(key)?;
    value.get("value").and_then(Value::as_str).or_else(|| value.as_str()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn number_value(
    params: &Value,
    key: &str,
) -> Option<Number> {
    match params.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}
