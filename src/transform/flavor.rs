//! Chat and form flavors of the transformation.
//!
//! Both flavors run the same engine; a [`FlavorDescriptor`] carries everything that
//! differs between them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    extract::FormField,
    model::node_types,
    transform::{
        expression::{LiteralPattern, webhook_field_name},
        locator::TriggerDescriptor,
    },
};

/// Top-level chat payload keys that are moved under `body`.
const CHAT_FIELDS: [&str; 3] = ["message", "sessionId", "timestamp"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Flavor {
    Chat,
    Form,
}

impl Flavor {
    pub fn trigger_type(&self) -> &'static str {
        match self {
            Flavor::Chat => node_types::CHAT_TRIGGER,
            Flavor::Form => node_types::FORM_TRIGGER,
        }
    }

    /// Tag embedded in the generated workflow name.
    pub fn tag(&self) -> &'static str {
        match self {
            Flavor::Chat => "CHAT",
            Flavor::Form => "FORM",
        }
    }

    /// Build the descriptor for a located trigger. Form shorthands depend on the
    /// fields the trigger declares.
    pub fn descriptor(
        &self,
        trigger: &TriggerDescriptor,
    ) -> FlavorDescriptor {
        match self {
            Flavor::Chat => FlavorDescriptor {
                flavor: *self,
                field_patterns: chat_field_patterns(),
                agent_override: Some(AgentOverride::default()),
                respond_via_node: true,
            },
            Flavor::Form => {
                let labels: Vec<String> = match FormField::list_from_parameters(&trigger.node.parameters) {
                    Some(fields) => fields.into_iter().map(|field| field.field_label).collect(),
                    None => {
                        warn!(trigger = %trigger.node.name, "form trigger declares no fields, field shorthands are left as is");
                        Vec::new()
                    }
                };
                FlavorDescriptor {
                    flavor: *self,
                    field_patterns: form_field_patterns(&labels),
                    agent_override: None,
                    respond_via_node: false,
                }
            }
        }
    }
}

/// What one flavor changes in the shared engine.
#[derive(Debug, Clone)]
pub struct FlavorDescriptor {
    pub flavor: Flavor,
    /// Pass 4 shorthand substitutions.
    pub field_patterns: Vec<LiteralPattern>,
    /// Replaces the expression rewrite for agent nodes.
    pub agent_override: Option<AgentOverride>,
    /// Append a respond node and answer through it.
    pub respond_via_node: bool,
}

/// Forced prompt configuration for agent nodes fed by the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOverride {
    pub prompt_type: String,
    pub text: String,
    pub system_message: String,
}

impl Default for AgentOverride {
    fn default() -> Self {
        Self {
            prompt_type: "define".to_string(),
            text: "={{ $json.body.message }}".to_string(),
            system_message: "You are a helpful assistant".to_string(),
        }
    }
}

impl AgentOverride {
    /// Overwrite `promptType`, `text` and `options.systemMessage`; every other key is kept.
    pub fn apply(
        &self,
        parameters: &mut Value,
    ) {
        if !parameters.is_object() {
            *parameters = Value::Object(Map::new());
        }
        let Some(params) = parameters.as_object_mut() else {
            return;
        };
        params.insert("promptType".to_string(), Value::String(self.prompt_type.clone()));
        params.insert("text".to_string(), Value::String(self.text.clone()));

        let options = params.entry("options").or_insert_with(|| Value::Object(Map::new()));
        if !options.is_object() {
            *options = Value::Object(Map::new());
        }
        if let Some(options) = options.as_object_mut() {
            options.insert("systemMessage".to_string(), Value::String(self.system_message.clone()));
        }
    }
}

/// `{{ $json.message }}` / `{{$json.message}}` style shorthands for the chat payload.
pub fn chat_field_patterns() -> Vec<LiteralPattern> {
    CHAT_FIELDS
        .iter()
        .flat_map(|field| {
            let to = format!("{{{{ $json.body.{} }}}}", field);
            [
                LiteralPattern::new(format!("{{{{ $json.{} }}}}", field), to.clone()),
                LiteralPattern::new(format!("{{{{$json.{}}}}}", field), to),
            ]
        })
        .collect()
}

/// Quoted-bracket and dot shorthands, spaced and unspaced, for every declared form field.
pub fn form_field_patterns(labels: &[String]) -> Vec<LiteralPattern> {
    labels
        .iter()
        .flat_map(|label| {
            let to = format!("{{{{ $json.body.{} }}}}", webhook_field_name(label));
            [
                format!("{{{{ $json[\"{}\"] }}}}", label),
                format!("{{{{ $json['{}'] }}}}", label),
                format!("{{{{ $json.{} }}}}", label),
                format!("{{{{$json[\"{}\"]}}}}", label),
                format!("{{{{$json['{}']}}}}", label),
                format!("{{{{$json.{}}}}}", label),
            ]
            .into_iter()
            .map(move |from| LiteralPattern::new(from, to.clone()))
        })
        .collect()
}
