//! Response path for chat workflows: a terminal "Respond to Webhook" node wired
//! after every agent, so the webhook caller receives the agent's answer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};
use tracing::debug;

use crate::{
    FlowfrontError, Result,
    model::{AI_LANGUAGE_MODEL_PORT, Edge, MAIN_PORT, NodeModel, WorkflowModel, node_types, position},
    transform::rewriter::WEBHOOK_NODE_NAME,
    utils::IdGenerator,
};

/// Fixed display name of the generated respond node.
pub const RESPOND_NODE_NAME: &str = "Respond to Webhook";
pub const RESPOND_TYPE_VERSION: f64 = 1.4;

/// How the connection map is updated once the respond node exists.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStrategy {
    /// Discard every connection and wire only webhook -> agent -> respond and model -> agent.
    #[default]
    Rebuild,
    /// Keep existing connections and add only the missing response path edges.
    Splice,
}

pub fn respond_node(id: String) -> NodeModel {
    let mut parameters = Map::new();
    parameters.insert("respondWith".to_string(), json!("json"));
    parameters.insert("responseBody".to_string(), json!("={{ $json.output.toJsonString() }}"));
    parameters.insert("options".to_string(), json!({}));

    NodeModel {
        id,
        name: RESPOND_NODE_NAME.to_string(),
        node_type: node_types::RESPOND_TO_WEBHOOK.to_string(),
        type_version: Number::from_f64(RESPOND_TYPE_VERSION),
        position: Some(position(224, 16)),
        parameters: Value::Object(parameters),
        webhook_id: None,
        extra: Map::new(),
    }
}

/// Append the respond node and wire the response path. Returns the respond node id.
///
/// The agent is discovered by type. When the webhook already feeds an agent, that
/// agent is the one the webhook keeps feeding; otherwise the first agent in node order.
pub fn build_response_path(
    workflow: &mut WorkflowModel,
    strategy: ConnectionStrategy,
    id_generator: &dyn IdGenerator,
) -> Result<String> {
    let agents: Vec<String> = workflow.nodes.iter().filter(|node| node.is_agent()).map(|node| node.name.clone()).collect();
    let fed = workflow.connections.targets(WEBHOOK_NODE_NAME, MAIN_PORT).into_iter().find(|target| agents.iter().any(|agent| agent == target)).map(str::to_string);
    let primary = fed.or_else(|| agents.first().cloned()).ok_or_else(|| FlowfrontError::NoAgentNode(workflow.name.clone()))?;

    // each model keeps the agent it was wired to, if that agent still exists
    let models: Vec<(String, String)> = workflow
        .nodes
        .iter()
        .filter(|node| node.is_language_model())
        .map(|node| {
            let target = workflow
                .connections
                .targets(&node.name, AI_LANGUAGE_MODEL_PORT)
                .into_iter()
                .find(|target| agents.iter().any(|agent| agent == target))
                .map(str::to_string)
                .unwrap_or_else(|| primary.clone());
            (node.name.clone(), target)
        })
        .collect();

    if workflow.has_node(RESPOND_NODE_NAME) {
        return Err(FlowfrontError::Transform {
            stage: "response_path".to_string(),
            message: format!("workflow already has a node named '{}'", RESPOND_NODE_NAME),
        });
    }
    let respond_id = id_generator.generate();
    workflow.nodes.push(respond_node(respond_id.clone()));

    debug!(agent = %primary, agents = agents.len(), models = models.len(), strategy = strategy.as_ref(), "wiring response path");

    let connections = &mut workflow.connections;
    match strategy {
        ConnectionStrategy::Rebuild => {
            connections.clear();
            connections.set_single(WEBHOOK_NODE_NAME, MAIN_PORT, Edge::main(&primary));
            for agent in agents.iter() {
                connections.set_single(agent.as_str(), MAIN_PORT, Edge::main(RESPOND_NODE_NAME));
            }
            for (model, agent) in models {
                connections.set_single(model, AI_LANGUAGE_MODEL_PORT, Edge::new(agent, AI_LANGUAGE_MODEL_PORT));
            }
        }
        ConnectionStrategy::Splice => {
            if !connections.has_edges(WEBHOOK_NODE_NAME, MAIN_PORT) {
                connections.push(WEBHOOK_NODE_NAME, MAIN_PORT, Edge::main(&primary));
            }
            for agent in agents.iter() {
                connections.push(agent.as_str(), MAIN_PORT, Edge::main(RESPOND_NODE_NAME));
            }
            for (model, agent) in models {
                if !connections.has_edges(&model, AI_LANGUAGE_MODEL_PORT) {
                    connections.push(model, AI_LANGUAGE_MODEL_PORT, Edge::new(agent, AI_LANGUAGE_MODEL_PORT));
                }
            }
        }
    }

    Ok(respond_id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::utils::SequentialIdGenerator;

    fn rewritten() -> WorkflowModel {
        WorkflowModel::from_value(json!({
            "name": "Bot",
            "nodes": [
                { "id": "w", "name": "Webhook", "type": "n8n-nodes-base.webhook", "position": [0, 0] },
                { "id": "a", "name": "Support Agent", "type": "@n8n/n8n-nodes-langchain.agent", "position": [200, 0] },
                { "id": "m", "name": "OpenAI Chat Model", "type": "@n8n/n8n-nodes-langchain.lmChatOpenAi", "position": [200, 200] },
                { "id": "s", "name": "Slack", "type": "n8n-nodes-base.slack", "position": [400, 0] },
                { "id": "k", "name": "Memory", "type": "@n8n/n8n-nodes-langchain.memoryBufferWindow", "position": [300, 200] }
            ],
            "connections": {
                "Webhook": { "main": [[{ "node": "Support Agent", "type": "main", "index": 0 }]] },
                "Support Agent": { "main": [[{ "node": "Slack", "type": "main", "index": 0 }]] },
                "OpenAI Chat Model": { "ai_languageModel": [[{ "node": "Support Agent", "type": "ai_languageModel", "index": 0 }]] },
                "Memory": { "ai_memory": [[{ "node": "Support Agent", "type": "ai_memory", "index": 0 }]] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_respond_node_fields() {
        let value = serde_json::to_value(respond_node("r1".to_string())).unwrap();
        assert_eq!(value["parameters"], json!({ "respondWith": "json", "responseBody": "={{ $json.output.toJsonString() }}", "options": {} }));
        assert_eq!(value["type"], "n8n-nodes-base.respondToWebhook");
        assert_eq!(value["typeVersion"], json!(1.4));
        assert_eq!(value["position"], json!([224, 16]));
    }

    #[test]
    fn test_rebuild_discards_other_edges() {
        let mut workflow = rewritten();
        let id = build_response_path(&mut workflow, ConnectionStrategy::Rebuild, &SequentialIdGenerator::new("r")).unwrap();

        assert_eq!(id, "r-1");
        assert_eq!(workflow.nodes.last().unwrap().name, RESPOND_NODE_NAME);
        let value = serde_json::to_value(&workflow.connections).unwrap();
        assert_eq!(
            value,
            json!({
                "Webhook": { "main": [[{ "node": "Support Agent", "type": "main", "index": 0 }]] },
                "Support Agent": { "main": [[{ "node": "Respond to Webhook", "type": "main", "index": 0 }]] },
                "OpenAI Chat Model": { "ai_languageModel": [[{ "node": "Support Agent", "type": "ai_languageModel", "index": 0 }]] }
            })
        );
        assert!(workflow.validate().is_ok());
    }

    #[test]
    fn test_splice_keeps_existing_edges() {
        let mut workflow = rewritten();
        build_response_path(&mut workflow, ConnectionStrategy::Splice, &SequentialIdGenerator::new("r")).unwrap();

        assert_eq!(workflow.connections.targets("Support Agent", MAIN_PORT), vec!["Slack", RESPOND_NODE_NAME]);
        assert_eq!(workflow.connections.targets("Webhook", MAIN_PORT), vec!["Support Agent"]);
        assert!(workflow.connections.has_edges("Memory", "ai_memory"));
        assert!(workflow.validate().is_ok());
    }

    #[test]
    fn test_splice_connects_unwired_webhook() {
        let mut workflow = rewritten();
        workflow.connections.remove("Webhook");
        build_response_path(&mut workflow, ConnectionStrategy::Splice, &SequentialIdGenerator::new("r")).unwrap();
        assert_eq!(workflow.connections.targets("Webhook", MAIN_PORT), vec!["Support Agent"]);
    }

    #[test]
    fn test_no_agent_fails() {
        let mut workflow = rewritten();
        workflow.nodes.retain(|node| !node.is_agent());
        let result = build_response_path(&mut workflow, ConnectionStrategy::Rebuild, &SequentialIdGenerator::new("r"));
        assert_eq!(result, Err(FlowfrontError::NoAgentNode("Bot".to_string())));
    }

    #[test]
    fn test_model_keeps_its_agent() {
        let mut workflow = rewritten();
        workflow.nodes.push(NodeModel::new("b", "Router Agent", node_types::AGENT));
        workflow.connections.set_single("OpenAI Chat Model", AI_LANGUAGE_MODEL_PORT, Edge::new("Router Agent", AI_LANGUAGE_MODEL_PORT));
        build_response_path(&mut workflow, ConnectionStrategy::Rebuild, &SequentialIdGenerator::new("r")).unwrap();

        assert_eq!(workflow.connections.targets("OpenAI Chat Model", AI_LANGUAGE_MODEL_PORT), vec!["Router Agent"]);
        assert_eq!(workflow.connections.targets("Router Agent", MAIN_PORT), vec![RESPOND_NODE_NAME]);
        assert_eq!(workflow.connections.targets("Webhook", MAIN_PORT), vec!["Support Agent"]);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("splice".parse::<ConnectionStrategy>().unwrap(), ConnectionStrategy::Splice);
        assert_eq!(ConnectionStrategy::default().to_string(), "rebuild");
    }
}
