//! Replacement of the trigger node by a webhook node.

use serde_json::{Map, Number, Value, json};

use crate::{
    FlowfrontError, Result,
    model::{NodeModel, Position, WorkflowModel, node_types, position},
    transform::locator::TriggerDescriptor,
    utils::IdGenerator,
};

/// Fixed display name of the generated webhook node.
pub const WEBHOOK_NODE_NAME: &str = "Webhook";
/// Webhook node version whose parameter layout this module writes.
pub const WEBHOOK_TYPE_VERSION: f64 = 2.1;

/// Ids minted for the webhook node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookIds {
    pub node_id: String,
    /// Used as both `parameters.path` and `webhookId`.
    pub path: String,
}

/// Build the webhook node that stands in for a trigger.
///
/// `respond_via_node` makes the webhook wait for a "Respond to Webhook" node
/// instead of answering immediately.
pub fn webhook_node(
    ids: &WebhookIds,
    trigger_position: Option<&Position>,
    respond_via_node: bool,
) -> NodeModel {
    let mut parameters = Map::new();
    parameters.insert("httpMethod".to_string(), json!("POST"));
    parameters.insert("path".to_string(), json!(ids.path));
    if respond_via_node {
        parameters.insert("responseMode".to_string(), json!("responseNode"));
    }
    parameters.insert("options".to_string(), json!({}));

    NodeModel {
        id: ids.node_id.clone(),
        name: WEBHOOK_NODE_NAME.to_string(),
        node_type: node_types::WEBHOOK.to_string(),
        type_version: Number::from_f64(WEBHOOK_TYPE_VERSION),
        position: Some(trigger_position.cloned().unwrap_or_else(|| position(0, 0))),
        parameters: Value::Object(parameters),
        webhook_id: Some(ids.path.clone()),
        extra: Map::new(),
    }
}

/// Swap the trigger for a webhook node at the same index and move the trigger's
/// outgoing connections under the webhook's name.
///
/// A trigger without outgoing connections leaves the connection map as it was.
pub fn rewrite_trigger_node(
    workflow: &mut WorkflowModel,
    trigger: &TriggerDescriptor,
    respond_via_node: bool,
    id_generator: &dyn IdGenerator,
) -> Result<WebhookIds> {
    let slot = workflow.nodes.get_mut(trigger.index).filter(|node| node.name == trigger.node.name && node.node_type == trigger.node.node_type).ok_or(FlowfrontError::Transform {
        stage: "node_rewrite".to_string(),
        message: format!("trigger '{}' is no longer at index {}", trigger.node.name, trigger.index),
    })?;

    let ids = WebhookIds {
        node_id: id_generator.generate(),
        path: id_generator.generate(),
    };
    *slot = webhook_node(&ids, trigger.position(), respond_via_node);

    workflow.connections.rename_node(trigger.name(), WEBHOOK_NODE_NAME);

    Ok(ids)
}
