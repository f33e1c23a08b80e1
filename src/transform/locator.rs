use serde_json::Value;

use crate::model::{NodeModel, Position};

/// A located trigger node together with where it sat in the node list.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDescriptor {
    /// Index in `WorkflowModel::nodes`.
    pub index: usize,
    /// Snapshot of the trigger as found, before any rewrite.
    pub node: NodeModel,
}

impl TriggerDescriptor {
    /// Original name, the key expressions and connections referred to.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn parameters(&self) -> &Value {
        &self.node.parameters
    }

    pub fn position(&self) -> Option<&Position> {
        self.node.position.as_ref()
    }
}

/// First node whose type equals `trigger_type` exactly.
pub fn find_trigger(
    nodes: &[NodeModel],
    trigger_type: &str,
) -> Option<TriggerDescriptor> {
    nodes.iter().position(|node| node.is_type(trigger_type)).map(|index| TriggerDescriptor {
        index,
        node: nodes[index].clone(),
    })
}

/// Every node whose type is one of `trigger_types`, in workflow order.
pub fn find_triggers<'a>(
    nodes: &'a [NodeModel],
    trigger_types: &[&str],
) -> Vec<&'a NodeModel> {
    nodes.iter().filter(|node| trigger_types.contains(&node.node_type.as_str())).collect()
}
