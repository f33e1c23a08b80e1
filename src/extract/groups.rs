use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    model::{NodeModel, node_types},
    transform::{Flavor, find_triggers},
};

/// A workflow as returned by the server's list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

impl WorkflowSummary {
    pub fn has_trigger(
        &self,
        flavor: Flavor,
    ) -> bool {
        self.nodes.iter().any(|node| node.is_type(flavor.trigger_type()))
    }

    /// Type of the first chat or form trigger, in node order.
    pub fn trigger_type(&self) -> Option<&str> {
        find_triggers(&self.nodes, &[node_types::CHAT_TRIGGER, node_types::FORM_TRIGGER]).into_iter().next().map(|node| node.node_type.as_str())
    }
}

/// Workflows split by the trigger a front end can be generated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerGroups {
    pub chat_triggers: Vec<WorkflowSummary>,
    pub form_triggers: Vec<WorkflowSummary>,
}

impl TriggerGroups {
    pub fn chat_names(&self) -> Vec<&str> {
        self.chat_triggers.iter().map(|wf| wf.name.as_str()).collect()
    }

    pub fn form_names(&self) -> Vec<&str> {
        self.form_triggers.iter().map(|wf| wf.name.as_str()).collect()
    }

    /// Entries across both groups; a workflow with both triggers counts twice.
    pub fn total(&self) -> usize {
        self.chat_triggers.len() + self.form_triggers.len()
    }
}

/// Group workflows by trigger type. Archived workflows are left out; a workflow
/// with both triggers lands in both groups.
pub fn group_by_trigger(workflows: &[WorkflowSummary]) -> TriggerGroups {
    let mut groups = TriggerGroups::default();
    for workflow in workflows.iter().filter(|wf| !wf.is_archived) {
        if workflow.has_trigger(Flavor::Chat) {
            groups.chat_triggers.push(workflow.clone());
        }
        if workflow.has_trigger(Flavor::Form) {
            groups.form_triggers.push(workflow.clone());
        }
    }
    groups
}
