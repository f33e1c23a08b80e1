//! Trigger-to-webhook transformation.
//!
//! The driver walks a fixed sequence of stages over an owned copy of the input:
//!
//! ```text
//! Idle -> Located -> Cloned -> NodeRewritten -> ExpressionsRewritten
//!      -> [ResponsePathBuilt] -> Renamed -> Done
//! ```
//!
//! A workflow without the flavor's trigger stops after `Idle` with
//! [`TransformOutcome::NoTriggerFound`]. Any failure after that discards the copy,
//! so callers never observe a half rewritten workflow.
//!
//! ```rust,ignore
//! use flowfront::{Flavor, Transformer, TransformOutcome, WorkflowModel};
//!
//! let workflow = WorkflowModel::from_json(json_str)?;
//! match Transformer::new().transform(&workflow, Flavor::Chat)? {
//!     TransformOutcome::Transformed(output) => println!("{}", output.webhook_url("https://n8n.example.com")),
//!     TransformOutcome::NoTriggerFound => println!("nothing to transform"),
//! }
//! ```

mod expression;
mod flavor;
mod locator;
mod respond;
mod rewriter;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    FlowfrontError, Result,
    model::WorkflowModel,
    utils::{self, IdGenerator, UuidGenerator},
};

pub use expression::{ExpressionRewriter, LiteralPattern, webhook_field_name};
pub use flavor::{AgentOverride, Flavor, FlavorDescriptor, chat_field_patterns, form_field_patterns};
pub use locator::{TriggerDescriptor, find_trigger, find_triggers};
pub use respond::{ConnectionStrategy, RESPOND_NODE_NAME, build_response_path, respond_node};
pub use rewriter::{WEBHOOK_NODE_NAME, WebhookIds, rewrite_trigger_node, webhook_node};

/// Stages of one transformation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransformStage {
    Idle,
    Located,
    Cloned,
    NodeRewritten,
    ExpressionsRewritten,
    ResponsePathBuilt,
    Renamed,
    Done,
}

/// Ids minted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedIds {
    pub webhook_node_id: String,
    pub respond_node_id: Option<String>,
}

/// A successfully transformed workflow and what the caller needs to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub workflow: WorkflowModel,
    pub flavor: Flavor,
    /// Name of the trigger that was replaced.
    pub trigger_name: String,
    /// Path segment of the webhook, also its `webhookId`.
    pub webhook_path: String,
    pub generated_ids: GeneratedIds,
}

impl TransformOutput {
    /// Production webhook url on the given instance.
    pub fn webhook_url(
        &self,
        instance_url: &str,
    ) -> String {
        format!("{}/webhook/{}", instance_url.trim_end_matches('/'), self.webhook_path)
    }

    /// Copy of the workflow named for upload, `<name>-FINAL`.
    pub fn finalize(&self) -> WorkflowModel {
        let mut workflow = self.workflow.clone();
        workflow.name = format!("{}-FINAL", workflow.name);
        workflow
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Transformed(Box<TransformOutput>),
    /// The workflow has no node of the flavor's trigger type. Not an error.
    NoTriggerFound,
}

impl TransformOutcome {
    pub fn output(&self) -> Option<&TransformOutput> {
        match self {
            TransformOutcome::Transformed(output) => Some(output),
            TransformOutcome::NoTriggerFound => None,
        }
    }

    pub fn into_output(self) -> Option<TransformOutput> {
        match self {
            TransformOutcome::Transformed(output) => Some(*output),
            TransformOutcome::NoTriggerFound => None,
        }
    }
}

/// Name of a transformed workflow: `<name>-FLOW-FRONT-<TAG>-date-<timestamp>`.
pub fn transformed_name(
    original: &str,
    flavor: Flavor,
    time: DateTime<Utc>,
) -> String {
    format!("{}-FLOW-FRONT-{}-date-{}", original, flavor.tag(), utils::workflow_timestamp(time))
}

/// Pure driver: no I/O, no shared state. Ids and the clock are injected.
#[derive(Clone)]
pub struct Transformer {
    id_generator: Arc<dyn IdGenerator>,
    strategy: ConnectionStrategy,
    timestamp: Option<DateTime<Utc>>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self {
            id_generator: Arc::new(UuidGenerator),
            strategy: ConnectionStrategy::default(),
            timestamp: None,
        }
    }
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_generator(
        mut self,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn connection_strategy(
        mut self,
        strategy: ConnectionStrategy,
    ) -> Self {
        self.strategy = strategy;
        self
    }

    /// Pin the timestamp embedded in generated names.
    pub fn with_timestamp(
        mut self,
        timestamp: DateTime<Utc>,
    ) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn transform(
        &self,
        workflow: &WorkflowModel,
        flavor: Flavor,
    ) -> Result<TransformOutcome> {
        let Some(trigger) = find_trigger(&workflow.nodes, flavor.trigger_type()) else {
            info!(workflow = %workflow.name, flavor = %flavor, "no trigger found, nothing to transform");
            return Ok(TransformOutcome::NoTriggerFound);
        };
        debug!(stage = %TransformStage::Located, trigger = %trigger.name(), index = trigger.index);

        let mut draft = workflow.clone();
        debug!(stage = %TransformStage::Cloned);

        let descriptor = flavor.descriptor(&trigger);

        let webhook = rewrite_trigger_node(&mut draft, &trigger, descriptor.respond_via_node, self.id_generator.as_ref())?;
        debug!(stage = %TransformStage::NodeRewritten, webhook_path = %webhook.path);

        let rewriter = ExpressionRewriter::new(trigger.name(), descriptor.field_patterns.clone())?;
        for (index, node) in draft.nodes.iter_mut().enumerate() {
            if index == trigger.index {
                continue;
            }
            match &descriptor.agent_override {
                Some(agent_override) if node.is_agent() => agent_override.apply(&mut node.parameters),
                _ => node.parameters = rewriter.rewrite_value(&node.parameters),
            }
        }
        debug!(stage = %TransformStage::ExpressionsRewritten, nodes = draft.nodes.len());

        let respond_node_id = if descriptor.respond_via_node {
            let id = build_response_path(&mut draft, self.strategy, self.id_generator.as_ref())?;
            debug!(stage = %TransformStage::ResponsePathBuilt, respond_node_id = %id);
            Some(id)
        } else {
            None
        };

        draft.name = transformed_name(&workflow.name, flavor, self.timestamp.unwrap_or_else(Utc::now));
        debug!(stage = %TransformStage::Renamed, name = %draft.name);

        draft.validate().map_err(|e| FlowfrontError::Transform {
            stage: TransformStage::Renamed.to_string(),
            message: e.to_string(),
        })?;

        info!(workflow = %workflow.name, flavor = %flavor, nodes = draft.nodes.len(), "workflow transformed");
        debug!(stage = %TransformStage::Done);

        Ok(TransformOutcome::Transformed(Box::new(TransformOutput {
            workflow: draft,
            flavor,
            trigger_name: trigger.node.name,
            webhook_path: webhook.path,
            generated_ids: GeneratedIds {
                webhook_node_id: webhook.node_id,
                respond_node_id,
            },
        })))
    }
}

/// Transform with random ids, the current time and the default connection strategy.
pub fn transform(
    workflow: &WorkflowModel,
    flavor: Flavor,
) -> Result<TransformOutcome> {
    Transformer::new().transform(workflow, flavor)
}
