//! # Flowfront
//!
//! Flowfront turns chat- and form-triggered n8n workflows into webhook-driven
//! workflows, so a custom front end can drive them over plain HTTP.
//!
//! ## Core Features
//!
//! - **Pure Transformation**: trigger replacement, expression migration and response wiring on an owned copy, with injectable ids
//! - **Two Flavors**: chat (agent answers through a "Respond to Webhook" node) and form (fire and forget)
//! - **Front End Projections**: chat and form settings read from the trigger node
//! - **Server Client**: list, fetch, create and call workflows on an n8n instance
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flowfront::{Flavor, N8nClient, Transformer, WorkflowService};
//!
//! let client = N8nClient::from_config(&config)?;
//! let workflow = client.fetch_workflow_by_name("Support bot").await?;
//! if let Some(output) = Transformer::new().transform(&workflow, Flavor::Chat)?.into_output() {
//!     client.create_workflow(&output.finalize()).await?;
//!     let reply = client.send_chat_message(&client.webhook_url(&output.webhook_path), "hello", None).await?;
//! }
//! ```

pub mod client;
mod config;
mod error;
pub mod extract;
mod model;
pub mod transform;
mod utils;

pub use client::{ChatReply, ConnectionReport, FormSubmission, FormValue, N8nClient, WebhookResponse, WorkflowList, WorkflowService};
pub use config::{Config, InstanceConfig, TransformConfig};
pub use error::FlowfrontError;
pub use extract::{ChatSettings, ConnectedNode, ConnectedNodes, FormField, FormSettings, TriggerGroups, WorkflowSummary, group_by_trigger};
pub use model::*;
pub use transform::{
    ConnectionStrategy, ExpressionRewriter, Flavor, FlavorDescriptor, GeneratedIds, RESPOND_NODE_NAME, TransformOutcome, TransformOutput, TransformStage, Transformer, WEBHOOK_NODE_NAME,
    find_trigger, transform, transformed_name,
};
pub use utils::{IdGenerator, SequentialIdGenerator, UuidGenerator};

/// Result type alias for Flowfront operations.
pub type Result<T> = std::result::Result<T, FlowfrontError>;
