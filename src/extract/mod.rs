//! Read-only projections of trigger nodes, used to render and drive a front end.
//!
//! Nothing here mutates a workflow.

mod chat;
mod form;
mod groups;

pub use chat::{ChatSettings, ConnectedNode, ConnectedNodes, MemorySettings, ModelSettings, SessionSettings};
pub use form::{FieldOption, FieldOptions, FormField, FormSettings};
pub use groups::{TriggerGroups, WorkflowSummary, group_by_trigger};
