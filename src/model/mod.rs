mod edge;
mod node;
mod workflow;

pub use edge::{AI_LANGUAGE_MODEL_PORT, Connections, Edge, MAIN_PORT, NodeConnections};
pub use node::{NodeModel, Position, node_types, position};
pub use workflow::WorkflowModel;
