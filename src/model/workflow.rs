use std::collections::{HashMap, HashSet};

use petgraph::{Direction, graph::DiGraph};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    FlowfrontError, Result,
    model::{Connections, Edge, NodeModel, node::empty_object},
};

/// A workflow as exchanged with the workflow server.
///
/// Only the keys the transformation needs are typed; everything else
/// (`active`, `versionId`, `pinData`, ...) rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub connections: Connections,
    #[serde(default = "empty_object")]
    pub settings: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            nodes: Vec::new(),
            connections: Connections::new(),
            settings: empty_object(),
            extra: Map::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let value = serde_json::from_str::<Value>(s).map_err(|e| FlowfrontError::MalformedGraph(format!("{}", e)))?;
        Self::from_value(value)
    }

    /// Validate the raw document shape, then deserialize it.
    pub fn from_value(value: Value) -> Result<Self> {
        jsonschema::validate(&Self::schema(), &value)?;
        let workflow = serde_json::from_value::<WorkflowModel>(value);
        match workflow {
            Ok(v) => Ok(v),
            Err(e) => Err(FlowfrontError::MalformedGraph(format!("{}", e))),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["nodes"],
            "properties": {
                "name": { "type": "string" },
                "nodes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "type"],
                        "properties": {
                            "id": { "type": "string" },
                            "name": { "type": "string" },
                            "type": { "type": "string" },
                            "parameters": { "type": "object" },
                            "position": {
                                "type": "array",
                                "items": { "type": "number" },
                                "minItems": 2,
                                "maxItems": 2
                            }
                        }
                    }
                },
                "connections": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "object",
                        "additionalProperties": {
                            "type": "array",
                            "items": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["node", "type"],
                                    "properties": {
                                        "node": { "type": "string" },
                                        "type": { "type": "string" },
                                        "index": { "type": "integer", "minimum": 0 }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    pub fn node(
        &self,
        name: &str,
    ) -> Option<&NodeModel> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn has_node(
        &self,
        name: &str,
    ) -> bool {
        self.node(name).is_some()
    }

    /// Build a directed graph view over the nodes and edges.
    ///
    /// Fails when two nodes share a name or when a connection references a node
    /// that does not exist.
    pub fn graph(&self) -> Result<DiGraph<&NodeModel, &Edge>> {
        let mut graph: DiGraph<&NodeModel, &Edge> = DiGraph::new();

        let mut indices = HashMap::new();
        for node in self.nodes.iter() {
            let idx = graph.add_node(node);
            if indices.insert(node.name.as_str(), idx).is_some() {
                return Err(FlowfrontError::MalformedGraph(format!("duplicate node name '{}'", node.name)));
            }
        }
        for (source, _, edge) in self.connections.edges() {
            let from = indices.get(source).ok_or(FlowfrontError::MalformedGraph(format!("connection source '{}' is not a node", source)))?;
            let to = indices.get(edge.node.as_str()).ok_or(FlowfrontError::MalformedGraph(format!("edge from '{}' targets missing node '{}'", source, edge.node)))?;
            graph.add_edge(*from, *to, edge);
        }
        Ok(graph)
    }

    /// Check referential integrity of the connection map.
    pub fn validate(&self) -> Result<()> {
        self.graph().map(|_| ())
    }

    /// Direct successors of `name`, on any port, in edge order without duplicates.
    pub fn successors(
        &self,
        name: &str,
    ) -> Result<Vec<&NodeModel>> {
        let graph = self.graph()?;
        let Some(idx) = graph.node_indices().find(|idx| graph[*idx].name == name) else {
            return Ok(Vec::new());
        };

        // petgraph yields neighbors most-recent first
        let mut neighbors: Vec<_> = graph.neighbors_directed(idx, Direction::Outgoing).collect();
        neighbors.reverse();

        let mut seen = HashSet::new();
        Ok(neighbors.into_iter().map(|n| graph[n]).filter(|node| seen.insert(node.name.as_str())).collect())
    }
}
