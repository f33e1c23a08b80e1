//! Named-output adjacency between workflow nodes.
//!
//! Connections are keyed by the source node **name**. Each source maps an output
//! port (`main`, `ai_languageModel`, ...) to a list of output slots, and each slot
//! fans out to a list of edges. The double nesting is kept exactly as read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Primary data port.
pub const MAIN_PORT: &str = "main";
/// Port through which a language model feeds an agent.
pub const AI_LANGUAGE_MODEL_PORT: &str = "ai_languageModel";

/// A single link to a target node input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Name of the target node.
    pub node: String,
    /// Input port on the target.
    #[serde(rename = "type")]
    pub port: String,
    /// Input slot on the target.
    #[serde(default)]
    pub index: u32,
}

impl Edge {
    pub fn new(
        node: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            index: 0,
        }
    }

    /// Edge into the target's `main` port, slot 0.
    pub fn main(node: impl Into<String>) -> Self {
        Self::new(node, MAIN_PORT)
    }
}

/// Output port name -> slots -> edges.
pub type NodeConnections = IndexMap<String, Vec<Vec<Edge>>>;

/// Connection map of a workflow, keyed by source node name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Connections(IndexMap<String, NodeConnections>);

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        source: &str,
    ) -> Option<&NodeConnections> {
        self.0.get(source)
    }

    pub fn contains(
        &self,
        source: &str,
    ) -> bool {
        self.0.contains_key(source)
    }

    pub fn remove(
        &mut self,
        source: &str,
    ) -> Option<NodeConnections> {
        self.0.shift_remove(source)
    }

    /// Set `source` to a single edge on `port`, replacing whatever it had.
    pub fn set_single(
        &mut self,
        source: impl Into<String>,
        port: &str,
        edge: Edge,
    ) {
        let mut outputs = NodeConnections::new();
        outputs.insert(port.to_string(), vec![vec![edge]]);
        self.0.insert(source.into(), outputs);
    }

    /// Append `edge` to slot 0 of `port` on `source` unless an equal edge is already there.
    pub fn push(
        &mut self,
        source: impl Into<String>,
        port: &str,
        edge: Edge,
    ) {
        let slots = self.0.entry(source.into()).or_default().entry(port.to_string()).or_default();
        if slots.is_empty() {
            slots.push(Vec::new());
        }
        if !slots[0].contains(&edge) {
            slots[0].push(edge);
        }
    }

    /// Whether `source` has at least one edge on `port`.
    pub fn has_edges(
        &self,
        source: &str,
        port: &str,
    ) -> bool {
        self.0.get(source).and_then(|outputs| outputs.get(port)).is_some_and(|slots| slots.iter().any(|slot| !slot.is_empty()))
    }

    /// Rename a node everywhere it appears: the key of its outgoing map and the
    /// target of every edge pointing at it.
    pub fn rename_node(
        &mut self,
        old: &str,
        new: &str,
    ) {
        if let Some(outputs) = self.0.shift_remove(old) {
            self.0.insert(new.to_string(), outputs);
        }
        for outputs in self.0.values_mut() {
            for slots in outputs.values_mut() {
                for edge in slots.iter_mut().flatten() {
                    if edge.node == old {
                        edge.node = new.to_string();
                    }
                }
            }
        }
    }

    /// Iterate `(source, output port, edge)` over every edge.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &Edge)> {
        self.0.iter().flat_map(|(source, outputs)| {
            outputs.iter().flat_map(move |(port, slots)| slots.iter().flatten().map(move |edge| (source.as_str(), port.as_str(), edge)))
        })
    }

    /// Targets reached from `source` on `port`.
    pub fn targets(
        &self,
        source: &str,
        port: &str,
    ) -> Vec<&str> {
        self.0.get(source).and_then(|outputs| outputs.get(port)).map(|slots| slots.iter().flatten().map(|edge| edge.node.as_str()).collect()).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
