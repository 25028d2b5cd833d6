//! Graph intermediate representation.
//!
//! A graph is a JSON-Schema-like `state`, a list of `nodes` and a list of
//! `edges`. Each edge connects every source to every target and may carry a
//! free-text `condition`.

pub mod evaluate;
pub mod predict;

pub use evaluate::{
    evaluate, graph_structure_similarity, node_edge_correctness, state_schema_match, Correctness,
    EvaluationReport,
};
pub use predict::{GraphPredictor, PredictError, PredictionInput};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A node of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique node name.
    pub id: String,
    /// Marks the entry node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_start: Option<bool>,
    /// Marks a terminal node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_end: Option<bool>,
    /// What the node does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GraphNode {
    /// A plain node.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), is_start: None, is_end: None, description: None }
    }

    /// An entry node.
    #[must_use]
    pub fn start(id: impl Into<String>) -> Self {
        Self { is_start: Some(true), ..Self::new(id) }
    }

    /// A terminal node.
    #[must_use]
    pub fn end(id: impl Into<String>) -> Self {
        Self { is_end: Some(true), ..Self::new(id) }
    }

    /// Returns `true` for the entry node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.is_start == Some(true)
    }

    /// Returns `true` for a terminal node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.is_end == Some(true)
    }
}

/// A possibly fan-in/fan-out edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node ids.
    pub sources: Vec<String>,
    /// Target node ids.
    pub targets: Vec<String>,
    /// Description or pseudocode of when the edge is taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl GraphEdge {
    /// An unconditional edge from `source` to `target`.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { sources: vec![source.into()], targets: vec![target.into()], condition: None }
    }

    /// Sets the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// A predicted or expected graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Schema of the shared state.
    #[serde(default = "empty_object")]
    pub state: Value,
    /// Nodes.
    pub nodes: Vec<GraphNode>,
    /// Edges.
    pub edges: Vec<GraphEdge>,
}

impl Default for GraphSchema {
    fn default() -> Self {
        Self { state: empty_object(), nodes: Vec::new(), edges: Vec::new() }
    }
}

/// A structural problem found by [`GraphSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaIssue {
    /// Two nodes share an id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// An edge names a node that does not exist.
    #[error("edge {edge} references unknown node '{node}'")]
    UnknownNode {
        /// Index of the edge.
        edge: usize,
        /// Missing node id.
        node: String,
    },

    /// An edge has no sources or no targets.
    #[error("edge {0} has no sources or no targets")]
    EmptyEndpoints(usize),

    /// No node is marked as the entry.
    #[error("no start node")]
    MissingStart,

    /// No node is marked as terminal.
    #[error("no end node")]
    MissingEnd,

    /// A node no edge touches.
    #[error("node '{0}' is not connected to any edge")]
    Orphan(String),
}

impl GraphSchema {
    /// Parses a graph from JSON text.
    ///
    /// # Errors
    /// Returns the deserialization error.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Node ids, deduplicated and sorted.
    #[must_use]
    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Every directed source-target pair, with fan-in/fan-out edges expanded.
    #[must_use]
    pub fn edge_pairs(&self) -> BTreeSet<(&str, &str)> {
        self.edges
            .iter()
            .flat_map(|edge| {
                edge.sources
                    .iter()
                    .flat_map(move |s| edge.targets.iter().map(move |t| (s.as_str(), t.as_str())))
            })
            .collect()
    }

    /// Checks the graph for structural problems. An empty result means the
    /// graph is well formed.
    #[must_use]
    pub fn validate(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(SchemaIssue::DuplicateNode(node.id.clone()));
            }
        }

        let mut connected = HashSet::new();
        for (index, edge) in self.edges.iter().enumerate() {
            if edge.sources.is_empty() || edge.targets.is_empty() {
                issues.push(SchemaIssue::EmptyEndpoints(index));
            }
            for id in edge.sources.iter().chain(&edge.targets) {
                connected.insert(id.as_str());
                if !seen.contains(id.as_str()) {
                    issues.push(SchemaIssue::UnknownNode { edge: index, node: id.clone() });
                }
            }
        }

        if !self.nodes.iter().any(GraphNode::is_start) {
            issues.push(SchemaIssue::MissingStart);
        }
        if !self.nodes.iter().any(GraphNode::is_end) {
            issues.push(SchemaIssue::MissingEnd);
        }

        if self.nodes.len() > 1 {
            for node in &self.nodes {
                if !connected.contains(node.id.as_str()) {
                    issues.push(SchemaIssue::Orphan(node.id.clone()));
                }
            }
        }

        issues
    }
}
