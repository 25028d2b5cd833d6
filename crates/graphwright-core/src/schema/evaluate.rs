//! Scores a predicted graph against an expected one.

use super::GraphSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Precision, recall and F1 of one element kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Correctness {
    /// Share of predicted elements that are expected.
    pub precision: f64,
    /// Share of expected elements that were predicted.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

impl Correctness {
    /// Compares two element lists by structural equality.
    #[must_use]
    pub fn of<T: PartialEq>(predicted: &[T], expected: &[T]) -> Self {
        let hits = predicted.iter().filter(|p| expected.contains(p)).count();
        let found = expected.iter().filter(|e| predicted.contains(e)).count();

        let precision = ratio(hits, predicted.len());
        let recall = ratio(found, expected.len());
        let f1 = if precision + recall > 0.0 { 2.0 * precision * recall / (precision + recall) } else { 0.0 };

        Self { precision, recall, f1 }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

/// Every metric for one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Recursive key agreement of the state schemas.
    pub state_match: f64,
    /// Node correctness.
    pub nodes: Correctness,
    /// Edge correctness.
    pub edges: Correctness,
    /// One minus the normalized graph edit distance.
    pub structure_similarity: f64,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state match           {:.3}", self.state_match)?;
        writeln!(
            f,
            "nodes                 precision {:.3}  recall {:.3}  f1 {:.3}",
            self.nodes.precision, self.nodes.recall, self.nodes.f1
        )?;
        writeln!(
            f,
            "edges                 precision {:.3}  recall {:.3}  f1 {:.3}",
            self.edges.precision, self.edges.recall, self.edges.f1
        )?;
        write!(f, "structure similarity  {:.3}", self.structure_similarity)
    }
}

/// Recursive agreement between two state schemas in `[0, 1]`.
///
/// Two objects score `2 * sum(match of common keys) / (|pred| + |exp|)`, so
/// identical objects score 1 and two empty objects score 1. Any other pair of
/// values scores 1 when equal and 0 otherwise.
#[must_use]
pub fn state_schema_match(predicted: &Value, expected: &Value) -> f64 {
    match (predicted, expected) {
        (Value::Object(pred), Value::Object(exp)) => {
            let total = pred.len() + exp.len();
            if total == 0 {
                return 1.0;
            }
            let matched: f64 = pred
                .iter()
                .filter_map(|(key, value)| exp.get(key).map(|other| state_schema_match(value, other)))
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let total = total as f64;
            2.0 * matched / total
        }
        _ => {
            if predicted == expected {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Node and edge correctness, in that order.
#[must_use]
pub fn node_edge_correctness(predicted: &GraphSchema, expected: &GraphSchema) -> (Correctness, Correctness) {
    (Correctness::of(&predicted.nodes, &expected.nodes), Correctness::of(&predicted.edges, &expected.edges))
}

/// Similarity from the node-labelled graph edit distance.
///
/// The distance counts node ids and directed edge pairs present in only one
/// graph; it is normalized by the element count of both graphs.
#[must_use]
pub fn graph_structure_similarity(predicted: &GraphSchema, expected: &GraphSchema) -> f64 {
    let pred_nodes = predicted.node_ids();
    let exp_nodes = expected.node_ids();
    let pred_edges = predicted.edge_pairs();
    let exp_edges = expected.edge_pairs();

    let total = pred_nodes.len() + exp_nodes.len() + pred_edges.len() + exp_edges.len();
    if total == 0 {
        return 1.0;
    }

    let distance =
        pred_nodes.symmetric_difference(&exp_nodes).count() + pred_edges.symmetric_difference(&exp_edges).count();

    1.0 - ratio(distance, total)
}

/// Computes every metric.
#[must_use]
pub fn evaluate(predicted: &GraphSchema, expected: &GraphSchema) -> EvaluationReport {
    let (nodes, edges) = node_edge_correctness(predicted, expected);
    EvaluationReport {
        state_match: state_schema_match(&predicted.state, &expected.state),
        nodes,
        edges,
        structure_similarity: graph_structure_similarity(predicted, expected),
    }
}
