#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Structural matching between a student's and a reference concept graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    cfg::BlockId,
    concept::{Concept, ConceptGraph},
    constants::{DEFAULT_EDGE_WEIGHT, DEFAULT_NODE_WEIGHT},
};

/// A node as compared by the matcher: its position and its concept.
pub type NodePair = (BlockId, Concept);

/// An edge as compared by the matcher: the concepts at either end.
pub type EdgePair = (Concept, Concept);

/// Weights of node and edge similarity in the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    /// Weight of node similarity.
    node: f64,
    /// Weight of edge similarity.
    edge: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE_WEIGHT,
            edge: DEFAULT_EDGE_WEIGHT,
        }
    }
}

impl MatchWeights {
    /// Creates a weighting. Callers keep `node + edge == 1` to keep the
    /// combined score in `[0, 1]`.
    pub fn new(node: f64, edge: f64) -> Self {
        Self { node, edge }
    }

    /// Weight of node similarity.
    pub fn node(&self) -> f64 {
        self.node
    }

    /// Weight of edge similarity.
    pub fn edge(&self) -> f64 {
        self.edge
    }
}

/// Outcome of comparing a student graph against a reference graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    /// Fraction of reference nodes matched.
    node_similarity: f64,
    /// Fraction of reference edges matched.
    edge_similarity: f64,
    /// Weighted combination of the two.
    similarity:      f64,
    /// Reference nodes the student lacks.
    missing_nodes:   BTreeSet<NodePair>,
    /// Student nodes the reference lacks.
    extra_nodes:     BTreeSet<NodePair>,
    /// Reference edges the student lacks.
    missing_edges:   BTreeSet<EdgePair>,
    /// Student edges the reference lacks.
    extra_edges:     BTreeSet<EdgePair>,
    /// Reference source line of each missing node.
    missing_lines:   BTreeMap<BlockId, usize>,
    /// Student source line of each extra node.
    extra_lines:     BTreeMap<BlockId, usize>,
}

impl SimilarityResult {
    /// Fraction of reference nodes matched, in `[0, 1]`.
    pub fn node_similarity(&self) -> f64 {
        self.node_similarity
    }

    /// Fraction of reference edges matched, in `[0, 1]`.
    pub fn edge_similarity(&self) -> f64 {
        self.edge_similarity
    }

    /// Combined similarity, in `[0, 1]` for weights summing to one.
    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    /// Nodes present in the reference but not in the submission.
    pub fn missing_nodes(&self) -> &BTreeSet<NodePair> {
        &self.missing_nodes
    }

    /// Nodes present in the submission but not in the reference.
    pub fn extra_nodes(&self) -> &BTreeSet<NodePair> {
        &self.extra_nodes
    }

    /// Relationships present in the reference but not in the submission.
    pub fn missing_edges(&self) -> &BTreeSet<EdgePair> {
        &self.missing_edges
    }

    /// Relationships present in the submission but not in the reference.
    pub fn extra_edges(&self) -> &BTreeSet<EdgePair> {
        &self.extra_edges
    }

    /// Line of a missing node in the reference source.
    pub fn missing_line(&self, id: BlockId) -> Option<usize> {
        self.missing_lines.get(&id).copied()
    }

    /// Line of an extra node in the student's source.
    pub fn extra_line(&self, id: BlockId) -> Option<usize> {
        self.extra_lines.get(&id).copied()
    }

    /// Whether all four diff sets are empty.
    pub fn is_exact(&self) -> bool {
        self.missing_nodes.is_empty()
            && self.extra_nodes.is_empty()
            && self.missing_edges.is_empty()
            && self.extra_edges.is_empty()
    }
}

/// Compares `student` against `reference` with the default weights.
///
/// Scores are normalised by the reference, so `compare(a, b)` and
/// `compare(b, a)` generally differ.
pub fn compare(student: &ConceptGraph, reference: &ConceptGraph) -> SimilarityResult {
    compare_with(student, reference, &MatchWeights::default())
}

/// Compares `student` against `reference`.
///
/// A node matches only when both position and concept agree. An edge matches
/// when the same concept pair is connected in both graphs. Denominators are
/// floored at one, so an empty reference scores zero instead of failing.
pub fn compare_with(
    student: &ConceptGraph,
    reference: &ConceptGraph,
    weights: &MatchWeights,
) -> SimilarityResult {
    let (node_similarity, missing_nodes, extra_nodes) =
        match_sets(student.node_pairs(), reference.node_pairs());
    let (edge_similarity, missing_edges, extra_edges) =
        match_sets(student.edge_pairs(), reference.edge_pairs());

    let similarity = weights.node * node_similarity + weights.edge * edge_similarity;
    let missing_lines = lines_of(&missing_nodes, reference);
    let extra_lines = lines_of(&extra_nodes, student);

    tracing::debug!(
        node_similarity,
        edge_similarity,
        similarity,
        missing_nodes = missing_nodes.len(),
        extra_nodes = extra_nodes.len(),
        missing_edges = missing_edges.len(),
        extra_edges = extra_edges.len(),
        "Compared concept graphs"
    );

    SimilarityResult {
        node_similarity,
        edge_similarity,
        similarity,
        missing_nodes,
        extra_nodes,
        missing_edges,
        extra_edges,
        missing_lines,
        extra_lines,
    }
}

/// Looks up the source line of each node in `graph`.
fn lines_of(nodes: &BTreeSet<NodePair>, graph: &ConceptGraph) -> BTreeMap<BlockId, usize> {
    nodes
        .iter()
        .filter_map(|(id, _)| graph.line(*id).map(|line| (*id, line)))
        .collect()
}

/// Returns `(matched / max(|reference|, 1), missing, extra)`.
fn match_sets<T: Ord + Clone>(
    student: BTreeSet<T>,
    reference: BTreeSet<T>,
) -> (f64, BTreeSet<T>, BTreeSet<T>) {
    let matched = student.intersection(&reference).count();
    let similarity = matched as f64 / reference.len().max(1) as f64;
    let missing = reference.difference(&student).cloned().collect();
    let extra = student.difference(&reference).cloned().collect();
    (similarity, missing, extra)
}
