#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Concept graphs: control-flow graphs relabelled with abstract programming
//! concepts.
//!
//! A concept graph has exactly the nodes and edges of the control-flow graph
//! it came from. Nodes keep the positional id of their block. Matching
//! compares nodes by `(id, concept)` and edges by the concepts at either
//! end, see [`ConceptGraph::node_pairs`] and [`ConceptGraph::edge_pairs`].

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    str::FromStr,
};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use crate::{
    cfg::{BlockId, BlockLabel, ControlFlowGraph, build_cfg},
    parser::Parser,
};

/// One of the fixed set of concepts a basic block abstracts to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Concept {
    /// A function keeps its identity.
    Function(String),
    /// `Concept: For Loop`
    ForLoop,
    /// `Concept: While Loop`
    WhileLoop,
    /// `Concept: If Condition`
    IfCondition,
    /// `Concept: Conditional Branch`, either arm of a conditional.
    ConditionalBranch,
    /// `Concept: General`, anything no other rule claims.
    General,
}

/// Prefix of function concept labels.
const FUNCTION_PREFIX: &str = "Function: ";

impl Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concept::Function(name) => write!(f, "{FUNCTION_PREFIX}{name}"),
            Concept::ForLoop => f.write_str("Concept: For Loop"),
            Concept::WhileLoop => f.write_str("Concept: While Loop"),
            Concept::IfCondition => f.write_str("Concept: If Condition"),
            Concept::ConditionalBranch => f.write_str("Concept: Conditional Branch"),
            Concept::General => f.write_str("Concept: General"),
        }
    }
}

/// Returned when a string is not a concept label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not a concept label.")]
pub struct UnknownConcept(pub String);

impl FromStr for Concept {
    type Err = UnknownConcept;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix(FUNCTION_PREFIX) {
            return Ok(Concept::Function(name.to_string()));
        }

        match s {
            "Concept: For Loop" => Ok(Concept::ForLoop),
            "Concept: While Loop" => Ok(Concept::WhileLoop),
            "Concept: If Condition" => Ok(Concept::IfCondition),
            "Concept: Conditional Branch" => Ok(Concept::ConditionalBranch),
            "Concept: General" => Ok(Concept::General),
            _ => Err(UnknownConcept(s.to_string())),
        }
    }
}

impl From<Concept> for String {
    fn from(concept: Concept) -> Self {
        concept.to_string()
    }
}

impl TryFrom<String> for Concept {
    type Error = UnknownConcept;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Maps a concrete block label to its concept.
///
/// Rules are tried top to bottom and the first one wins. A new construct is
/// recognised by adding a [`BlockLabel`] variant and a rule for it above the
/// final catch-all arm.
pub fn abstract_label(label: &BlockLabel) -> Concept {
    match label {
        BlockLabel::Function(name) => Concept::Function(name.clone()),
        BlockLabel::ForLoop => Concept::ForLoop,
        BlockLabel::WhileLoop => Concept::WhileLoop,
        BlockLabel::IfCondition => Concept::IfCondition,
        BlockLabel::TrueBranch | BlockLabel::FalseBranch => Concept::ConditionalBranch,
        BlockLabel::Statement(_) => Concept::General,
    }
}

/// A control-flow graph whose nodes carry concepts instead of block labels.
#[derive(Debug, Clone, Default)]
pub struct ConceptGraph {
    /// Node index `i` holds the concept of block `i`.
    graph: DiGraph<Concept, ()>,
    /// Source line of block `i`.
    lines: Vec<usize>,
}

impl ConceptGraph {
    /// Abstracts every block and edge of `cfg`.
    pub fn from_cfg(cfg: &ControlFlowGraph) -> Self {
        let mut graph = DiGraph::with_capacity(cfg.node_count(), cfg.edge_count());
        let mut lines = Vec::with_capacity(cfg.node_count());
        for block in cfg.blocks() {
            graph.add_node(abstract_label(block.label()));
            lines.push(block.line());
        }
        for (from, to) in cfg.edges() {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }

        Self { graph, lines }
    }

    /// Number of nodes; always the block count of the source graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges; always the edge count of the source graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the concept of the node at position `id`.
    pub fn concept(&self, id: BlockId) -> Option<&Concept> {
        self.graph.node_weight(NodeIndex::new(id))
    }

    /// Returns the 1-based source line of the node at position `id`.
    pub fn line(&self, id: BlockId) -> Option<usize> {
        self.lines.get(id).copied()
    }

    /// Iterates over `(id, concept)` in id order.
    pub fn concepts(&self) -> impl Iterator<Item = (BlockId, &Concept)> + '_ {
        self.graph
            .raw_nodes()
            .iter()
            .enumerate()
            .map(|(id, node)| (id, &node.weight))
    }

    /// Whether any node carries `concept`.
    pub fn contains(&self, concept: &Concept) -> bool {
        self.graph.raw_nodes().iter().any(|node| &node.weight == concept)
    }

    /// Node identity used for matching: position plus concept.
    pub fn node_pairs(&self) -> BTreeSet<(BlockId, Concept)> {
        self.concepts()
            .map(|(id, concept)| (id, concept.clone()))
            .collect()
    }

    /// Edge identity used for matching: the concepts at either end.
    /// Edges between equal concept pairs collapse into one.
    pub fn edge_pairs(&self) -> BTreeSet<(Concept, Concept)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| {
                (
                    self.graph[edge.source()].clone(),
                    self.graph[edge.target()].clone(),
                )
            })
            .collect()
    }
}

impl Serialize for ConceptGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        /// A node as it appears in JSON output.
        #[derive(Serialize)]
        struct ConceptNode<'g> {
            /// Positional id.
            id:      BlockId,
            /// Concept label.
            concept: &'g Concept,
            /// Source line.
            line:    Option<usize>,
        }

        let nodes: Vec<_> = self
            .concepts()
            .map(|(id, concept)| ConceptNode {
                id,
                concept,
                line: self.line(id),
            })
            .collect();
        let edges: Vec<_> = self
            .graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect();

        let mut state = serializer.serialize_struct("ConceptGraph", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }
}

/// Builds the concept graph of a parsed program.
pub fn build_concept_graph(parser: &Parser) -> ConceptGraph {
    let cfg = build_cfg(parser);
    let graph = ConceptGraph::from_cfg(&cfg);
    tracing::debug!(
        blocks = cfg.node_count(),
        edges = cfg.edge_count(),
        "Built concept graph: {}",
        graph.concepts().map(|(_, c)| c.to_string()).collect::<Vec<_>>().join(", ")
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(code: &str) -> ConceptGraph {
        let parser = Parser::new(code.to_string()).expect("parse");
        build_concept_graph(&parser)
    }

    #[test]
    fn rule_table_covers_every_label() {
        let cases = [
            (BlockLabel::Function("main".into()), "Function: main"),
            (BlockLabel::ForLoop, "Concept: For Loop"),
            (BlockLabel::WhileLoop, "Concept: While Loop"),
            (BlockLabel::IfCondition, "Concept: If Condition"),
            (BlockLabel::TrueBranch, "Concept: Conditional Branch"),
            (BlockLabel::FalseBranch, "Concept: Conditional Branch"),
            (BlockLabel::Statement("with_statement".into()), "Concept: General"),
        ];

        for (label, expected) in cases {
            assert_eq!(abstract_label(&label).to_string(), expected, "{label}");
        }
    }

    #[test]
    fn function_names_that_look_like_loops_stay_functions() {
        let concept = abstract_label(&BlockLabel::Function("Loop".into()));
        assert_eq!(concept, Concept::Function("Loop".into()));
    }

    #[test]
    fn labels_parse_back() {
        for concept in [
            Concept::Function("solve".into()),
            Concept::ForLoop,
            Concept::WhileLoop,
            Concept::IfCondition,
            Concept::ConditionalBranch,
            Concept::General,
        ] {
            assert_eq!(concept.to_string().parse::<Concept>(), Ok(concept.clone()));
        }
        assert!("Concept: Recursion".parse::<Concept>().is_err());
    }

    #[test]
    fn reference_if_graph() {
        let graph = graph_of("def f(): \n if x: \n  return 1\n");

        let concepts: BTreeSet<_> = graph.concepts().map(|(_, c)| c.to_string()).collect();
        assert_eq!(
            concepts,
            BTreeSet::from([
                "Function: f".to_string(),
                "Concept: If Condition".to_string(),
                "Concept: Conditional Branch".to_string(),
            ])
        );
        assert!(
            graph
                .edge_pairs()
                .contains(&(Concept::Function("f".into()), Concept::IfCondition))
        );
    }

    #[test]
    fn abstraction_preserves_nodes_and_edges() {
        let code = concat!(
            "def f(xs):\n",
            "    for x in xs:\n",
            "        if x:\n",
            "            pass\n",
            "        else:\n",
            "            pass\n",
        );
        let parser = Parser::new(code.to_string()).expect("parse");
        let cfg = build_cfg(&parser);
        let graph = ConceptGraph::from_cfg(&cfg);

        assert_eq!(graph.node_count(), cfg.node_count());
        assert_eq!(graph.edge_count(), cfg.edge_count());
        for block in cfg.blocks() {
            assert_eq!(graph.concept(block.id()), Some(&abstract_label(block.label())));
        }
    }

    #[test]
    fn edge_pairs_collapse_same_concept_edges() {
        let graph = graph_of("def f():\n    if x:\n        pass\n    else:\n        pass\n");

        assert_eq!(graph.edge_count(), 3);
        assert_eq!(
            graph.edge_pairs(),
            BTreeSet::from([
                (Concept::Function("f".into()), Concept::IfCondition),
                (Concept::IfCondition, Concept::ConditionalBranch),
            ])
        );
    }

    #[test]
    fn general_catch_all_is_reachable() {
        let mut cfg = ControlFlowGraph::default();
        let entry = cfg.add_block(BlockLabel::Function("main".into()), 1);
        let body = cfg.add_block(BlockLabel::Statement("with_statement".into()), 2);
        cfg.connect(entry, body);

        let graph = ConceptGraph::from_cfg(&cfg);
        assert_eq!(graph.concept(body), Some(&Concept::General));
        assert!(graph.contains(&Concept::General));
    }

    #[test]
    fn serializes_nodes_and_edges() {
        let graph = graph_of("def f():\n    while x:\n        pass\n");
        let json = serde_json::to_value(&graph).expect("serialize");

        assert_eq!(json["nodes"][0]["concept"], "Function: f");
        assert_eq!(json["nodes"][1]["concept"], "Concept: While Loop");
        assert_eq!(json["nodes"][1]["line"], 2);
        assert_eq!(json["edges"].as_array().map(Vec::len), Some(2));
    }
}
