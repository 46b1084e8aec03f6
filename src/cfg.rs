#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Basic-block control-flow graphs built from Python parse trees.
//!
//! The builder only cares about function entries, conditionals and loops.
//! Two policies shape every graph it produces:
//!
//! - Branches never reconverge. After an `if`/`else`, whatever follows is
//!   attached to the branch visited last.
//! - Loops get a self-edge for repetition and no exit edge. The block that
//!   is active after a loop is the last one created inside its body.

use std::fmt::{self, Display};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::parser::Parser;

/// Positional identifier of a basic block, assigned in traversal order.
pub type BlockId = usize;

/// The concrete source construct a basic block stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockLabel {
    /// Entry of a function definition, carrying its name.
    Function(String),
    /// Header of a `for` loop.
    ForLoop,
    /// Header of a `while` loop.
    WhileLoop,
    /// Test of an `if` or `elif`.
    IfCondition,
    /// Body taken when the test holds.
    TrueBranch,
    /// Alternative taken when the test fails.
    FalseBranch,
    /// A generic group of statements, named by its syntax kind.
    /// `CfgBuilder` never creates one yet; it is the target of the
    /// catch-all concept rule.
    Statement(String),
}

impl Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockLabel::Function(name) => write!(f, "Function: {name}"),
            BlockLabel::ForLoop => f.write_str("Loop: For"),
            BlockLabel::WhileLoop => f.write_str("Loop: While"),
            BlockLabel::IfCondition => f.write_str("Condition: If"),
            BlockLabel::TrueBranch => f.write_str("If: True Block"),
            BlockLabel::FalseBranch => f.write_str("If: False Block"),
            BlockLabel::Statement(kind) => write!(f, "Statement: {kind}"),
        }
    }
}

/// A node of the control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Position of the block in traversal order.
    id:    BlockId,
    /// The construct this block represents.
    label: BlockLabel,
    /// 1-based source line the construct starts on.
    line:  usize,
}

impl BasicBlock {
    /// Returns the block's positional identifier.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the block's concrete label.
    pub fn label(&self) -> &BlockLabel {
        &self.label
    }

    /// Returns the 1-based line the block starts on.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// A directed graph of basic blocks. An edge means control may pass from
/// its source to its target. Parallel edges are never stored.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    /// Block storage; node index `i` always holds block `i`.
    graph: DiGraph<BasicBlock, ()>,
}

impl ControlFlowGraph {
    /// Appends a block and returns its id.
    pub(crate) fn add_block(&mut self, label: BlockLabel, line: usize) -> BlockId {
        let id = self.graph.node_count();
        self.graph.add_node(BasicBlock { id, label, line });
        id
    }

    /// Adds the edge `from -> to` unless it already exists.
    pub(crate) fn connect(&mut self, from: BlockId, to: BlockId) {
        self.graph
            .update_edge(NodeIndex::new(from), NodeIndex::new(to), ());
    }

    /// Iterates over blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> + '_ {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }

    /// Returns the block with the given id.
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.graph.node_weight(NodeIndex::new(id))
    }

    /// Iterates over edges as `(from, to)` pairs, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (BlockId, BlockId)> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().index(), edge.target().index()))
    }

    /// Returns whether the edge `from -> to` exists.
    pub fn has_edge(&self, from: BlockId, to: BlockId) -> bool {
        from < self.node_count()
            && to < self.node_count()
            && self
                .graph
                .contains_edge(NodeIndex::new(from), NodeIndex::new(to))
    }

    /// Returns the sorted successors of a block.
    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        if id >= self.node_count() {
            return Vec::new();
        }
        let mut successors: Vec<_> = self
            .graph
            .neighbors_directed(NodeIndex::new(id), Direction::Outgoing)
            .map(|n| n.index())
            .collect();
        successors.sort_unstable();
        successors
    }

    /// Number of blocks.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no blocks.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

/// Walks a Python parse tree depth-first, pre-order, emitting basic blocks.
pub struct CfgBuilder<'a> {
    /// Source the tree belongs to, for reading identifiers.
    parser:  &'a Parser,
    /// The graph under construction.
    cfg:     ControlFlowGraph,
    /// Block that new constructs are attached to.
    current: Option<BlockId>,
}

impl<'a> CfgBuilder<'a> {
    /// Creates a builder over a parsed program.
    pub fn new(parser: &'a Parser) -> Self {
        Self {
            parser,
            cfg: ControlFlowGraph::default(),
            current: None,
        }
    }

    /// Visits the whole program and returns the finished graph.
    pub fn build(mut self) -> ControlFlowGraph {
        let root = self.parser.root_node();
        self.visit(root);
        self.cfg
    }

    /// Creates a block for `node` and links it from the active block, if
    /// there is one. Does not change the active block.
    fn enter(&mut self, label: BlockLabel, node: Node<'a>) -> BlockId {
        let block = self.add_block(label, node);
        if let Some(active) = self.current {
            self.cfg.connect(active, block);
        }
        block
    }

    /// Creates an unlinked block for `node`.
    fn add_block(&mut self, label: BlockLabel, node: Node<'a>) -> BlockId {
        self.cfg.add_block(label, node.start_position().row + 1)
    }

    /// Dispatches on the syntax kind of `node`.
    fn visit(&mut self, node: Node<'a>) {
        match node.kind() {
            "function_definition" => self.visit_function(node),
            "if_statement" => self.visit_if(node),
            "for_statement" => self.visit_loop(node, BlockLabel::ForLoop),
            "while_statement" => self.visit_loop(node, BlockLabel::WhileLoop),
            _ => self.visit_children(node),
        }
    }

    /// Visits every named child of `node` in source order.
    fn visit_children(&mut self, node: Node<'a>) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    /// `def` and `async def`, decorated or not.
    fn visit_function(&mut self, node: Node<'a>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.parser.node_text(n).to_string())
            .unwrap_or_default();

        let block = self.enter(BlockLabel::Function(name), node);
        self.current = Some(block);
        self.visit_children(node);
    }

    /// An `if` statement together with its `elif`/`else` chain.
    fn visit_if(&mut self, node: Node<'a>) {
        let mut cursor = node.walk();
        let alternatives: Vec<_> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        self.visit_conditional(node, &alternatives);
    }

    /// Handles an `if_statement` or `elif_clause` node, whose remaining
    /// alternatives are `alternatives`.
    ///
    /// An `elif` is a false branch holding a nested conditional, so the
    /// chain `if/elif/else` builds the same graph as nested `if/else`.
    fn visit_conditional(&mut self, node: Node<'a>, alternatives: &[Node<'a>]) {
        let condition = self.enter(BlockLabel::IfCondition, node);
        self.current = Some(condition);
        if let Some(test) = node.child_by_field_name("condition") {
            self.visit(test);
        }

        let consequence = node.child_by_field_name("consequence");
        let true_block = self.add_block(BlockLabel::TrueBranch, consequence.unwrap_or(node));
        self.cfg.connect(condition, true_block);
        self.current = Some(true_block);
        if let Some(body) = consequence {
            self.visit_children(body);
        }

        let Some((&alternative, rest)) = alternatives.split_first() else {
            return;
        };

        let false_block = self.add_block(BlockLabel::FalseBranch, alternative);
        self.cfg.connect(condition, false_block);
        self.current = Some(false_block);
        match alternative.kind() {
            "elif_clause" => self.visit_conditional(alternative, rest),
            _ => {
                if let Some(body) = alternative.child_by_field_name("body") {
                    self.visit_children(body);
                }
            }
        }
    }

    /// `for`, `async for` and `while`. The `else` clause is not visited.
    fn visit_loop(&mut self, node: Node<'a>, label: BlockLabel) {
        let loop_block = self.enter(label, node);
        self.current = Some(loop_block);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }

        self.cfg.connect(loop_block, loop_block);
    }
}

/// Builds the control-flow graph of a parsed program.
pub fn build_cfg(parser: &Parser) -> ControlFlowGraph {
    CfgBuilder::new(parser).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_of(code: &str) -> ControlFlowGraph {
        let parser = Parser::new(code.to_string()).expect("parse");
        build_cfg(&parser)
    }

    fn labels(cfg: &ControlFlowGraph) -> Vec<String> {
        cfg.blocks().map(|b| b.label().to_string()).collect()
    }

    fn edges(cfg: &ControlFlowGraph) -> Vec<(BlockId, BlockId)> {
        let mut edges: Vec<_> = cfg.edges().collect();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn function_with_if() {
        let cfg = cfg_of("def f():\n    if x:\n        return 1\n");

        assert_eq!(labels(&cfg), vec!["Function: f", "Condition: If", "If: True Block"]);
        assert_eq!(edges(&cfg), vec![(0, 1), (1, 2)]);
        assert_eq!(cfg.block(1).map(BasicBlock::line), Some(2));
    }

    #[test]
    fn else_branch_hangs_off_the_condition() {
        let cfg = cfg_of("def f():\n    if x:\n        return 1\n    else:\n        return 0\n");

        assert_eq!(labels(&cfg), vec![
            "Function: f",
            "Condition: If",
            "If: True Block",
            "If: False Block"
        ]);
        assert_eq!(cfg.successors(1), vec![2, 3]);
    }

    #[test]
    fn elif_nests_inside_the_false_branch() {
        let cfg = cfg_of(
            "def f(x):\n    if x > 0:\n        return 1\n    elif x < 0:\n        return -1\n    \
             else:\n        return 0\n",
        );

        assert_eq!(labels(&cfg), vec![
            "Function: f",
            "Condition: If",
            "If: True Block",
            "If: False Block",
            "Condition: If",
            "If: True Block",
            "If: False Block",
        ]);
        assert_eq!(edges(&cfg), vec![(0, 1), (1, 2), (1, 3), (3, 4), (4, 5), (4, 6)]);
    }

    #[test]
    fn loops_get_a_self_edge_and_no_exit() {
        let cfg = cfg_of("def f(n):\n    while n > 0:\n        n -= 1\n    return n\n");

        assert_eq!(labels(&cfg), vec!["Function: f", "Loop: While"]);
        assert_eq!(edges(&cfg), vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn code_after_if_else_follows_the_last_branch() {
        let cfg = cfg_of(
            "def f(x):\n    if x:\n        a = 1\n    else:\n        a = 2\n    while a:\n        \
             a -= 1\n",
        );

        assert_eq!(cfg.block(4).map(|b| b.label().clone()), Some(BlockLabel::WhileLoop));
        assert!(cfg.has_edge(3, 4));
        assert!(!cfg.has_edge(2, 4));
        assert!(!cfg.has_edge(1, 4));
    }

    #[test]
    fn active_block_after_a_loop_is_the_last_one_in_its_body() {
        let cfg = cfg_of(
            "def f(xs):\n    for x in xs:\n        if x:\n            pass\n    while True:\n        \
             break\n",
        );

        assert_eq!(labels(&cfg), vec![
            "Function: f",
            "Loop: For",
            "Condition: If",
            "If: True Block",
            "Loop: While",
        ]);
        assert_eq!(edges(&cfg), vec![(0, 1), (1, 1), (1, 2), (2, 3), (3, 4), (4, 4)]);
    }

    #[test]
    fn loop_else_clause_is_not_visited() {
        let cfg = cfg_of(
            "def f(xs):\n    for x in xs:\n        pass\n    else:\n        if xs:\n            \
             pass\n",
        );

        assert_eq!(labels(&cfg), vec!["Function: f", "Loop: For"]);
    }

    #[test]
    fn consecutive_functions_are_chained() {
        let cfg = cfg_of("def a():\n    pass\n\n@decorator\ndef b():\n    pass\n");

        assert_eq!(labels(&cfg), vec!["Function: a", "Function: b"]);
        assert_eq!(edges(&cfg), vec![(0, 1)]);
    }

    #[test]
    fn methods_and_async_constructs_are_visited() {
        let cfg = cfg_of(
            "class C:\n    async def run(self, xs):\n        async for x in xs:\n            \
             pass\n",
        );

        assert_eq!(labels(&cfg), vec!["Function: run", "Loop: For"]);
    }

    #[test]
    fn module_level_constructs_have_no_incoming_edge() {
        let cfg = cfg_of("for i in range(3):\n    print(i)\n");

        assert_eq!(labels(&cfg), vec!["Loop: For"]);
        assert_eq!(edges(&cfg), vec![(0, 0)]);
    }

    #[test]
    fn nested_blocks_inside_try_are_found() {
        let cfg = cfg_of(
            "def f():\n    try:\n        while True:\n            pass\n    except ValueError:\n        \
             pass\n",
        );

        assert_eq!(labels(&cfg), vec!["Function: f", "Loop: While"]);
    }

    #[test]
    fn comprehensions_and_conditional_expressions_are_not_blocks() {
        let cfg = cfg_of("def f(xs):\n    return [x for x in xs if x] if xs else []\n");

        assert_eq!(labels(&cfg), vec!["Function: f"]);
        assert_eq!(cfg.edge_count(), 0);
    }

    #[test]
    fn empty_program_yields_empty_graph() {
        let cfg = cfg_of("x = 1\nprint(x)\n");

        assert!(cfg.is_empty());
        assert_eq!(cfg.edge_count(), 0);
    }
}
