//! # conceptgrade
//!
//! A structural autograder for CS1 Python assignments. Each program's
//! control flow is reduced to a graph of programming concepts (functions,
//! loops, conditionals) and the student's graph is matched against the
//! reference solution's, independent of names, literals and surface syntax.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Grading every student and task under a directory tree
pub mod batch;
/// Basic-block control-flow graphs
pub mod cfg;
/// Concept abstraction and concept graphs
pub mod concept;
/// Grading configuration
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Errors at the parsing and I/O edges
pub mod error;
/// Feedback text rendered from similarity diffs
pub mod feedback;
/// Grading a single submission
pub mod grade;
/// Matching concept graphs
pub mod matcher;
/// Tree-sitter Python parser wrapper
pub mod parser;
/// Concept rubrics
pub mod rubric;
/// Utility functions for convenience
pub mod util;

pub use concept::{Concept, ConceptGraph, build_concept_graph};
pub use error::GradeError;
pub use matcher::{SimilarityResult, compare};
pub use parser::Parser;
