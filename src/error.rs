#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Errors raised at the edges of grading: reading, parsing, rubric loading.
//!
//! Graph construction, abstraction and matching are total and never return
//! one of these.

use std::path::PathBuf;

/// Errors that can occur while preparing a submission for grading.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// The source code does not parse as Python.
    #[error("Syntax error at line {line}, column {column}.")]
    Syntax {
        /// 1-based line of the first error node.
        line:   usize,
        /// 1-based column of the first error node.
        column: usize,
    },
    /// The rubric is not valid JSON of the expected shape.
    #[error("Could not parse rubric: {0}")]
    Rubric(#[from] serde_json::Error),
    /// A file could not be read.
    #[error("Could not read {}: {source}", path.display())]
    Io {
        /// The file that failed.
        path:   PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The tree-sitter parser itself failed.
    #[error("Parser error: {0}")]
    Parser(#[from] anyhow::Error),
}

impl GradeError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
