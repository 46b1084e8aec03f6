#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grades one submission against one reference solution.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    concept::build_concept_graph,
    config::GradingConfig,
    error::GradeError,
    feedback::render_feedback,
    matcher::{SimilarityResult, compare_with},
    parser::Parser,
    rubric::{Rubric, RubricScore},
};

/// The graded outcome of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskGrade {
    /// Task name, e.g. `task3`.
    task:        String,
    /// Final score on a 0–100 scale.
    final_score: f64,
    /// Structural comparison against the reference.
    similarity:  SimilarityResult,
    /// Points earned against the rubric.
    rubric:      RubricScore,
    /// Feedback rendered from the similarity diff.
    feedback:    String,
}

impl TaskGrade {
    /// Task name.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Final score on a 0–100 scale.
    pub fn final_score(&self) -> f64 {
        self.final_score
    }

    /// Structural comparison against the reference.
    pub fn similarity(&self) -> &SimilarityResult {
        &self.similarity
    }

    /// Combined similarity on a 0–100 scale.
    pub fn similarity_percent(&self) -> f64 {
        self.similarity.similarity() * 100.0
    }

    /// Points earned against the rubric.
    pub fn rubric(&self) -> RubricScore {
        self.rubric
    }

    /// Feedback text; empty for an exact structural match.
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Renders the result file contents.
    pub fn to_report(&self) -> String {
        format!(
            "Task: {}\nFinal Task Score: {:.2}\nSimilarity Score: {:.2}\nFeedback:\n{}",
            self.task,
            self.final_score,
            self.similarity_percent(),
            self.feedback
        )
    }
}

/// Blends similarity (`[0, 1]`) and rubric score into a 0–100 final score.
///
/// * `similarity`: combined similarity
/// * `rubric`: rubric points earned
/// * `similarity_share`: weight of similarity; the rubric gets the rest
pub fn final_task_score(similarity: f64, rubric: RubricScore, similarity_share: f64) -> f64 {
    similarity_share * similarity * 100.0 + (1.0 - similarity_share) * rubric.percent()
}

/// Parses `code`, rejecting programs with syntax errors.
pub fn parse_checked(code: &str) -> Result<Parser, GradeError> {
    let parser = Parser::new(code.to_owned())?;
    parser.ensure_valid()?;
    Ok(parser)
}

/// Grades `student_code` against `reference_code`.
///
/// * `task`: task name used in the report
/// * `student_code`: the submission's source
/// * `reference_code`: the reference solution's source
/// * `rubric`: concept points for this task
/// * `config`: weights to apply
pub fn grade_submission(
    task: &str,
    student_code: &str,
    reference_code: &str,
    rubric: &Rubric,
    config: &GradingConfig,
) -> Result<TaskGrade, GradeError> {
    let student = parse_checked(student_code)?;
    let reference = parse_checked(reference_code)?;

    let student_graph = build_concept_graph(&student);
    let reference_graph = build_concept_graph(&reference);

    let similarity = compare_with(&student_graph, &reference_graph, config.weights());
    let rubric_score = rubric.score(&student_graph);
    let final_score =
        final_task_score(similarity.similarity(), rubric_score, config.similarity_share());
    let feedback = render_feedback(&similarity);

    tracing::debug!(
        task,
        rubric = %rubric_score,
        similarity = similarity.similarity(),
        final_score,
        "Graded submission"
    );

    Ok(TaskGrade {
        task: task.to_string(),
        final_score,
        similarity,
        rubric: rubric_score,
        feedback,
    })
}

/// Reads the submission, reference and optional rubric from disk and grades
/// them. Without a rubric the rubric share of the score is zero.
pub fn grade_files(
    task: &str,
    student: &Path,
    reference: &Path,
    rubric: Option<&Path>,
    config: &GradingConfig,
) -> Result<TaskGrade> {
    let student_code = std::fs::read_to_string(student)
        .with_context(|| format!("Could not read submission {}", student.display()))?;
    let reference_code = std::fs::read_to_string(reference)
        .with_context(|| format!("Could not read reference {}", reference.display()))?;
    let rubric = match rubric {
        Some(path) => Rubric::load(path)?,
        None => Rubric::default(),
    };

    grade_submission(task, &student_code, &reference_code, &rubric, config)
        .with_context(|| format!("Could not grade {}", student.display()))
}
