#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grades every task of every student under a submissions directory.
//!
//! Each (student, task) pair is independent: pairs are graded concurrently
//! on the blocking pool and share nothing but the read-only configuration.

use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use tabled::Tabled;

use crate::{
    config::GradingConfig,
    constants::{RESULT_FILE_SUFFIX, RUBRIC_EXTENSION, SOURCE_EXTENSION},
    grade::{TaskGrade, grade_submission},
    rubric::Rubric,
    util::{file_name, file_stem, find_files, sub_dirs},
};

/// What happened to one (student, task) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutcomeStatus {
    /// Graded and the result file written.
    Graded,
    /// Not graded, e.g. a missing file or a syntax error.
    Skipped(String),
}

impl Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Graded => f.write_str("Graded"),
            OutcomeStatus::Skipped(reason) => write!(f, "Skipped: {reason}"),
        }
    }
}

/// An optional score shown with two decimals, or `-`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Score(Option<f64>);

impl Score {
    /// The underlying value, if the pair was graded.
    pub fn value(&self) -> Option<f64> {
        self.0
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(score) => write!(f, "{score:.2}"),
            None => f.write_str("-"),
        }
    }
}

/// One row of the batch summary.
#[derive(Tabled, Debug, Clone, Serialize)]
pub struct TaskOutcome {
    #[tabled(rename = "Student")]
    /// * `student`: name of the student's directory
    student:     String,
    #[tabled(rename = "Task")]
    /// * `task`: task name
    task:        String,
    #[tabled(rename = "Final")]
    /// * `final_score`: final task score, when graded
    final_score: Score,
    #[tabled(rename = "Similarity")]
    /// * `similarity`: similarity percentage, when graded
    similarity:  Score,
    #[tabled(rename = "Status")]
    /// * `status`: graded or the reason it was skipped
    status:      OutcomeStatus,
    #[tabled(skip)]
    /// * `report`: path of the written result file
    report:      Option<PathBuf>,
}

impl TaskOutcome {
    /// Builds a row for a pair that was not graded.
    fn skipped(student: &str, task: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!("Skipping {task} for {student}: {reason}");
        Self {
            student:     student.to_string(),
            task:        task.to_string(),
            final_score: Score::default(),
            similarity:  Score::default(),
            status:      OutcomeStatus::Skipped(reason),
            report:      None,
        }
    }

    /// Builds a row for a graded pair.
    fn graded(student: &str, grade: &TaskGrade, report: PathBuf) -> Self {
        Self {
            student:     student.to_string(),
            task:        grade.task().to_string(),
            final_score: Score(Some(grade.final_score())),
            similarity:  Score(Some(grade.similarity_percent())),
            status:      OutcomeStatus::Graded,
            report:      Some(report),
        }
    }

    /// Student directory name.
    pub fn student(&self) -> &str {
        &self.student
    }

    /// Task name.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Final score, when graded.
    pub fn final_score(&self) -> Option<f64> {
        self.final_score.value()
    }

    /// Similarity percentage, when graded.
    pub fn similarity(&self) -> Option<f64> {
        self.similarity.value()
    }

    /// Graded or skipped.
    pub fn status(&self) -> &OutcomeStatus {
        &self.status
    }

    /// Path of the result file, when graded.
    pub fn report(&self) -> Option<&Path> {
        self.report.as_deref()
    }
}

/// Returns the configured tasks, or the stem of every reference solution
/// when none are configured.
pub fn resolve_tasks(config: &GradingConfig) -> Result<Vec<String>> {
    if !config.tasks().is_empty() {
        return Ok(config.tasks().to_vec());
    }

    let tasks: Vec<_> = find_files(SOURCE_EXTENSION, 0, config.references_dir())?
        .iter()
        .filter_map(|path| file_stem(path))
        .collect();
    tracing::debug!(?tasks, "Discovered tasks from reference solutions");
    Ok(tasks)
}

/// Grades every task for every student and writes one result file per
/// graded pair. Rows come back ordered by student, then task.
pub async fn evaluate_all_tasks(config: &GradingConfig) -> Result<Vec<TaskOutcome>> {
    let tasks = resolve_tasks(config)?;
    let students = sub_dirs(config.submissions_dir())?;

    std::fs::create_dir_all(config.results_dir()).with_context(|| {
        format!("Could not create results directory {}", config.results_dir().display())
    })?;

    let config = Arc::new(config.clone());
    let mut handles = Vec::with_capacity(students.len() * tasks.len());
    for student_dir in students {
        let Some(student) = file_name(&student_dir) else {
            continue;
        };
        tracing::info!("Evaluating tasks for {student}...");

        for task in &tasks {
            let config = Arc::clone(&config);
            let student = student.clone();
            let student_dir = student_dir.clone();
            let task = task.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                evaluate_task(&config, &student, &student_dir, &task)
            }));
        }
    }

    join_all(handles)
        .await
        .into_iter()
        .map(|handle| handle.context("Grading task panicked"))
        .collect()
}

/// Grades a single pair and writes its result file.
fn evaluate_task(
    config: &GradingConfig,
    student: &str,
    student_dir: &Path,
    task: &str,
) -> TaskOutcome {
    let student_file = student_dir.join(format!("{task}.{SOURCE_EXTENSION}"));
    let reference_file = config
        .references_dir()
        .join(format!("{task}.{SOURCE_EXTENSION}"));
    let rubric_file = config
        .rubrics_dir()
        .join(format!("{task}.{RUBRIC_EXTENSION}"));

    if !(student_file.exists() && reference_file.exists() && rubric_file.exists()) {
        return TaskOutcome::skipped(student, task, "missing files");
    }

    let student_code = match std::fs::read_to_string(&student_file) {
        Ok(code) => code,
        Err(e) => return TaskOutcome::skipped(student, task, e.to_string()),
    };
    let reference_code = match std::fs::read_to_string(&reference_file) {
        Ok(code) => code,
        Err(e) => return TaskOutcome::skipped(student, task, e.to_string()),
    };
    let rubric = match Rubric::load(&rubric_file) {
        Ok(rubric) => rubric,
        Err(e) => return TaskOutcome::skipped(student, task, e.to_string()),
    };

    let grade = match grade_submission(task, &student_code, &reference_code, &rubric, config) {
        Ok(grade) => grade,
        Err(e) => return TaskOutcome::skipped(student, task, e.to_string()),
    };

    match write_report(config.results_dir(), student, &grade) {
        Ok(report) => {
            tracing::info!(
                "Task {task} evaluated for {student}. Results saved to {}.",
                report.display()
            );
            TaskOutcome::graded(student, &grade, report)
        }
        Err(e) => TaskOutcome::skipped(student, task, format!("{e:#}")),
    }
}

/// Writes `<results>/<student>/<task>_results.txt` and returns its path.
fn write_report(results_dir: &Path, student: &str, grade: &TaskGrade) -> Result<PathBuf> {
    let student_results = results_dir.join(student);
    std::fs::create_dir_all(&student_results)
        .with_context(|| format!("Could not create {}", student_results.display()))?;

    let path = student_results.join(format!("{}{RESULT_FILE_SUFFIX}", grade.task()));
    std::fs::write(&path, grade.to_report())
        .with_context(|| format!("Could not write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_display() {
        assert_eq!(Score(Some(12.346)).to_string(), "12.35");
        assert_eq!(Score(None).to_string(), "-");
    }

    #[test]
    fn status_display() {
        assert_eq!(OutcomeStatus::Graded.to_string(), "Graded");
        assert_eq!(
            OutcomeStatus::Skipped("missing files".into()).to_string(),
            "Skipped: missing files"
        );
    }

    #[test]
    fn configured_tasks_take_precedence() {
        let config = GradingConfig::default().with_tasks(vec!["lab".to_string()]);
        assert_eq!(resolve_tasks(&config).expect("tasks"), vec!["lab".to_string()]);
    }
}
