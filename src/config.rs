#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grading configuration: where submissions live, which tasks to grade and
//! how scores are weighted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use bon::Builder;
use itertools::Itertools;

use crate::{
    constants::{
        DEFAULT_REFERENCES_DIR, DEFAULT_RESULTS_DIR, DEFAULT_RUBRICS_DIR,
        DEFAULT_SIMILARITY_SHARE, DEFAULT_SUBMISSIONS_DIR, DEFAULT_TASK_COUNT, NODE_WEIGHT_VAR,
        REFERENCES_DIR_VAR, RESULTS_DIR_VAR, RUBRICS_DIR_VAR, SIMILARITY_SHARE_VAR,
        SUBMISSIONS_DIR_VAR, TASK_PREFIX, TASKS_VAR,
    },
    matcher::MatchWeights,
};

/// Returns the default task names, `task1` through `task7`.
pub fn default_tasks() -> Vec<String> {
    (1..=DEFAULT_TASK_COUNT)
        .map(|i| format!("{TASK_PREFIX}{i}"))
        .collect()
}

/// Splits a comma separated task list, dropping blanks.
pub fn parse_task_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|task| !task.is_empty())
        .map(String::from)
        .collect_vec()
}

/// Reads an environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parses a weight in `[0, 1]`.
fn parse_unit_interval(key: &str, value: &str) -> Result<f64> {
    let parsed = value
        .parse::<f64>()
        .with_context(|| format!("{key} must be a number, got `{value}`"))?;
    ensure!((0.0..=1.0).contains(&parsed), "{key} must be between 0 and 1, got {parsed}");
    Ok(parsed)
}

/// Configuration for a grading run.
#[derive(Debug, Clone, Builder)]
#[builder(on(PathBuf, into))]
pub struct GradingConfig {
    /// One sub-directory per student, each holding `<task>.py` files.
    #[builder(default = PathBuf::from(DEFAULT_SUBMISSIONS_DIR))]
    submissions_dir:  PathBuf,
    /// Reference solutions, `<task>.py`.
    #[builder(default = PathBuf::from(DEFAULT_REFERENCES_DIR))]
    references_dir:   PathBuf,
    /// Rubrics, `<task>.json`.
    #[builder(default = PathBuf::from(DEFAULT_RUBRICS_DIR))]
    rubrics_dir:      PathBuf,
    /// Where `<student>/<task>_results.txt` files are written.
    #[builder(default = PathBuf::from(DEFAULT_RESULTS_DIR))]
    results_dir:      PathBuf,
    /// Tasks to grade. Empty means every reference solution found.
    #[builder(default = default_tasks())]
    tasks:            Vec<String>,
    /// Node/edge weights of the similarity score.
    #[builder(default)]
    weights:          MatchWeights,
    /// Share of the final score that comes from similarity.
    #[builder(default = DEFAULT_SIMILARITY_SHARE)]
    similarity_share: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GradingConfig {
    /// Defaults overridden by `CONCEPTGRADE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_var)
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `CONCEPTGRADE_*` key. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        let mut config = Self::default();

        if let Some(dir) = var(SUBMISSIONS_DIR_VAR) {
            config.submissions_dir = dir.into();
        }
        if let Some(dir) = var(REFERENCES_DIR_VAR) {
            config.references_dir = dir.into();
        }
        if let Some(dir) = var(RUBRICS_DIR_VAR) {
            config.rubrics_dir = dir.into();
        }
        if let Some(dir) = var(RESULTS_DIR_VAR) {
            config.results_dir = dir.into();
        }
        if let Some(tasks) = var(TASKS_VAR) {
            config.tasks = parse_task_list(&tasks);
        }
        if let Some(weight) = var(NODE_WEIGHT_VAR) {
            let node = parse_unit_interval(NODE_WEIGHT_VAR, &weight)?;
            config.weights = MatchWeights::new(node, 1.0 - node);
        }
        if let Some(share) = var(SIMILARITY_SHARE_VAR) {
            config.similarity_share = parse_unit_interval(SIMILARITY_SHARE_VAR, &share)?;
        }

        tracing::debug!(?config, "Loaded grading configuration");
        Ok(config)
    }

    /// Directory of per-student submission folders.
    pub fn submissions_dir(&self) -> &Path {
        self.submissions_dir.as_path()
    }

    /// Directory of reference solutions.
    pub fn references_dir(&self) -> &Path {
        self.references_dir.as_path()
    }

    /// Directory of rubric files.
    pub fn rubrics_dir(&self) -> &Path {
        self.rubrics_dir.as_path()
    }

    /// Directory result files are written to.
    pub fn results_dir(&self) -> &Path {
        self.results_dir.as_path()
    }

    /// Tasks to grade.
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    /// Node/edge weights of the similarity score.
    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Share of the final score that comes from similarity.
    pub fn similarity_share(&self) -> f64 {
        self.similarity_share
    }

    /// Returns a new config with a different submissions directory.
    pub fn with_submissions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.submissions_dir = dir.into();
        self
    }

    /// Returns a new config with a different references directory.
    pub fn with_references_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.references_dir = dir.into();
        self
    }

    /// Returns a new config with a different rubrics directory.
    pub fn with_rubrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rubrics_dir = dir.into();
        self
    }

    /// Returns a new config with a different results directory.
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Returns a new config grading only `tasks`.
    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = String>) -> Self {
        self.tasks = tasks.into_iter().collect();
        self
    }
}
