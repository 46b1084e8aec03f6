#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Weight of node similarity in the combined similarity score.
pub const DEFAULT_NODE_WEIGHT: f64 = 0.7;

/// Weight of edge similarity in the combined similarity score.
pub const DEFAULT_EDGE_WEIGHT: f64 = 0.3;

/// Share of the final task score that comes from structural similarity; the
/// rest comes from the rubric.
pub const DEFAULT_SIMILARITY_SHARE: f64 = 0.5;

/// Directory holding one sub-directory of submissions per student.
pub const DEFAULT_SUBMISSIONS_DIR: &str = "submissions";

/// Directory holding the reference solution of each task.
pub const DEFAULT_REFERENCES_DIR: &str = "correct_code";

/// Directory holding the rubric of each task.
pub const DEFAULT_RUBRICS_DIR: &str = "concepts";

/// Directory result files are written to.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Number of tasks graded when none are named (`task1` ..= `task7`).
pub const DEFAULT_TASK_COUNT: usize = 7;

/// Prefix of the default task names.
pub const TASK_PREFIX: &str = "task";

/// Extension of submission and reference files.
pub const SOURCE_EXTENSION: &str = "py";

/// Extension of rubric files.
pub const RUBRIC_EXTENSION: &str = "json";

/// Suffix appended to the task name for result files.
pub const RESULT_FILE_SUFFIX: &str = "_results.txt";

/// Environment variable overriding the submissions directory.
pub const SUBMISSIONS_DIR_VAR: &str = "CONCEPTGRADE_SUBMISSIONS";

/// Environment variable overriding the references directory.
pub const REFERENCES_DIR_VAR: &str = "CONCEPTGRADE_REFERENCES";

/// Environment variable overriding the rubrics directory.
pub const RUBRICS_DIR_VAR: &str = "CONCEPTGRADE_RUBRICS";

/// Environment variable overriding the results directory.
pub const RESULTS_DIR_VAR: &str = "CONCEPTGRADE_RESULTS";

/// Environment variable holding a comma separated task list.
pub const TASKS_VAR: &str = "CONCEPTGRADE_TASKS";

/// Environment variable overriding the node weight; the edge weight becomes
/// its complement.
pub const NODE_WEIGHT_VAR: &str = "CONCEPTGRADE_NODE_WEIGHT";

/// Environment variable overriding the similarity share of the final score.
pub const SIMILARITY_SHARE_VAR: &str = "CONCEPTGRADE_SIMILARITY_SHARE";
