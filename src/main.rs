#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # conceptgrade
//!
//! Grades Python submissions by comparing the concept graph of each one with
//! the concept graph of a reference solution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use conceptgrade::{
    batch::evaluate_all_tasks,
    build_concept_graph,
    config::GradingConfig,
    grade::{grade_files, parse_checked},
    util::file_stem,
};
use dotenvy::dotenv;
use tabled::{Table, settings::Style};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade one submission against one reference
    Grade {
        /// Rubric file, if any
        rubric:    Option<PathBuf>,
        /// Task name for the report
        task:      Option<String>,
        /// Student's source file
        student:   PathBuf,
        /// Reference source file
        reference: PathBuf,
    },
    /// Grade every student and task
    Batch {
        /// Submissions directory override
        submissions: Option<PathBuf>,
        /// References directory override
        references:  Option<PathBuf>,
        /// Rubrics directory override
        rubrics:     Option<PathBuf>,
        /// Results directory override
        results:     Option<PathBuf>,
        /// Tasks to grade
        tasks:       Vec<String>,
    },
    /// Print a file's concept graph as JSON
    Graph(PathBuf),
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// Log at debug level
    verbose: bool,
    /// The command to run
    cmd:     Cmd,
}

/// Parse the command line arguments and return the `Options`
fn options() -> Options {
    /// parses a directory override
    fn dir(name: &'static str, help: &'static str) -> impl Parser<Option<PathBuf>> {
        long(name).help(help).argument::<PathBuf>("DIR").optional()
    }

    let rubric = long("rubric")
        .help("Rubric JSON mapping concept labels to points")
        .argument::<PathBuf>("FILE")
        .optional();
    let task = long("task")
        .help("Task name shown in the report (defaults to the student file name)")
        .argument::<String>("NAME")
        .optional();
    let student = positional::<PathBuf>("STUDENT").help("Student's Python file");
    let reference = positional::<PathBuf>("REFERENCE").help("Reference Python file");
    let grade = construct!(Cmd::Grade {
        rubric,
        task,
        student,
        reference
    })
    .to_options()
    .command("grade")
    .help("Grade one submission against a reference solution");

    let submissions = dir("submissions", "Directory of per-student submission folders");
    let references = dir("references", "Directory of reference solutions");
    let rubrics = dir("rubrics", "Directory of task rubrics");
    let results = dir("results", "Directory to write result files to");
    let tasks = long("task")
        .help("Task to grade; repeat for several (defaults to task1..task7)")
        .argument::<String>("NAME")
        .many();
    let batch = construct!(Cmd::Batch {
        submissions,
        references,
        rubrics,
        results,
        tasks
    })
    .to_options()
    .command("batch")
    .help("Grade every task for every student");

    let file = positional::<PathBuf>("FILE").help("Python file");
    let graph = construct!(Cmd::Graph(file))
        .to_options()
        .command("graph")
        .help("Print the concept graph of a Python file as JSON");

    let verbose = short('v')
        .long("verbose")
        .help("Log debug output")
        .switch();
    let cmd = construct!([grade, batch, graph]);

    construct!(Options { verbose, cmd })
        .to_options()
        .descr("Concept-graph based grading for CS1 Python assignments")
        .run()
}

/// Prints the concept graph of `path`.
fn print_graph(path: &Path) -> Result<()> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let parser = parse_checked(&code)?;
    let graph = build_concept_graph(&parser);
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let Options { verbose, cmd } = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(if verbose { Level::DEBUG } else { Level::INFO });
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let config = GradingConfig::from_env()?;

    match cmd {
        Cmd::Grade {
            rubric,
            task,
            student,
            reference,
        } => {
            let task = task
                .or_else(|| file_stem(&student))
                .unwrap_or_else(|| "task".to_string());
            let grade = grade_files(&task, &student, &reference, rubric.as_deref(), &config)?;

            println!("{}", grade.to_report());
            let summary = format!(
                "{}: {:.2} (similarity {:.2}, rubric {})",
                grade.task(),
                grade.final_score(),
                grade.similarity_percent(),
                grade.rubric()
            );
            if grade.similarity().is_exact() {
                eprintln!("{}", summary.green().bold());
            } else {
                eprintln!("{}", summary.yellow().bold());
            }
        }
        Cmd::Batch {
            submissions,
            references,
            rubrics,
            results,
            tasks,
        } => {
            let mut config = config;
            if let Some(dir) = submissions {
                config = config.with_submissions_dir(dir);
            }
            if let Some(dir) = references {
                config = config.with_references_dir(dir);
            }
            if let Some(dir) = rubrics {
                config = config.with_rubrics_dir(dir);
            }
            if let Some(dir) = results {
                config = config.with_results_dir(dir);
            }
            if !tasks.is_empty() {
                config = config.with_tasks(tasks);
            }

            let outcomes = evaluate_all_tasks(&config).await?;
            if outcomes.is_empty() {
                eprintln!("{}", "No submissions found.".yellow());
            } else {
                println!("{}", Table::new(&outcomes).with(Style::modern()));
            }
        }
        Cmd::Graph(path) => print_graph(&path)?,
    };

    Ok(())
}
