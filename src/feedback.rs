#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Renders the diff sets of a [`SimilarityResult`] as feedback for students.

use std::fmt::Display;

use itertools::Itertools;

use crate::matcher::SimilarityResult;

/// Heading for concepts the submission lacks.
pub const MISSING_CONCEPTS_HEADING: &str = "The following concepts are missing from your code:";
/// Heading for concepts the reference lacks.
pub const EXTRA_CONCEPTS_HEADING: &str = "Your code includes unnecessary or incorrect concepts:";
/// Heading for relationships the submission lacks.
pub const MISSING_RELATIONSHIPS_HEADING: &str =
    "The following relationships between concepts are missing:";
/// Heading for relationships the reference lacks.
pub const EXTRA_RELATIONSHIPS_HEADING: &str =
    "Your code includes unnecessary or incorrect relationships:";

/// Returns feedback text for `result`, one section per non-empty diff set.
/// An exact match renders as an empty string.
pub fn render_feedback(result: &SimilarityResult) -> String {
    let mut sections = Vec::new();

    push_section(
        &mut sections,
        MISSING_CONCEPTS_HEADING,
        result
            .missing_nodes()
            .iter()
            .map(|(id, concept)| match result.missing_line(*id) {
                Some(line) => format!("{concept} (reference line {line})"),
                None => concept.to_string(),
            }),
    );
    push_section(
        &mut sections,
        EXTRA_CONCEPTS_HEADING,
        result
            .extra_nodes()
            .iter()
            .map(|(id, concept)| match result.extra_line(*id) {
                Some(line) => format!("{concept} (line {line})"),
                None => concept.to_string(),
            }),
    );
    push_section(
        &mut sections,
        MISSING_RELATIONSHIPS_HEADING,
        result
            .missing_edges()
            .iter()
            .map(|(from, to)| format!("{from} → {to}")),
    );
    push_section(
        &mut sections,
        EXTRA_RELATIONSHIPS_HEADING,
        result
            .extra_edges()
            .iter()
            .map(|(from, to)| format!("{from} → {to}")),
    );

    sections.join("\n")
}

/// Appends `heading` and a bullet per item, unless there are no items.
fn push_section<I>(sections: &mut Vec<String>, heading: &str, items: I)
where
    I: Iterator,
    I::Item: Display,
{
    let items = items.map(|item| format!("  - {item}")).join("\n");
    if !items.is_empty() {
        sections.push(format!("{heading}\n{items}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{concept::build_concept_graph, matcher::compare, parser::Parser};

    fn feedback_for(student: &str, reference: &str) -> String {
        let student = Parser::new(student.to_string()).expect("parse");
        let reference = Parser::new(reference.to_string()).expect("parse");
        let result = compare(&build_concept_graph(&student), &build_concept_graph(&reference));
        render_feedback(&result)
    }

    #[test]
    fn identical_structure_has_no_feedback() {
        let code = "def f(n):\n    while n:\n        n -= 1\n";
        assert_eq!(feedback_for(code, code), "");
    }

    #[test]
    fn sections_appear_in_order() {
        let feedback = feedback_for(
            "def f(n):\n    for i in range(n):\n        pass\n",
            "def f(n):\n    while n > 0:\n        n -= 1\n",
        );

        let lines: Vec<_> = feedback.lines().collect();
        assert_eq!(lines, vec![
            MISSING_CONCEPTS_HEADING,
            "  - Concept: While Loop (reference line 2)",
            EXTRA_CONCEPTS_HEADING,
            "  - Concept: For Loop (line 2)",
            MISSING_RELATIONSHIPS_HEADING,
            "  - Function: f → Concept: While Loop",
            "  - Concept: While Loop → Concept: While Loop",
            EXTRA_RELATIONSHIPS_HEADING,
            "  - Function: f → Concept: For Loop",
            "  - Concept: For Loop → Concept: For Loop",
        ]);
    }

    #[test]
    fn only_non_empty_sections_are_rendered() {
        let feedback = feedback_for(
            "def f(): \n if x: \n  return 1\n else: \n  return 0\n",
            "def f(): \n if x: \n  return 1\n",
        );

        assert!(feedback.starts_with(EXTRA_CONCEPTS_HEADING));
        assert!(feedback.contains("Concept: Conditional Branch (line 4)"));
        assert!(!feedback.contains(MISSING_CONCEPTS_HEADING));
        assert!(!feedback.contains(MISSING_RELATIONSHIPS_HEADING));
        assert!(!feedback.contains(EXTRA_RELATIONSHIPS_HEADING));
    }
}
