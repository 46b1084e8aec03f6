#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Concept rubrics: points awarded for concepts a submission uses.
//!
//! A rubric file maps concept labels to point values:
//!
//! ```json
//! {
//!   "Concept: For Loop": { "points": 2 },
//!   "Function: count_positive": { "points": 1, "description": "Entry point" }
//! }
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    concept::{Concept, ConceptGraph},
    error::GradeError,
};

/// Points for one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
    /// Points awarded when the concept is present.
    points:      f64,
    /// Optional note for graders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl RubricItem {
    /// Creates an item worth `points`.
    pub fn new(points: f64) -> Self {
        Self {
            points,
            description: None,
        }
    }

    /// Points awarded when the concept is present.
    pub fn points(&self) -> f64 {
        self.points
    }

    /// Optional note for graders.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Mapping from concept label to points. Labels that name no known concept
/// are kept with a warning; they count towards the maximum and can never be
/// earned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, RubricItem>",
    into = "BTreeMap<String, RubricItem>"
)]
pub struct Rubric {
    /// Items keyed by concept label.
    items:    BTreeMap<String, RubricItem>,
    /// Labels that parsed as concepts.
    concepts: BTreeMap<String, Concept>,
}

/// Parses a rubric label, warning when it names no concept.
fn parse_label(label: &str) -> Option<Concept> {
    match label.parse::<Concept>() {
        Ok(concept) => Some(concept),
        Err(e) => {
            tracing::warn!("{e} Its rubric points can never be earned.");
            None
        }
    }
}

impl From<BTreeMap<String, RubricItem>> for Rubric {
    fn from(items: BTreeMap<String, RubricItem>) -> Self {
        let concepts = items
            .keys()
            .filter_map(|label| parse_label(label).map(|concept| (label.clone(), concept)))
            .collect();
        Self { items, concepts }
    }
}

impl From<Rubric> for BTreeMap<String, RubricItem> {
    fn from(rubric: Rubric) -> Self {
        rubric.items
    }
}

impl Rubric {
    /// Parses a rubric from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, GradeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a rubric file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GradeError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GradeError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Adds or replaces an item.
    pub fn with_item(mut self, label: impl Into<String>, item: RubricItem) -> Self {
        let label = label.into();
        match parse_label(&label) {
            Some(concept) => self.concepts.insert(label.clone(), concept),
            None => self.concepts.remove(&label),
        };
        self.items.insert(label, item);
        self
    }

    /// Iterates over `(label, item)` in label order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &RubricItem)> + '_ {
        self.items.iter().map(|(label, item)| (label.as_str(), item))
    }

    /// The concept a label parsed to, if any.
    pub fn concept(&self, label: &str) -> Option<&Concept> {
        self.concepts.get(label)
    }

    /// Labels that name no known concept, in label order.
    pub fn unknown_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.items
            .keys()
            .filter(|label| !self.concepts.contains_key(*label))
            .map(String::as_str)
    }

    /// Whether the rubric has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all item points.
    pub fn max_points(&self) -> f64 {
        self.items.values().map(RubricItem::points).sum()
    }

    /// Awards each item once if its concept occurs anywhere in `graph`.
    pub fn score(&self, graph: &ConceptGraph) -> RubricScore {
        let present: BTreeSet<&Concept> = graph.concepts().map(|(_, concept)| concept).collect();
        let earned = self
            .items
            .iter()
            .filter(|(label, _)| {
                self.concepts
                    .get(*label)
                    .is_some_and(|concept| present.contains(concept))
            })
            .map(|(_, item)| item.points)
            .sum();

        RubricScore {
            earned,
            max: self.max_points(),
        }
    }
}

/// Points earned against a rubric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RubricScore {
    /// Points earned.
    earned: f64,
    /// Points available.
    max:    f64,
}

impl RubricScore {
    /// Creates a score.
    pub fn new(earned: f64, max: f64) -> Self {
        Self { earned, max }
    }

    /// Points earned.
    pub fn earned(&self) -> f64 {
        self.earned
    }

    /// Points available.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Earned points as a percentage of the maximum; 0 for an empty rubric.
    pub fn percent(&self) -> f64 {
        if self.max > 0.0 {
            self.earned / self.max * 100.0
        } else {
            0.0
        }
    }
}

impl Display for RubricScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}/{:.2}", self.earned, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{concept::build_concept_graph, parser::Parser};

    const RUBRIC: &str = r#"{
        "Concept: For Loop": { "points": 2 },
        "Concept: If Condition": { "points": 1.5, "description": "filters values" },
        "Function: main": { "points": 1 }
    }"#;

    fn graph_of(code: &str) -> ConceptGraph {
        let parser = Parser::new(code.to_string()).expect("parse");
        build_concept_graph(&parser)
    }

    #[test]
    fn parses_items() {
        let rubric = Rubric::from_json_str(RUBRIC).expect("rubric");

        assert_eq!(rubric.max_points(), 4.5);
        let (label, item) = rubric.items().nth(1).expect("second item");
        assert_eq!(label, "Concept: If Condition");
        assert_eq!(item.description(), Some("filters values"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Rubric::from_json_str(r#"{"Concept: For Loop": 2}"#).unwrap_err();
        assert!(matches!(err, GradeError::Rubric(_)));
    }

    #[test]
    fn each_concept_is_awarded_once() {
        let rubric = Rubric::from_json_str(RUBRIC).expect("rubric");
        let graph = graph_of(
            "def main(xs):\n    for x in xs:\n        pass\n    for y in xs:\n        pass\n",
        );
        let score = rubric.score(&graph);

        assert_eq!(score.earned(), 3.0);
        assert_eq!(score.max(), 4.5);
        assert_eq!(score.to_string(), "3.00/4.50");
    }

    #[test]
    fn empty_rubric_scores_zero_percent() {
        let score = Rubric::default().score(&graph_of("def main():\n    pass\n"));
        assert_eq!(score.percent(), 0.0);
    }

    #[test]
    fn builder_style_items() {
        let rubric = Rubric::default()
            .with_item("Concept: While Loop", RubricItem::new(3.0))
            .with_item("Concept: Recursion", RubricItem::new(1.0));
        let score = rubric.score(&graph_of("def f(n):\n    while n:\n        n -= 1\n"));

        assert_eq!(score.percent(), 75.0);
    }

    #[test]
    fn labels_parse_to_concepts() {
        let rubric = Rubric::from_json_str(RUBRIC).expect("rubric");

        assert_eq!(rubric.concept("Concept: For Loop"), Some(&Concept::ForLoop));
        assert_eq!(
            rubric.concept("Function: main"),
            Some(&Concept::Function("main".into()))
        );
        assert_eq!(rubric.unknown_labels().count(), 0);

        let score = rubric.score(&graph_of("def main(xs):\n    for x in xs:\n        pass\n"));
        assert_eq!(score.earned(), 3.0);
    }

    #[test]
    fn unknown_labels_are_kept_but_never_earned() {
        let rubric = Rubric::from_json_str(
            r#"{
                "Concept: For loop": { "points": 2 },
                "Concept: For Loop": { "points": 1 }
            }"#,
        )
        .expect("rubric");

        assert_eq!(rubric.unknown_labels().collect::<Vec<_>>(), vec!["Concept: For loop"]);
        assert_eq!(rubric.concept("Concept: For loop"), None);
        assert_eq!(rubric.max_points(), 3.0);

        let score = rubric.score(&graph_of("def main(xs):\n    for x in xs:\n        pass\n"));
        assert_eq!(score.earned(), 1.0);
        assert_eq!(score.max(), 3.0);
    }

    #[test]
    fn replacing_an_item_reparses_its_label() {
        let rubric = Rubric::default()
            .with_item("Concept: Recursion", RubricItem::new(1.0))
            .with_item("Concept: While Loop", RubricItem::new(1.0));

        assert_eq!(rubric.unknown_labels().collect::<Vec<_>>(), vec!["Concept: Recursion"]);
        assert_eq!(rubric.concept("Concept: While Loop"), Some(&Concept::WhileLoop));
    }

    #[test]
    fn serializes_back_to_labels() {
        let rubric = Rubric::default().with_item("Concept: General", RubricItem::new(2.0));
        let json = serde_json::to_value(&rubric).expect("serialize");

        assert_eq!(json, serde_json::json!({ "Concept: General": { "points": 2.0 } }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Rubric::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, GradeError::Io { .. }));
    }
}
