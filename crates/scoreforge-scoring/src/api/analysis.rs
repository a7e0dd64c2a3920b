//! Score analysis types for detailed constraint tracking.
//!
//! These are snapshots: a score director builds them on request from its
//! live matches, and they stay valid after the session moves on.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use scoreforge_core::{ConstraintRef, Score};

use crate::fact::{FactRef, Value};
use crate::tuple::Row;

/// Justification for why a constraint matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintJustification {
    /// Values that caused the match, usually the facts of the matched tuple.
    pub facts: Vec<Value>,
    /// Human-readable description of why the constraint matched.
    pub description: String,
}

impl ConstraintJustification {
    /// Creates a justification, joining the values into a description.
    pub fn new(facts: Vec<Value>) -> Self {
        let description = if facts.is_empty() {
            "No facts".to_string()
        } else {
            facts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self { facts, description }
    }

    /// Creates a justification with a custom description.
    pub fn with_description(facts: Vec<Value>, description: impl Into<String>) -> Self {
        Self {
            facts,
            description: description.into(),
        }
    }

    /// Default justification of a matched tuple: all of its elements.
    pub fn of_row(row: Row<'_>) -> Self {
        Self::new(row.values().to_vec())
    }
}

impl fmt::Display for ConstraintJustification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// One live match of a constraint.
#[derive(Debug, Clone)]
pub struct ConstraintMatch<Sc: Score> {
    /// Reference to the constraint that matched.
    pub constraint_ref: ConstraintRef,
    /// Signed score impact of this match.
    pub score: Sc,
    pub justification: ConstraintJustification,
    /// Objects blamed for this match.
    pub indicted: Vec<Value>,
}

/// All live matches of one constraint.
#[derive(Debug, Clone)]
pub struct ConstraintMatchTotal<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    /// Constraint weight (score per match of weight 1).
    pub constraint_weight: Sc,
    /// Sum of all match impacts.
    pub score: Sc,
    pub matches: Vec<ConstraintMatch<Sc>>,
}

impl<Sc: Score> ConstraintMatchTotal<Sc> {
    pub fn new(constraint_ref: ConstraintRef, constraint_weight: Sc) -> Self {
        Self {
            constraint_ref,
            constraint_weight,
            score: Sc::zero(),
            matches: Vec::new(),
        }
    }

    pub fn add_match(&mut self, constraint_match: ConstraintMatch<Sc>) {
        self.score = self.score + constraint_match.score;
        self.matches.push(constraint_match);
    }

    /// Returns the number of matches.
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Per-constraint breakdown in a score explanation.
#[derive(Debug, Clone)]
pub struct ConstraintAnalysis<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    /// Constraint weight (score per match).
    pub weight: Sc,
    /// Total score from this constraint.
    pub score: Sc,
    /// Number of live matches.
    pub match_count: usize,
    /// Matches, when match tracking is enabled.
    pub matches: Vec<ConstraintMatch<Sc>>,
}

impl<Sc: Score> ConstraintAnalysis<Sc> {
    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.constraint_ref.name
    }

    /// Whether the weight touches a hard score level.
    pub fn is_hard(&self) -> bool {
        self.weight.has_hard_component()
    }
}

/// Complete score explanation with per-constraint breakdown.
#[derive(Debug, Clone)]
pub struct ScoreExplanation<Sc: Score> {
    /// The total score.
    pub score: Sc,
    pub constraint_analyses: Vec<ConstraintAnalysis<Sc>>,
}

impl<Sc: Score> ScoreExplanation<Sc> {
    /// Returns the total match count across all constraints.
    pub fn total_match_count(&self) -> usize {
        self.constraint_analyses.iter().map(|a| a.match_count).sum()
    }

    /// Returns constraints with non-zero scores.
    pub fn non_zero_constraints(&self) -> Vec<&ConstraintAnalysis<Sc>> {
        self.constraint_analyses
            .iter()
            .filter(|a| !a.score.is_zero())
            .collect()
    }

    pub fn analysis(&self, name: &str) -> Option<&ConstraintAnalysis<Sc>> {
        self.constraint_analyses
            .iter()
            .find(|a| a.constraint_ref.name == name || a.constraint_ref.full_name() == name)
    }
}

impl<Sc: Score> fmt::Display for ScoreExplanation<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score: {}", self.score)?;
        for analysis in &self.constraint_analyses {
            writeln!(
                f,
                "  {}: {} ({} matches)",
                analysis.constraint_ref, analysis.score, analysis.match_count
            )?;
            for m in &analysis.matches {
                writeln!(f, "    {}: {}", m.score, m.justification)?;
            }
        }
        Ok(())
    }
}

/// Every live match that blames one object.
#[derive(Debug, Clone)]
pub struct Indictment<Sc: Score> {
    /// The indicted object.
    pub indicted: Value,
    /// Total score impact of the matches below.
    pub score: Sc,
    /// Matches involving this object, grouped by constraint.
    pub constraint_matches: BTreeMap<ConstraintRef, Vec<ConstraintMatch<Sc>>>,
}

impl<Sc: Score> Indictment<Sc> {
    pub fn new(indicted: Value) -> Self {
        Self {
            indicted,
            score: Sc::zero(),
            constraint_matches: BTreeMap::new(),
        }
    }

    /// Adds a match to this indictment.
    pub fn add_match(&mut self, constraint_match: ConstraintMatch<Sc>) {
        self.score = self.score + constraint_match.score;
        self.constraint_matches
            .entry(constraint_match.constraint_ref.clone())
            .or_default()
            .push(constraint_match);
    }

    /// Returns the total number of matches.
    pub fn match_count(&self) -> usize {
        self.constraint_matches.values().map(Vec::len).sum()
    }

    /// Returns the number of distinct constraints involved.
    pub fn constraint_count(&self) -> usize {
        self.constraint_matches.len()
    }
}

/// Reverse index from indicted objects to their matches.
#[derive(Debug, Clone)]
pub struct IndictmentMap<Sc: Score> {
    pub indictments: HashMap<Value, Indictment<Sc>>,
}

impl<Sc: Score> IndictmentMap<Sc> {
    pub fn new() -> Self {
        Self {
            indictments: HashMap::new(),
        }
    }

    /// Builds the map from a collection of matches.
    pub fn from_matches<'a, I>(matches: I) -> Self
    where
        I: IntoIterator<Item = &'a ConstraintMatch<Sc>>,
    {
        let mut map = Self::new();
        for m in matches {
            for indicted in &m.indicted {
                map.indictments
                    .entry(indicted.clone())
                    .or_insert_with(|| Indictment::new(indicted.clone()))
                    .add_match(m.clone());
            }
        }
        map
    }

    pub fn get(&self, indicted: &Value) -> Option<&Indictment<Sc>> {
        self.indictments.get(indicted)
    }

    /// Indictment of a fact.
    pub fn get_fact(&self, fact: &FactRef) -> Option<&Indictment<Sc>> {
        self.indictments.get(&Value::Fact(fact.clone()))
    }

    pub fn contains_fact(&self, fact: &FactRef) -> bool {
        self.get_fact(fact).is_some()
    }

    /// Indictments sorted by score impact, worst first.
    pub fn worst_indictments(&self) -> Vec<&Indictment<Sc>> {
        let mut indictments: Vec<_> = self.indictments.values().collect();
        indictments.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.indicted.cmp(&b.indicted)));
        indictments
    }

    pub fn len(&self) -> usize {
        self.indictments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indictments.is_empty()
    }
}

impl<Sc: Score> Default for IndictmentMap<Sc> {
    fn default() -> Self {
        Self::new()
    }
}
