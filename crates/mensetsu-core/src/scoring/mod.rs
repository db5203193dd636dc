//! Deterministic rule-based evaluation of a finished transcript.
//!
//! The engine is a pure function of the committed entries: it extracts
//! the moderator-authored text, runs each configured category's criteria
//! against it, and derives one weighted overall result. Formatting lives
//! in [`report`] and never re-derives a score.

mod report;
mod rules;

pub use report::{chat_summary, text_report};
pub use rules::{Category, Criterion, RuleSet, Severity, default_rule_set};

use crate::pattern::Speaker;
use crate::transcript::TranscriptEntry;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_percentage(percentage: u32) -> Grade {
        match percentage {
            95.. => Grade::S,
            85..=94 => Grade::A,
            75..=84 => Grade::B,
            65..=74 => Grade::C,
            50..=64 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResult {
    pub name: String,
    pub score: u32,
    pub max: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub category: String,
    pub criterion: String,
    pub severity: Severity,
    pub excerpt: String,
    pub feedback: String,
}

/// Produced once per session, immutable after creation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub grade: Grade,
    pub disqualified: bool,
    pub categories: Vec<CategoryResult>,
    pub violations: Vec<Violation>,
    pub feedback: Vec<String>,
}

enum CompiledCriterion {
    RequiredKeyword {
        label: String,
        keywords: Vec<String>,
        points: u32,
        feedback: String,
    },
    ProhibitedPattern {
        label: String,
        pattern: Regex,
        severity: Severity,
        points: u32,
        feedback: String,
    },
    Quality {
        label: String,
        min_chars: usize,
        points: u32,
        feedback: String,
    },
}

struct CompiledCategory {
    name: String,
    weight: u32,
    criteria: Vec<CompiledCriterion>,
}

pub struct ScoringEngine {
    categories: Vec<CompiledCategory>,
}

impl ScoringEngine {
    /// Compiles a rule table. The only failure mode is an invalid regex
    /// in a prohibited-pattern criterion.
    pub fn new(rules: RuleSet) -> Result<Self> {
        let mut categories = Vec::with_capacity(rules.categories.len());
        for category in rules.categories {
            let mut criteria = Vec::with_capacity(category.criteria.len());
            for criterion in category.criteria {
                criteria.push(match criterion {
                    Criterion::RequiredKeyword {
                        label,
                        keywords,
                        points,
                        feedback,
                    } => CompiledCriterion::RequiredKeyword {
                        label,
                        keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
                        points,
                        feedback,
                    },
                    Criterion::ProhibitedPattern {
                        label,
                        pattern,
                        severity,
                        points,
                        feedback,
                    } => CompiledCriterion::ProhibitedPattern {
                        pattern: Regex::new(&pattern).with_context(|| {
                            format!("invalid pattern for criterion '{label}': {pattern}")
                        })?,
                        label,
                        severity,
                        points,
                        feedback,
                    },
                    Criterion::Quality {
                        label,
                        min_chars,
                        points,
                        feedback,
                    } => CompiledCriterion::Quality {
                        label,
                        min_chars,
                        points,
                        feedback,
                    },
                });
            }
            categories.push(CompiledCategory {
                name: category.name,
                weight: category.weight,
                criteria,
            });
        }
        Ok(Self { categories })
    }

    /// Evaluates the moderator-authored entries of a finished transcript.
    pub fn evaluate(&self, entries: &[TranscriptEntry]) -> EvaluationResult {
        let human_texts: Vec<&str> = entries
            .iter()
            .filter(|e| e.speaker == Speaker::Human)
            .map(|e| e.text.as_str())
            .collect();
        let aggregated = human_texts.join(" ");
        let aggregated_lower = aggregated.to_lowercase();
        let aggregated_chars = aggregated.chars().count();

        let mut categories = Vec::with_capacity(self.categories.len());
        let mut violations = Vec::new();
        let mut feedback = Vec::new();
        let mut disqualified = false;
        let mut weighted_score: u64 = 0;
        let mut weighted_max: u64 = 0;

        for category in &self.categories {
            let mut score = 0u32;
            let mut max = 0u32;
            for criterion in &category.criteria {
                match criterion {
                    CompiledCriterion::RequiredKeyword {
                        keywords,
                        points,
                        feedback: hint,
                        ..
                    } => {
                        max += points;
                        if keywords.iter().any(|k| aggregated_lower.contains(k)) {
                            score += points;
                        } else {
                            feedback.push(hint.clone());
                        }
                    }
                    CompiledCriterion::ProhibitedPattern {
                        label,
                        pattern,
                        severity,
                        points,
                        feedback: hint,
                    } => {
                        max += points;
                        let matched = human_texts
                            .iter()
                            .find_map(|text| pattern.find(text).map(|m| m.as_str().to_string()));
                        match matched {
                            Some(excerpt) => {
                                if *severity == Severity::Critical {
                                    disqualified = true;
                                }
                                violations.push(Violation {
                                    category: category.name.clone(),
                                    criterion: label.clone(),
                                    severity: *severity,
                                    excerpt,
                                    feedback: hint.clone(),
                                });
                                feedback.push(hint.clone());
                            }
                            None => score += points,
                        }
                    }
                    CompiledCriterion::Quality {
                        min_chars,
                        points,
                        feedback: hint,
                        ..
                    } => {
                        max += points;
                        if aggregated_chars < *min_chars {
                            score += points / 2;
                            feedback.push(hint.clone());
                        } else {
                            score += points;
                        }
                    }
                }
            }
            weighted_score += u64::from(score) * u64::from(category.weight);
            weighted_max += u64::from(max) * u64::from(category.weight);
            let percentage = if max == 0 {
                100
            } else {
                ((f64::from(score) / f64::from(max)) * 100.0).round() as u32
            };
            categories.push(CategoryResult {
                name: category.name.clone(),
                score,
                max,
                percentage,
            });
        }

        let percentage = if weighted_max == 0 {
            100
        } else {
            ((weighted_score as f64 / weighted_max as f64) * 100.0).round() as u32
        };
        let grade = if disqualified {
            Grade::F
        } else {
            Grade::from_percentage(percentage)
        };
        if disqualified {
            feedback.push("A critical rule violation disqualified this session.".to_string());
        }

        let score = categories.iter().map(|c| c.score).sum();
        let max_score = categories.iter().map(|c| c.max).sum();
        EvaluationResult {
            score,
            max_score,
            percentage,
            grade,
            disqualified,
            categories,
            violations,
            feedback,
        }
    }
}
