//! Scoring rules as plain data. Categories carry a weight and a list of
//! criteria; the engine compiles them once and never branches on rule
//! content anywhere else.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    /// A critical match disqualifies the session from passing outright.
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    /// Full marks when any configured keyword appears (case-insensitive
    /// substring) anywhere in the moderator's text; zero otherwise.
    RequiredKeyword {
        label: String,
        keywords: Vec<String>,
        points: u32,
        feedback: String,
    },
    /// Zero when the regex matches any moderator utterance; full marks
    /// otherwise.
    ProhibitedPattern {
        label: String,
        pattern: String,
        severity: Severity,
        points: u32,
        feedback: String,
    },
    /// Half marks when the aggregated moderator text is shorter than the
    /// threshold; full marks otherwise.
    Quality {
        label: String,
        min_chars: usize,
        points: u32,
        feedback: String,
    },
}

impl Criterion {
    pub fn label(&self) -> &str {
        match self {
            Criterion::RequiredKeyword { label, .. }
            | Criterion::ProhibitedPattern { label, .. }
            | Criterion::Quality { label, .. } => label,
        }
    }

    pub fn points(&self) -> u32 {
        match self {
            Criterion::RequiredKeyword { points, .. }
            | Criterion::ProhibitedPattern { points, .. }
            | Criterion::Quality { points, .. } => *points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub weight: u32,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub categories: Vec<Category>,
}

impl Default for RuleSet {
    fn default() -> Self {
        default_rule_set()
    }
}

/// The built-in rule table for moderator etiquette in a mock interview.
pub fn default_rule_set() -> RuleSet {
    RuleSet {
        categories: vec![
            Category {
                name: "Etiquette".to_string(),
                weight: 2,
                criteria: vec![
                    Criterion::RequiredKeyword {
                        label: "greeting".to_string(),
                        keywords: vec![
                            "hello".to_string(),
                            "welcome".to_string(),
                            "good morning".to_string(),
                            "good afternoon".to_string(),
                        ],
                        points: 10,
                        feedback: "Open the interview with a greeting.".to_string(),
                    },
                    Criterion::RequiredKeyword {
                        label: "closing".to_string(),
                        keywords: vec!["thank".to_string(), "appreciate".to_string()],
                        points: 10,
                        feedback: "Thank the participants before wrapping up.".to_string(),
                    },
                ],
            },
            Category {
                name: "Compliance".to_string(),
                weight: 3,
                criteria: vec![
                    Criterion::ProhibitedPattern {
                        label: "protected_topics".to_string(),
                        pattern: r"(?i)\b(married|religion|how old are you|pregnant|children)\b"
                            .to_string(),
                        severity: Severity::Critical,
                        points: 10,
                        feedback: "Questions about protected personal topics are off limits."
                            .to_string(),
                    },
                    Criterion::ProhibitedPattern {
                        label: "unprofessional_language".to_string(),
                        pattern: r"(?i)\b(shut up|stupid|idiot|whatever)\b".to_string(),
                        severity: Severity::Major,
                        points: 10,
                        feedback: "Keep the tone professional.".to_string(),
                    },
                ],
            },
            Category {
                name: "Engagement".to_string(),
                weight: 1,
                criteria: vec![Criterion::Quality {
                    label: "participation".to_string(),
                    min_chars: 50,
                    points: 10,
                    feedback: "Engage more actively with the participants.".to_string(),
                }],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_set_round_trips_through_json() {
        let rules = default_rule_set();
        let json = serde_json::to_string(&rules).unwrap();
        let back: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.categories.len(), rules.categories.len());
        assert_eq!(back.categories[0].criteria[0].label(), "greeting");
    }

    #[test]
    fn criterion_kind_tags_are_stable() {
        let json = r#"{
            "kind": "prohibited_pattern",
            "label": "slang",
            "pattern": "(?i)gonna",
            "severity": "minor",
            "points": 5,
            "feedback": "Avoid slang."
        }"#;
        let criterion: Criterion = serde_json::from_str(json).unwrap();
        assert!(matches!(criterion, Criterion::ProhibitedPattern { .. }));
        assert_eq!(criterion.points(), 5);
    }
}
