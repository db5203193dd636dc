//! Renders an [`EvaluationResult`] for humans. The structured view for
//! transmission is the type's `Serialize` impl; nothing here recomputes
//! a score.

use super::EvaluationResult;
use std::fmt::Write;

/// Multi-line plain-text report.
pub fn text_report(result: &EvaluationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Interview Evaluation ===");
    let _ = writeln!(
        out,
        "Overall: {}/{} ({}%) — Grade {}",
        result.score, result.max_score, result.percentage, result.grade
    );
    if result.disqualified {
        let _ = writeln!(out, "DISQUALIFIED: a critical rule violation was detected.");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Categories:");
    for category in &result.categories {
        let _ = writeln!(
            out,
            "  {:<12} {:>3}/{:<3} ({}%)",
            category.name, category.score, category.max, category.percentage
        );
    }
    if !result.violations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Violations:");
        for violation in &result.violations {
            let _ = writeln!(
                out,
                "  [{:?}] {} / {}: \"{}\"",
                violation.severity, violation.category, violation.criterion, violation.excerpt
            );
        }
    }
    if !result.feedback.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Feedback:");
        for line in &result.feedback {
            let _ = writeln!(out, "  - {line}");
        }
    }
    out
}

/// Short chat-bubble summary.
pub fn chat_summary(result: &EvaluationResult) -> String {
    if result.disqualified {
        format!(
            "Session disqualified (critical violation). Score {}% — Grade {}.",
            result.percentage, result.grade
        )
    } else {
        format!(
            "Session complete: {}% — Grade {}. {} violation(s) noted.",
            result.percentage,
            result.grade,
            result.violations.len()
        )
    }
}
