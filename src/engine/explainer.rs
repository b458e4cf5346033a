//! Explanation Generator
//!
//! Deterministic narrative for a scan result. No timestamps, no randomness:
//! identical inputs always render byte-identical text.

use super::matcher::MatchResult;
use super::rules::MAX_INDICATORS_SHOWN;
use crate::models::{SeverityLevel, SourceType};

/// Summary and recommendation shown for one severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityGuidance {
    pub summary: &'static str,
    pub recommendation: &'static str,
}

pub fn guidance(severity: SeverityLevel) -> SeverityGuidance {
    match severity {
        SeverityLevel::Safe => SeverityGuidance {
            summary: "No social engineering indicators were found in this content.",
            recommendation: "No action is needed, but stay alert for unexpected requests for information or money.",
        },
        SeverityLevel::Low => SeverityGuidance {
            summary: "This content shows weak signs of a social engineering attempt.",
            recommendation: "Read it carefully and confirm the sender through a channel you already trust before responding.",
        },
        SeverityLevel::Medium => SeverityGuidance {
            summary: "This content contains several markers commonly used in social engineering attacks.",
            recommendation: "Do not click links or share information until you have verified the sender independently.",
        },
        SeverityLevel::High => SeverityGuidance {
            summary: "This content is very likely a social engineering attempt.",
            recommendation: "Do not respond, click links or open attachments. Report it to your security team.",
        },
        SeverityLevel::Critical => SeverityGuidance {
            summary: "This content matches strong indicators of an active social engineering attack.",
            recommendation: "Stop all interaction immediately, report it to your security team and change any credentials you may have shared.",
        },
    }
}

const EDUCATION_BLOCK: &str = "\
Why this matters:
Social engineering targets people rather than systems. Attackers create a sense of \
urgency, borrow the voice of an authority, trigger fear, or dangle a reward so that \
the recipient acts before thinking. Legitimate organizations rarely demand immediate \
action, ask for passwords, or push you toward unfamiliar links.";

const CLOSING_BLOCK: &str = "\
Remember:
When in doubt, pause. Contact the supposed sender using details you already know, \
never the ones supplied in the message itself.";

/// Render the explanation for a scan.
///
/// With no matches the safe guidance is used and the pattern block is left out.
pub fn explain(matches: &[MatchResult<'_>], severity: SeverityLevel, source_type: SourceType) -> String {
    let guidance = if matches.is_empty() {
        self::guidance(SeverityLevel::Safe)
    } else {
        self::guidance(severity)
    };

    let mut sections = Vec::with_capacity(6);

    sections.push(format!("{} {}", guidance.summary, guidance.recommendation));
    sections.push(format!("Source analyzed: {}", source_type.as_str().to_uppercase()));

    if !matches.is_empty() {
        let lines: Vec<String> = matches.iter().map(pattern_line).collect();
        sections.push(format!("Detected patterns:\n{}", lines.join("\n")));
    }

    sections.push(EDUCATION_BLOCK.to_string());
    sections.push(format!("Recommended action:\n{}", guidance.recommendation));
    sections.push(CLOSING_BLOCK.to_string());

    sections.join("\n\n")
}

fn pattern_line(m: &MatchResult<'_>) -> String {
    let quoted: Vec<String> = m
        .matched_indicators
        .iter()
        .take(MAX_INDICATORS_SHOWN)
        .map(|indicator| format!("\"{}\"", indicator))
        .collect();

    let noun = if m.count() == 1 { "indicator" } else { "indicators" };

    format!(
        "- {} ({} {} matched): {}",
        m.pattern.name,
        m.count(),
        noun,
        quoted.join(", ")
    )
}
