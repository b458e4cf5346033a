//! Indicator Matcher
//!
//! Case-insensitive substring matching of content against the pattern catalog.

use crate::models::ThreatPattern;

/// One pattern with every indicator that was found in the content
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub pattern: &'a ThreatPattern,
    /// In indicator declaration order, not occurrence order
    pub matched_indicators: Vec<&'a str>,
}

impl MatchResult<'_> {
    pub fn count(&self) -> usize {
        self.matched_indicators.len()
    }
}

/// Scan `content` against `patterns`, keeping catalog order.
///
/// Inactive patterns are skipped. Empty indicators never match.
pub fn match_patterns<'a>(content: &str, patterns: &'a [ThreatPattern]) -> Vec<MatchResult<'a>> {
    if content.is_empty() || patterns.is_empty() {
        return Vec::new();
    }

    let haystack = content.to_lowercase();

    patterns
        .iter()
        .filter(|pattern| pattern.active)
        .filter_map(|pattern| {
            let matched_indicators: Vec<&str> = pattern
                .indicators
                .iter()
                .map(String::as_str)
                .filter(|indicator| !indicator.is_empty())
                .filter(|indicator| haystack.contains(&indicator.to_lowercase()))
                .collect();

            if matched_indicators.is_empty() {
                None
            } else {
                Some(MatchResult { pattern, matched_indicators })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<ThreatPattern> {
        vec![
            ThreatPattern::new("Urgent Action Required", "phishing", &["urgent", "verify your account", "act now"], 0.75),
            ThreatPattern::new("Suspicious Links", "phishing", &["bit.ly", "http://"], 0.90),
            ThreatPattern::new("Prize Bait", "baiting", &["you have won"], 0.70),
        ]
    }

    #[test]
    fn test_matches_are_case_insensitive_and_in_catalog_order() {
        let patterns = catalog();
        let matches = match_patterns("URGENT: verify your account now, click http://bit.ly/xyz", &patterns);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].pattern.name, "Urgent Action Required");
        assert_eq!(matches[0].matched_indicators, vec!["urgent", "verify your account"]);
        assert_eq!(matches[1].pattern.name, "Suspicious Links");
        assert_eq!(matches[1].matched_indicators, vec!["bit.ly", "http://"]);
    }

    #[test]
    fn test_indicator_order_follows_declaration_not_occurrence() {
        let patterns = catalog();
        let matches = match_patterns("act now! this is urgent", &patterns);
        assert_eq!(matches[0].matched_indicators, vec!["urgent", "act now"]);
        assert_eq!(matches[0].count(), 2);
    }

    #[test]
    fn test_empty_inputs_match_nothing() {
        let patterns = catalog();
        assert!(match_patterns("", &patterns).is_empty());
        assert!(match_patterns("urgent", &[]).is_empty());
        assert!(match_patterns("Let's meet for coffee tomorrow", &patterns).is_empty());
    }

    #[test]
    fn test_inactive_and_blank_indicators_are_skipped() {
        let mut patterns = catalog();
        patterns[0].active = false;
        patterns[2].indicators.push(String::new());

        let matches = match_patterns("urgent request", &patterns);
        assert!(matches.is_empty());
    }
}
