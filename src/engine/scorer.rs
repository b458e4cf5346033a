//! Threat Scorer
//!
//! Input: match results. Output: severity, confidence, threat type.

use serde::{Deserialize, Serialize};

use super::matcher::MatchResult;
use super::rules::{
    CLEAN_SCAN_CONFIDENCE, CONFIDENCE_BASE, CONFIDENCE_CAP, CONFIDENCE_PER_PATTERN,
    CONFIDENCE_WEIGHT_FACTOR, CRITICAL_WEIGHT_MIN, HIGH_WEIGHT_MIN, MEDIUM_WEIGHT_MIN,
    NO_CATALOG_CONFIDENCE, NO_THREAT_TYPE, WEIGHT_EPSILON,
};
use crate::models::SeverityLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatScore {
    pub severity: SeverityLevel,
    pub confidence: f64,
    pub threat_type: String,
}

/// Score a scan.
///
/// `catalog_available` separates "nothing to check against" (confidence 0)
/// from "checked and nothing matched" (confidence 95).
pub fn score(matches: &[MatchResult<'_>], catalog_available: bool) -> ThreatScore {
    if !catalog_available {
        return ThreatScore {
            severity: SeverityLevel::Safe,
            confidence: NO_CATALOG_CONFIDENCE,
            threat_type: NO_THREAT_TYPE.to_string(),
        };
    }

    // Catalog order decides the threat type, not weight
    let Some(first) = matches.first() else {
        return ThreatScore {
            severity: SeverityLevel::Safe,
            confidence: CLEAN_SCAN_CONFIDENCE,
            threat_type: NO_THREAT_TYPE.to_string(),
        };
    };

    let count = matches.len();
    let avg_weight = matches
        .iter()
        .map(|m| m.pattern.severity_weight)
        .sum::<f64>()
        / count as f64;

    ThreatScore {
        severity: severity_for_weight(avg_weight),
        confidence: confidence_for(count, avg_weight),
        threat_type: first.pattern.category.clone(),
    }
}

/// Map an average weight onto the severity scale, critical checked first.
///
/// A mean such as (0.7 + 0.7 + 0.7 + 0.9) / 4 comes out one ulp under 0.75,
/// so the comparison allows `WEIGHT_EPSILON` of slack.
pub fn severity_for_weight(avg_weight: f64) -> SeverityLevel {
    let w = avg_weight + WEIGHT_EPSILON;
    if w >= CRITICAL_WEIGHT_MIN {
        SeverityLevel::Critical
    } else if w >= HIGH_WEIGHT_MIN {
        SeverityLevel::High
    } else if w >= MEDIUM_WEIGHT_MIN {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    }
}

/// min(95, 50 + 15 * count + 20 * avg_weight), clamped into [0, 95]
pub fn confidence_for(count: usize, avg_weight: f64) -> f64 {
    let raw = CONFIDENCE_BASE
        + CONFIDENCE_PER_PATTERN * count as f64
        + CONFIDENCE_WEIGHT_FACTOR * avg_weight;
    raw.clamp(0.0, CONFIDENCE_CAP)
}
