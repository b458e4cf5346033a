//! Scoring Rules & Thresholds
//!
//! Constants only - no scoring logic lives here.

// ============================================================================
// SEVERITY THRESHOLDS (on average matched pattern weight, inclusive lower bound)
// ============================================================================

/// At or above this average weight = Critical
pub const CRITICAL_WEIGHT_MIN: f64 = 0.90;

/// At or above this average weight = High
pub const HIGH_WEIGHT_MIN: f64 = 0.75;

/// At or above this average weight = Medium, below = Low
pub const MEDIUM_WEIGHT_MIN: f64 = 0.50;

/// Slack for float rounding when an average lands exactly on a threshold
pub const WEIGHT_EPSILON: f64 = 1e-9;

// ============================================================================
// CONFIDENCE
// ============================================================================

/// Starting confidence once anything matched
pub const CONFIDENCE_BASE: f64 = 50.0;

/// Added per matched pattern
pub const CONFIDENCE_PER_PATTERN: f64 = 15.0;

/// Multiplier applied to the average matched weight
pub const CONFIDENCE_WEIGHT_FACTOR: f64 = 20.0;

/// The detector never claims certainty
pub const CONFIDENCE_CAP: f64 = 95.0;

/// Confidence when the catalog was checked and nothing matched
pub const CLEAN_SCAN_CONFIDENCE: f64 = CONFIDENCE_CAP;

/// Confidence when there was no catalog to check against
pub const NO_CATALOG_CONFIDENCE: f64 = 0.0;

// ============================================================================
// EXPLANATION
// ============================================================================

/// Threat type recorded when nothing matched
pub const NO_THREAT_TYPE: &str = "none";

/// Matched indicators quoted per pattern line
pub const MAX_INDICATORS_SHOWN: usize = 3;
