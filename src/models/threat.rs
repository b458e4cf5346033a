//! Threat record model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// SEVERITY
// ============================================================================

/// Closed severity scale assigned to every scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 5] = [
        SeverityLevel::Safe,
        SeverityLevel::Low,
        SeverityLevel::Medium,
        SeverityLevel::High,
        SeverityLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Anything other than `safe` counts as a detected threat
    pub fn is_threat(&self) -> bool {
        *self != Self::Safe
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(Self::Safe),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity level '{}'", other)),
        }
    }
}

// ============================================================================
// SOURCE TYPE
// ============================================================================

/// Where the submitted content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Email,
    Message,
    Link,
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Message => "message",
            Self::Link => "link",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "message" => Ok(Self::Message),
            "link" => Ok(Self::Link),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown source type '{}'", other)),
        }
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatStatus {
    New,
    Acknowledged,
    Resolved,
    FalsePositive,
}

impl ThreatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::FalsePositive => "false_positive",
        }
    }
}

impl fmt::Display for ThreatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ThreatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            "false_positive" => Ok(Self::FalsePositive),
            other => Err(format!("unknown threat status '{}'", other)),
        }
    }
}

/// Rejected status change on a threat record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move threat from '{from}' to '{to}'")]
pub struct TransitionError {
    pub from: ThreatStatus,
    pub to: ThreatStatus,
}

// ============================================================================
// THREAT RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub threat_type: String,
    pub severity_level: SeverityLevel,
    pub source_type: SourceType,
    pub source_content: String,
    pub detected_patterns: Vec<String>,
    pub confidence_score: f64,
    pub explanation: String,
    pub status: ThreatStatus,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Record produced by a scan, before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewThreatRecord {
    pub user_id: Uuid,
    pub threat_type: String,
    pub severity_level: SeverityLevel,
    pub source_type: SourceType,
    pub source_content: String,
    pub detected_patterns: Vec<String>,
    pub confidence_score: f64,
    pub explanation: String,
    pub detected_at: DateTime<Utc>,
}

impl NewThreatRecord {
    pub fn into_record(self, id: Uuid) -> ThreatRecord {
        ThreatRecord {
            id,
            user_id: self.user_id,
            threat_type: self.threat_type,
            severity_level: self.severity_level,
            source_type: self.source_type,
            source_content: self.source_content,
            detected_patterns: self.detected_patterns,
            confidence_score: self.confidence_score,
            explanation: self.explanation,
            status: ThreatStatus::New,
            detected_at: self.detected_at,
            resolved_at: None,
        }
    }
}

impl ThreatRecord {
    /// new -> acknowledged
    pub fn acknowledge(&mut self) -> Result<(), TransitionError> {
        match self.status {
            ThreatStatus::New => {
                self.status = ThreatStatus::Acknowledged;
                Ok(())
            }
            from => Err(TransitionError { from, to: ThreatStatus::Acknowledged }),
        }
    }

    /// new | acknowledged -> resolved, stamping `resolved_at`
    pub fn resolve(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.status {
            ThreatStatus::New | ThreatStatus::Acknowledged => {
                self.status = ThreatStatus::Resolved;
                self.resolved_at = Some(now);
                Ok(())
            }
            from => Err(TransitionError { from, to: ThreatStatus::Resolved }),
        }
    }

    /// Any state except false_positive itself. Clears `resolved_at` so it stays
    /// set only while the record is resolved.
    pub fn mark_false_positive(&mut self) -> Result<(), TransitionError> {
        match self.status {
            ThreatStatus::FalsePositive => Err(TransitionError {
                from: ThreatStatus::FalsePositive,
                to: ThreatStatus::FalsePositive,
            }),
            _ => {
                self.status = ThreatStatus::FalsePositive;
                self.resolved_at = None;
                Ok(())
            }
        }
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 100000, message = "content must be 1-100000 characters"))]
    pub content: String,
    pub source_type: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ThreatFilter {
    pub limit: Option<i64>,
}
