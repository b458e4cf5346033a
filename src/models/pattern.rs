//! Threat pattern model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named, weighted group of indicator strings sharing a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPattern {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub indicators: Vec<String>,
    pub severity_weight: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ThreatPattern {
    pub fn new(name: &str, category: &str, indicators: &[&str], severity_weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            indicators: indicators.iter().map(|i| i.to_string()).collect(),
            severity_weight,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Reject rows that break the catalog invariants
    pub fn check(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.severity_weight) {
            return Err(format!(
                "pattern '{}' has severity weight {} outside [0, 1]",
                self.name, self.severity_weight
            ));
        }
        if self.indicators.is_empty() {
            return Err(format!("pattern '{}' has no indicators", self.name));
        }
        Ok(())
    }
}

/// Catalog seeded into a fresh database
pub fn default_catalog() -> Vec<ThreatPattern> {
    vec![
        ThreatPattern::new(
            "Urgent Action Required",
            "phishing",
            &["urgent", "immediately", "act now", "within 24 hours", "account suspended", "verify your account"],
            0.75,
        ),
        ThreatPattern::new(
            "Suspicious Links",
            "phishing",
            &["bit.ly", "tinyurl", "click here", "click the link", "login now", "http://"],
            0.90,
        ),
        ThreatPattern::new(
            "Credential Request",
            "phishing",
            &["password", "social security", "bank account", "credit card", "pin number", "login credentials"],
            0.95,
        ),
        ThreatPattern::new(
            "Authority Impersonation",
            "pretexting",
            &["the ceo", "it department", "internal revenue", "tax office", "police", "your manager"],
            0.80,
        ),
        ThreatPattern::new(
            "Prize / Reward Bait",
            "baiting",
            &["you have won", "you've won", "free gift", "claim your prize", "lottery", "gift card"],
            0.70,
        ),
        ThreatPattern::new(
            "Pretexting Scenario",
            "pretexting",
            &["confirm your identity", "security check", "routine audit", "update your details", "wire transfer"],
            0.60,
        ),
    ]
}
