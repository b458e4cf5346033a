//! Daily scan statistics model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::threat::SeverityLevel;

/// Per-severity counters, one slot per level of the closed scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub safe: i64,
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub critical: i64,
}

impl SeverityCounts {
    pub fn get(&self, level: SeverityLevel) -> i64 {
        match level {
            SeverityLevel::Safe => self.safe,
            SeverityLevel::Low => self.low,
            SeverityLevel::Medium => self.medium,
            SeverityLevel::High => self.high,
            SeverityLevel::Critical => self.critical,
        }
    }

    fn slot_mut(&mut self, level: SeverityLevel) -> &mut i64 {
        match level {
            SeverityLevel::Safe => &mut self.safe,
            SeverityLevel::Low => &mut self.low,
            SeverityLevel::Medium => &mut self.medium,
            SeverityLevel::High => &mut self.high,
            SeverityLevel::Critical => &mut self.critical,
        }
    }

    pub fn increment(&mut self, level: SeverityLevel) {
        *self.slot_mut(level) += 1;
    }

    pub fn total(&self) -> i64 {
        SeverityLevel::ALL.iter().map(|l| self.get(*l)).sum()
    }
}

/// Running counters for one user on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub total_scanned: i64,
    pub threats_detected: i64,
    pub false_positives: i64,
    pub by_severity: SeverityCounts,
    pub updated_at: DateTime<Utc>,
}

impl DailyStats {
    /// Row created by the first scan of the day
    pub fn first_scan(user_id: Uuid, date: NaiveDate, severity: SeverityLevel) -> Self {
        let mut stats = Self::empty(user_id, date);
        stats.record_scan(severity);
        stats
    }

    /// Row with every counter at zero
    pub fn empty(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            total_scanned: 0,
            threats_detected: 0,
            false_positives: 0,
            by_severity: SeverityCounts::default(),
            updated_at: Utc::now(),
        }
    }

    /// Count one more scan. Keeps `by_severity.total() == total_scanned`.
    pub fn record_scan(&mut self, severity: SeverityLevel) {
        self.total_scanned += 1;
        if severity.is_threat() {
            self.threats_detected += 1;
        }
        self.by_severity.increment(severity);
        self.updated_at = Utc::now();
    }

    pub fn record_false_positive(&mut self) {
        self.false_positives += 1;
        self.updated_at = Utc::now();
    }

    pub fn is_consistent(&self) -> bool {
        self.by_severity.total() == self.total_scanned
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct StatsQuery {
    pub date: Option<NaiveDate>,
}
