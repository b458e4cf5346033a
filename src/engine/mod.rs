//! Scan Engine
//!
//! Scores submitted text for social engineering and keeps the per-user
//! daily counters in step with every scan.
//!
//! ## Structure
//! - `rules`: thresholds and constants
//! - `matcher`: indicator matching against the catalog
//! - `scorer`: severity, confidence and threat type
//! - `explainer`: deterministic explanation text
//!
//! ## Flow
//! ```text
//! catalog ──► match_patterns ──► score ──► explain ──► ThreatStore::record_scan
//!                                                        (record + daily stats)
//! ```

pub mod rules;
pub mod matcher;
pub mod scorer;
pub mod explainer;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    DailyStats, NewThreatRecord, SourceType, ThreatPattern, ThreatRecord, ThreatStatus, TransitionError,
};
use crate::store::{PatternCatalog, StoreError, ThreatStore};

pub use explainer::explain;
pub use matcher::{match_patterns, MatchResult};
pub use scorer::{score, ThreatScore};

/// Default bound on every store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// POLICY & ERRORS
// ============================================================================

/// What a scan does when the pattern catalog cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogFailurePolicy {
    /// Scan against an empty catalog: safe, zero confidence
    #[default]
    FailOpen,
    /// Reject the scan
    FailClosed,
}

impl FromStr for CatalogFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_open" => Ok(Self::FailOpen),
            "fail_closed" => Ok(Self::FailClosed),
            other => Err(format!("unknown catalog failure policy '{}'", other)),
        }
    }
}

impl fmt::Display for CatalogFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailOpen => write!(f, "fail_open"),
            Self::FailClosed => write!(f, "fail_closed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("content must not be empty")]
    EmptyContent,

    #[error("unrecognized source type '{0}'")]
    InvalidSourceType(String),

    #[error("threat record {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),

    #[error("threat record {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("pattern catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// PURE EVALUATION
// ============================================================================

/// Everything a scan decides before anything is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: ThreatScore,
    pub detected_patterns: Vec<String>,
    pub explanation: String,
}

/// Matcher → Scorer → Explainer over an already loaded catalog
pub fn evaluate(content: &str, patterns: &[ThreatPattern], source_type: SourceType) -> Evaluation {
    let matches = match_patterns(content, patterns);
    let score = score(&matches, patterns.iter().any(|p| p.active));
    let explanation = explain(&matches, score.severity, source_type);

    Evaluation {
        detected_patterns: matches.iter().map(|m| m.pattern.name.clone()).collect(),
        score,
        explanation,
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ScanEngine {
    catalog: Arc<dyn PatternCatalog>,
    store: Arc<dyn ThreatStore>,
    catalog_policy: CatalogFailurePolicy,
    timeout: Duration,
}

impl ScanEngine {
    pub fn new(catalog: Arc<dyn PatternCatalog>, store: Arc<dyn ThreatStore>) -> Self {
        Self {
            catalog,
            store,
            catalog_policy: CatalogFailurePolicy::default(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_catalog_policy(mut self, policy: CatalogFailurePolicy) -> Self {
        self.catalog_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scan `content` for `user_id` and persist the result.
    ///
    /// Input is validated before any I/O. On success exactly one threat record
    /// exists for the scan and today's counters include it.
    pub async fn scan(&self, user_id: Uuid, content: &str, source_type: &str) -> Result<ThreatRecord, EngineError> {
        self.scan_at(user_id, content, source_type, Utc::now()).await
    }

    pub async fn scan_at(
        &self,
        user_id: Uuid,
        content: &str,
        source_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ThreatRecord, EngineError> {
        if content.trim().is_empty() {
            return Err(EngineError::EmptyContent);
        }
        let source_type: SourceType = source_type
            .parse()
            .map_err(|_| EngineError::InvalidSourceType(source_type.to_string()))?;

        let patterns = self.load_catalog().await?;
        let evaluation = evaluate(content, &patterns, source_type);
        let severity = evaluation.score.severity;

        let record = NewThreatRecord {
            user_id,
            threat_type: evaluation.score.threat_type,
            severity_level: severity,
            source_type,
            source_content: content.to_string(),
            detected_patterns: evaluation.detected_patterns,
            confidence_score: evaluation.score.confidence,
            explanation: evaluation.explanation,
            detected_at: now,
        };

        let (saved, stats) = self
            .bounded("record scan", self.store.record_scan(record, now.date_naive()))
            .await
            .inspect_err(|e| tracing::error!("Failed to persist scan for user {}: {}", user_id, e))?;

        tracing::info!(
            "Scan {} for user {}: severity={} confidence={:.1} type={} patterns={:?} (scanned today: {})",
            saved.id,
            user_id,
            saved.severity_level,
            saved.confidence_score,
            saved.threat_type,
            saved.detected_patterns,
            stats.total_scanned
        );

        Ok(saved)
    }

    /// new -> acknowledged
    pub async fn acknowledge(&self, record_id: Uuid) -> Result<ThreatRecord, EngineError> {
        self.transition(record_id, |record| record.acknowledge()).await
    }

    /// new | acknowledged -> resolved
    pub async fn resolve(&self, record_id: Uuid) -> Result<ThreatRecord, EngineError> {
        let now = Utc::now();
        self.transition(record_id, move |record| record.resolve(now)).await
    }

    /// Any other state -> false_positive, counted on the detection day
    pub async fn mark_false_positive(&self, record_id: Uuid) -> Result<ThreatRecord, EngineError> {
        self.transition(record_id, |record| record.mark_false_positive()).await
    }

    pub async fn get_threat(&self, record_id: Uuid) -> Result<ThreatRecord, EngineError> {
        self.bounded("find threat", self.store.find_threat(record_id))
            .await?
            .ok_or(EngineError::NotFound(record_id))
    }

    /// Most recent first
    pub async fn list_recent_threats(&self, user_id: Uuid, limit: i64) -> Result<Vec<ThreatRecord>, EngineError> {
        self.bounded("list threats", self.store.list_recent_threats(user_id, limit.max(0)))
            .await
    }

    /// Counters for one day, all zero if nothing was scanned
    pub async fn daily_stats(&self, user_id: Uuid, date: NaiveDate) -> Result<DailyStats, EngineError> {
        let stats = self
            .bounded("read daily stats", self.store.get_daily_stats(user_id, date))
            .await?;
        Ok(stats.unwrap_or_else(|| DailyStats::empty(user_id, date)))
    }

    /// Active catalog as the scanner sees it, malformed rows left out
    pub async fn active_patterns(&self) -> Result<Vec<ThreatPattern>, EngineError> {
        let patterns = self.bounded("list patterns", self.catalog.list_active_patterns()).await?;
        Ok(usable_patterns(patterns))
    }

    async fn transition<F>(&self, record_id: Uuid, apply: F) -> Result<ThreatRecord, EngineError>
    where
        F: FnOnce(&mut ThreatRecord) -> Result<(), TransitionError>,
    {
        let mut record = self.get_threat(record_id).await?;
        let previous = record.status;

        apply(&mut record)?;

        let written = self
            .bounded("update threat status", self.store.apply_transition(&record, previous))
            .await?;
        if !written {
            return Err(EngineError::Conflict(record_id));
        }

        tracing::info!("Threat {} moved {} -> {}", record_id, previous, record.status);
        if record.status == ThreatStatus::FalsePositive {
            tracing::info!("Threat {} flagged as false positive by user {}", record_id, record.user_id);
        }

        Ok(record)
    }

    /// Fetch the catalog, applying the failure policy
    async fn load_catalog(&self) -> Result<Vec<ThreatPattern>, EngineError> {
        let patterns = match self.bounded("list patterns", self.catalog.list_active_patterns()).await {
            Ok(patterns) => patterns,
            Err(e) => match self.catalog_policy {
                CatalogFailurePolicy::FailOpen => {
                    tracing::warn!(
                        "Pattern catalog unavailable ({}), failing open: scan will be classified safe with zero confidence",
                        e
                    );
                    return Ok(Vec::new());
                }
                CatalogFailurePolicy::FailClosed => {
                    tracing::error!("Pattern catalog unavailable ({}), rejecting scan", e);
                    return Err(EngineError::CatalogUnavailable(e.to_string()));
                }
            },
        };

        let usable = usable_patterns(patterns);

        if usable.is_empty() {
            tracing::warn!("Pattern catalog has no usable active patterns; scans carry zero confidence");
        }

        Ok(usable)
    }

    async fn bounded<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, EngineError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(EngineError::Timeout { operation, timeout: self.timeout }),
        }
    }
}

fn usable_patterns(patterns: Vec<ThreatPattern>) -> Vec<ThreatPattern> {
    patterns
        .into_iter()
        .filter(|pattern| match pattern.check() {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!("Skipping malformed pattern: {}", reason);
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeverityLevel, ThreatStatus};
    use crate::store::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    const PHISH: &str = "URGENT: verify your account now, click http://bit.ly/xyz";
    const COFFEE: &str = "Let's meet for coffee tomorrow";

    fn scenario_catalog() -> Vec<ThreatPattern> {
        vec![
            ThreatPattern::new("Urgent Action Required", "urgency", &["urgent", "immediately"], 0.75),
            ThreatPattern::new("Suspicious Links", "phishing", &["bit.ly", "tinyurl"], 0.90),
        ]
    }

    fn engine_with(store: Arc<MemoryStore>) -> ScanEngine {
        ScanEngine::new(store.clone(), store)
    }

    #[tokio::test]
    async fn test_phishing_scenario() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = engine_with(store.clone());
        let user = Uuid::new_v4();

        let record = assert_ok!(engine.scan(user, PHISH, "email").await);

        assert_eq!(record.severity_level, SeverityLevel::High);
        assert_eq!(record.confidence_score, 95.0);
        assert_eq!(record.threat_type, "urgency");
        assert_eq!(record.detected_patterns, vec!["Urgent Action Required", "Suspicious Links"]);
        assert_eq!(record.status, ThreatStatus::New);
        assert!(record.resolved_at.is_none());
        assert_eq!(record.source_content, PHISH);
        assert!(record.explanation.contains("Source analyzed: EMAIL"));
    }

    #[tokio::test]
    async fn test_clean_content_scenario() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = engine_with(store);

        let record = engine.scan(Uuid::new_v4(), COFFEE, "message").await.unwrap();

        assert_eq!(record.severity_level, SeverityLevel::Safe);
        assert_eq!(record.confidence_score, 95.0);
        assert_eq!(record.threat_type, "none");
        assert!(record.detected_patterns.is_empty());
        assert!(record.explanation.starts_with(explainer::guidance(SeverityLevel::Safe).summary));
        assert!(!record.explanation.contains("Detected patterns:"));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_zero_confidence() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(store);

        let record = engine.scan(Uuid::new_v4(), PHISH, "email").await.unwrap();
        assert_eq!(record.severity_level, SeverityLevel::Safe);
        assert_eq!(record.confidence_score, 0.0);
        assert_eq!(record.threat_type, "none");
    }

    #[tokio::test]
    async fn test_catalog_outage_fails_open_by_default() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        store.set_catalog_offline(true);
        let engine = engine_with(store.clone());
        let user = Uuid::new_v4();

        let record = engine.scan(user, PHISH, "email").await.unwrap();
        assert_eq!(record.severity_level, SeverityLevel::Safe);
        assert_eq!(record.confidence_score, 0.0);

        let stats = engine.daily_stats(user, record.detected_at.date_naive()).await.unwrap();
        assert_eq!(stats.total_scanned, 1);
        assert_eq!(stats.by_severity.safe, 1);
    }

    #[tokio::test]
    async fn test_catalog_outage_can_fail_closed() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        store.set_catalog_offline(true);
        let engine = engine_with(store.clone()).with_catalog_policy(CatalogFailurePolicy::FailClosed);

        let err = assert_err!(engine.scan(Uuid::new_v4(), PHISH, "email").await);
        assert!(matches!(err, EngineError::CatalogUnavailable(_)));
        assert_eq!(store.threat_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out_into_policy() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        store.set_catalog_latency(Some(Duration::from_millis(200)));
        let engine = engine_with(store).with_timeout(Duration::from_millis(20));

        let record = engine.scan(Uuid::new_v4(), PHISH, "email").await.unwrap();
        assert_eq!(record.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_io() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        store.set_catalog_offline(true);
        let engine = engine_with(store.clone()).with_catalog_policy(CatalogFailurePolicy::FailClosed);

        let err = engine.scan(Uuid::new_v4(), "   \n\t", "email").await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyContent));

        let err = engine.scan(Uuid::new_v4(), PHISH, "fax").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidSourceType(ref s) if s == "fax"));

        assert_eq!(store.threat_count(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_no_stats() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        store.set_writes_offline(true);
        let engine = engine_with(store.clone());
        let user = Uuid::new_v4();

        let err = engine.scan(user, PHISH, "email").await.unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Unavailable(_))));
        assert_eq!(store.threat_count(), 0);

        let stats = engine.daily_stats(user, Utc::now().date_naive()).await.unwrap();
        assert_eq!(stats.total_scanned, 0);
    }

    #[tokio::test]
    async fn test_two_scans_same_day_accumulate() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = engine_with(store);
        let user = Uuid::new_v4();
        let now = Utc::now();

        engine.scan_at(user, PHISH, "email", now).await.unwrap();
        engine.scan_at(user, COFFEE, "message", now).await.unwrap();

        let stats = engine.daily_stats(user, now.date_naive()).await.unwrap();
        assert_eq!(stats.total_scanned, 2);
        assert_eq!(stats.threats_detected, 1);
        assert_eq!(stats.by_severity.total(), 2);
        assert_eq!(stats.by_severity.high, 1);
        assert_eq!(stats.by_severity.safe, 1);
    }

    #[tokio::test]
    async fn test_concurrent_scans_do_not_lose_updates() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = Arc::new(engine_with(store));
        let user = Uuid::new_v4();
        let now = Utc::now();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.scan_at(user, PHISH, "link", now).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = engine.daily_stats(user, now.date_naive()).await.unwrap();
        assert_eq!(stats.total_scanned, 20);
        assert!(stats.is_consistent());
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = engine_with(store);
        let record = engine.scan(Uuid::new_v4(), PHISH, "email").await.unwrap();

        let acked = engine.acknowledge(record.id).await.unwrap();
        assert_eq!(acked.status, ThreatStatus::Acknowledged);
        assert!(acked.resolved_at.is_none());

        let err = engine.acknowledge(record.id).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition(_)));

        let resolved = engine.resolve(record.id).await.unwrap();
        assert_eq!(resolved.status, ThreatStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        let err = engine.resolve(record.id).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition(_)));

        let stored = engine.get_threat(record.id).await.unwrap();
        assert_eq!(stored.status, ThreatStatus::Resolved);
    }

    #[tokio::test]
    async fn test_false_positive_is_counted() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = engine_with(store);
        let user = Uuid::new_v4();
        let record = engine.scan(user, PHISH, "email").await.unwrap();

        let flagged = engine.mark_false_positive(record.id).await.unwrap();
        assert_eq!(flagged.status, ThreatStatus::FalsePositive);
        assert!(engine.resolve(record.id).await.is_err());

        let stats = engine.daily_stats(user, record.detected_at.date_naive()).await.unwrap();
        assert_eq!(stats.false_positives, 1);
        assert_eq!(stats.total_scanned, 1);
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let engine = engine_with(Arc::new(MemoryStore::new()));
        let id = Uuid::new_v4();
        assert!(matches!(engine.acknowledge(id).await, Err(EngineError::NotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn test_recent_threats_newest_first() {
        let store = Arc::new(MemoryStore::with_patterns(scenario_catalog()));
        let engine = engine_with(store);
        let user = Uuid::new_v4();
        let start = Utc::now();

        for i in 0..3 {
            engine
                .scan_at(user, PHISH, "email", start + chrono::Duration::seconds(i))
                .await
                .unwrap();
        }

        let recent = engine.list_recent_threats(user, 50).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent.windows(2).all(|w| w[0].detected_at >= w[1].detected_at));
        assert_eq!(engine.list_recent_threats(user, 1).await.unwrap().len(), 1);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let patterns = scenario_catalog();
        let a = evaluate(PHISH, &patterns, SourceType::Email);
        let b = evaluate(PHISH, &patterns, SourceType::Email);
        assert_eq!(a, b);
    }

    #[test]
    fn test_inactive_only_catalog_counts_as_no_catalog() {
        let mut patterns = scenario_catalog();
        for pattern in &mut patterns {
            pattern.active = false;
        }

        let evaluation = evaluate(COFFEE, &patterns, SourceType::Message);
        assert_eq!(evaluation.score.severity, SeverityLevel::Safe);
        assert_eq!(evaluation.score.confidence, 0.0);

        patterns[0].active = true;
        let evaluation = evaluate(COFFEE, &patterns, SourceType::Message);
        assert_eq!(evaluation.score.confidence, 95.0);
    }

    #[tokio::test]
    async fn test_listed_patterns_match_what_scans_use() {
        let mut catalog = scenario_catalog();
        catalog.push(ThreatPattern::new("Overweight", "phishing", &["coffee"], 1.5));
        catalog.push(ThreatPattern::new("Hollow", "phishing", &[], 0.5));
        let store = Arc::new(MemoryStore::with_patterns(catalog));
        let engine = engine_with(store);

        let names: Vec<String> = assert_ok!(engine.active_patterns().await)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Urgent Action Required", "Suspicious Links"]);

        let record = assert_ok!(engine.scan(Uuid::new_v4(), COFFEE, "message").await);
        assert_eq!(record.severity_level, SeverityLevel::Safe);
        assert!(record.detected_patterns.is_empty());
    }

    #[test]
    fn test_policy_parses_from_config_strings() {
        assert_eq!("fail_open".parse::<CatalogFailurePolicy>().unwrap(), CatalogFailurePolicy::FailOpen);
        assert_eq!("fail_closed".parse::<CatalogFailurePolicy>().unwrap(), CatalogFailurePolicy::FailClosed);
        assert!("maybe".parse::<CatalogFailurePolicy>().is_err());
    }
}
