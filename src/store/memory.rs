//! In-memory store
//!
//! Every operation runs under a single lock with no await points inside it,
//! so each call is atomic with respect to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{PatternCatalog, StoreError, ThreatStore};
use crate::models::{DailyStats, NewThreatRecord, SeverityLevel, ThreatPattern, ThreatRecord, ThreatStatus};

#[derive(Default)]
struct Inner {
    patterns: Vec<ThreatPattern>,
    // Insertion order, oldest first
    threats: Vec<ThreatRecord>,
    stats: HashMap<(Uuid, NaiveDate), DailyStats>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    catalog_offline: AtomicBool,
    writes_offline: AtomicBool,
    catalog_latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns(patterns: Vec<ThreatPattern>) -> Self {
        let store = Self::default();
        store.inner.lock().patterns = patterns;
        store
    }

    /// Make catalog reads fail
    pub fn set_catalog_offline(&self, offline: bool) {
        self.catalog_offline.store(offline, Ordering::SeqCst);
    }

    /// Make every write fail
    pub fn set_writes_offline(&self, offline: bool) {
        self.writes_offline.store(offline, Ordering::SeqCst);
    }

    /// Delay catalog reads
    pub fn set_catalog_latency(&self, latency: Option<Duration>) {
        *self.catalog_latency.lock() = latency;
    }

    pub fn threat_count(&self) -> usize {
        self.inner.lock().threats.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.writes_offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl Inner {
    fn insert_threat(&mut self, record: NewThreatRecord) -> ThreatRecord {
        let record = record.into_record(Uuid::new_v4());
        self.threats.push(record.clone());
        record
    }

    fn bump_stats(&mut self, user_id: Uuid, date: NaiveDate, severity: SeverityLevel) -> DailyStats {
        let stats = self
            .stats
            .entry((user_id, date))
            .and_modify(|s| s.record_scan(severity))
            .or_insert_with(|| DailyStats::first_scan(user_id, date, severity));
        stats.clone()
    }
}

#[async_trait]
impl PatternCatalog for MemoryStore {
    async fn list_active_patterns(&self) -> Result<Vec<ThreatPattern>, StoreError> {
        let latency = *self.catalog_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.catalog_offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("catalog offline".to_string()));
        }

        Ok(self
            .inner
            .lock()
            .patterns
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ThreatStore for MemoryStore {
    async fn create_threat_record(&self, record: NewThreatRecord) -> Result<ThreatRecord, StoreError> {
        self.check_writable()?;
        Ok(self.inner.lock().insert_threat(record))
    }

    async fn upsert_daily_stats(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        severity: SeverityLevel,
    ) -> Result<DailyStats, StoreError> {
        self.check_writable()?;
        Ok(self.inner.lock().bump_stats(user_id, date, severity))
    }

    async fn get_daily_stats(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyStats>, StoreError> {
        Ok(self.inner.lock().stats.get(&(user_id, date)).cloned())
    }

    async fn record_scan(
        &self,
        record: NewThreatRecord,
        date: NaiveDate,
    ) -> Result<(ThreatRecord, DailyStats), StoreError> {
        self.check_writable()?;

        let mut inner = self.inner.lock();
        let severity = record.severity_level;
        let user_id = record.user_id;
        let saved = inner.insert_threat(record);
        let stats = inner.bump_stats(user_id, date, severity);
        Ok((saved, stats))
    }

    async fn find_threat(&self, id: Uuid) -> Result<Option<ThreatRecord>, StoreError> {
        Ok(self.inner.lock().threats.iter().find(|t| t.id == id).cloned())
    }

    async fn apply_transition(&self, record: &ThreatRecord, previous: ThreatStatus) -> Result<bool, StoreError> {
        self.check_writable()?;

        let mut inner = self.inner.lock();
        let Some(stored) = inner.threats.iter_mut().find(|t| t.id == record.id) else {
            return Ok(false);
        };
        if stored.status != previous {
            return Ok(false);
        }

        stored.status = record.status;
        stored.resolved_at = record.resolved_at;

        if record.status == ThreatStatus::FalsePositive {
            let user_id = stored.user_id;
            let date = stored.detected_at.date_naive();
            inner
                .stats
                .entry((user_id, date))
                .or_insert_with(|| DailyStats::empty(user_id, date))
                .record_false_positive();
        }

        Ok(true)
    }

    async fn list_recent_threats(&self, user_id: Uuid, limit: i64) -> Result<Vec<ThreatRecord>, StoreError> {
        let inner = self.inner.lock();
        let mut threats: Vec<ThreatRecord> = inner
            .threats
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps newest-inserted first among equal timestamps
        threats.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        threats.truncate(limit.max(0) as usize);
        Ok(threats)
    }
}
