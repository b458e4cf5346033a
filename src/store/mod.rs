//! Persistence collaborators
//!
//! The scan engine only talks to these traits. `PgStore` backs the server,
//! `MemoryStore` backs tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{DailyStats, NewThreatRecord, SeverityLevel, ThreatPattern, ThreatRecord, ThreatStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value falls outside a closed enumeration or invariant
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read path to the curated pattern catalog
#[async_trait]
pub trait PatternCatalog: Send + Sync {
    /// Active patterns in catalog order
    async fn list_active_patterns(&self) -> Result<Vec<ThreatPattern>, StoreError>;
}

/// Threat records and daily counters
#[async_trait]
pub trait ThreatStore: Send + Sync {
    async fn create_threat_record(&self, record: NewThreatRecord) -> Result<ThreatRecord, StoreError>;

    /// Atomic create-or-increment of the (user, date) counters
    async fn upsert_daily_stats(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        severity: SeverityLevel,
    ) -> Result<DailyStats, StoreError>;

    async fn get_daily_stats(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyStats>, StoreError>;

    /// Persist the record and bump the day's counters as one unit.
    /// Either both land or neither does.
    async fn record_scan(
        &self,
        record: NewThreatRecord,
        date: NaiveDate,
    ) -> Result<(ThreatRecord, DailyStats), StoreError>;

    async fn find_threat(&self, id: Uuid) -> Result<Option<ThreatRecord>, StoreError>;

    /// Write `record`'s status and `resolved_at` if the stored status is still
    /// `previous`. Moving to false_positive also bumps `false_positives` for the
    /// detection day. Returns false when the stored status no longer matches.
    async fn apply_transition(&self, record: &ThreatRecord, previous: ThreatStatus) -> Result<bool, StoreError>;

    /// Most recent first
    async fn list_recent_threats(&self, user_id: Uuid, limit: i64) -> Result<Vec<ThreatRecord>, StoreError>;
}
