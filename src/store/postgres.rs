//! PostgreSQL store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use super::{PatternCatalog, StoreError, ThreatStore};
use crate::models::{
    DailyStats, NewThreatRecord, SeverityCounts, SeverityLevel, ThreatPattern, ThreatRecord, ThreatStatus,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// ROWS
// ============================================================================

#[derive(Debug, FromRow)]
struct PatternRow {
    id: Uuid,
    name: String,
    category: String,
    indicators: Vec<String>,
    severity_weight: f64,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<PatternRow> for ThreatPattern {
    fn from(row: PatternRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            indicators: row.indicators,
            severity_weight: row.severity_weight,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ThreatRecordRow {
    id: Uuid,
    user_id: Uuid,
    threat_type: String,
    severity_level: String,
    source_type: String,
    source_content: String,
    detected_patterns: Vec<String>,
    confidence_score: f64,
    explanation: String,
    status: String,
    detected_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ThreatRecordRow> for ThreatRecord {
    type Error = StoreError;

    fn try_from(row: ThreatRecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            threat_type: row.threat_type,
            severity_level: row.severity_level.parse().map_err(StoreError::DataIntegrity)?,
            source_type: row.source_type.parse().map_err(StoreError::DataIntegrity)?,
            source_content: row.source_content,
            detected_patterns: row.detected_patterns,
            confidence_score: row.confidence_score,
            explanation: row.explanation,
            status: row.status.parse().map_err(StoreError::DataIntegrity)?,
            detected_at: row.detected_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DailyStatsRow {
    user_id: Uuid,
    stat_date: NaiveDate,
    total_scanned: i64,
    threats_detected: i64,
    false_positives: i64,
    safe_count: i64,
    low_count: i64,
    medium_count: i64,
    high_count: i64,
    critical_count: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DailyStatsRow> for DailyStats {
    type Error = StoreError;

    fn try_from(row: DailyStatsRow) -> Result<Self, Self::Error> {
        let stats = Self {
            user_id: row.user_id,
            date: row.stat_date,
            total_scanned: row.total_scanned,
            threats_detected: row.threats_detected,
            false_positives: row.false_positives,
            by_severity: SeverityCounts {
                safe: row.safe_count,
                low: row.low_count,
                medium: row.medium_count,
                high: row.high_count,
                critical: row.critical_count,
            },
            updated_at: row.updated_at,
        };

        if !stats.is_consistent() {
            return Err(StoreError::DataIntegrity(format!(
                "daily stats for {} on {} count {} scans but {} by severity",
                stats.user_id,
                stats.date,
                stats.total_scanned,
                stats.by_severity.total()
            )));
        }
        Ok(stats)
    }
}

// ============================================================================
// QUERIES
// ============================================================================

async fn insert_threat<'e, E: PgExecutor<'e>>(
    executor: E,
    record: &NewThreatRecord,
) -> Result<ThreatRecord, StoreError> {
    let row = sqlx::query_as::<_, ThreatRecordRow>(
        r#"
        INSERT INTO threat_records (
            user_id, threat_type, severity_level, source_type, source_content,
            detected_patterns, confidence_score, explanation, status, detected_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'new', $9)
        RETURNING *
        "#
    )
    .bind(record.user_id)
    .bind(&record.threat_type)
    .bind(record.severity_level.as_str())
    .bind(record.source_type.as_str())
    .bind(&record.source_content)
    .bind(&record.detected_patterns)
    .bind(record.confidence_score)
    .bind(&record.explanation)
    .bind(record.detected_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

/// Single-statement increment, so concurrent scans on the same day serialize
/// on the row lock instead of racing a read-modify-write.
async fn increment_stats<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    date: NaiveDate,
    severity: SeverityLevel,
) -> Result<DailyStats, StoreError> {
    let one_hot = |level: SeverityLevel| i64::from(severity == level);

    let row = sqlx::query_as::<_, DailyStatsRow>(
        r#"
        INSERT INTO daily_stats (
            user_id, stat_date, total_scanned, threats_detected, false_positives,
            safe_count, low_count, medium_count, high_count, critical_count
        )
        VALUES ($1, $2, 1, $3, 0, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, stat_date) DO UPDATE SET
            total_scanned = daily_stats.total_scanned + 1,
            threats_detected = daily_stats.threats_detected + EXCLUDED.threats_detected,
            safe_count = daily_stats.safe_count + EXCLUDED.safe_count,
            low_count = daily_stats.low_count + EXCLUDED.low_count,
            medium_count = daily_stats.medium_count + EXCLUDED.medium_count,
            high_count = daily_stats.high_count + EXCLUDED.high_count,
            critical_count = daily_stats.critical_count + EXCLUDED.critical_count,
            updated_at = NOW()
        RETURNING *
        "#
    )
    .bind(user_id)
    .bind(date)
    .bind(i64::from(severity.is_threat()))
    .bind(one_hot(SeverityLevel::Safe))
    .bind(one_hot(SeverityLevel::Low))
    .bind(one_hot(SeverityLevel::Medium))
    .bind(one_hot(SeverityLevel::High))
    .bind(one_hot(SeverityLevel::Critical))
    .fetch_one(executor)
    .await?;

    row.try_into()
}

#[async_trait]
impl PatternCatalog for PgStore {
    async fn list_active_patterns(&self) -> Result<Vec<ThreatPattern>, StoreError> {
        let rows = sqlx::query_as::<_, PatternRow>(
            r#"
            SELECT id, name, category, indicators, severity_weight, active, created_at
            FROM threat_patterns
            WHERE active = true
            ORDER BY position ASC, created_at ASC
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ThreatPattern::from).collect())
    }
}

#[async_trait]
impl ThreatStore for PgStore {
    async fn create_threat_record(&self, record: NewThreatRecord) -> Result<ThreatRecord, StoreError> {
        insert_threat(&self.pool, &record).await
    }

    async fn upsert_daily_stats(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        severity: SeverityLevel,
    ) -> Result<DailyStats, StoreError> {
        increment_stats(&self.pool, user_id, date, severity).await
    }

    async fn get_daily_stats(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyStats>, StoreError> {
        let row = sqlx::query_as::<_, DailyStatsRow>(
            "SELECT * FROM daily_stats WHERE user_id = $1 AND stat_date = $2"
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DailyStats::try_from).transpose()
    }

    async fn record_scan(
        &self,
        record: NewThreatRecord,
        date: NaiveDate,
    ) -> Result<(ThreatRecord, DailyStats), StoreError> {
        // Dropping the transaction before commit (error or cancellation) rolls back both writes
        let mut tx = self.pool.begin().await?;

        let saved = insert_threat(&mut *tx, &record).await?;
        let stats = increment_stats(&mut *tx, record.user_id, date, record.severity_level).await?;

        tx.commit().await?;
        Ok((saved, stats))
    }

    async fn find_threat(&self, id: Uuid) -> Result<Option<ThreatRecord>, StoreError> {
        let row = sqlx::query_as::<_, ThreatRecordRow>("SELECT * FROM threat_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ThreatRecord::try_from).transpose()
    }

    async fn apply_transition(&self, record: &ThreatRecord, previous: ThreatStatus) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
            UPDATE threat_records
            SET status = $2, resolved_at = $3
            WHERE id = $1 AND status = $4
            RETURNING user_id, detected_at
            "#
        )
        .bind(record.id)
        .bind(record.status.as_str())
        .bind(record.resolved_at)
        .bind(previous.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, detected_at)) = updated else {
            return Ok(false);
        };

        if record.status == ThreatStatus::FalsePositive {
            sqlx::query(
                r#"
                INSERT INTO daily_stats (user_id, stat_date, false_positives)
                VALUES ($1, $2, 1)
                ON CONFLICT (user_id, stat_date) DO UPDATE SET
                    false_positives = daily_stats.false_positives + 1,
                    updated_at = NOW()
                "#
            )
            .bind(user_id)
            .bind(detected_at.date_naive())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_recent_threats(&self, user_id: Uuid, limit: i64) -> Result<Vec<ThreatRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ThreatRecordRow>(
            r#"
            SELECT * FROM threat_records
            WHERE user_id = $1
            ORDER BY detected_at DESC
            LIMIT $2
            "#
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ThreatRecord::try_from).collect()
    }
}
