//! Database module - PostgreSQL connection, migrations and catalog seed

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::models::default_catalog;

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create tables if not exist
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Insert the default pattern catalog. Existing patterns (matched by name) are left alone.
pub async fn seed_patterns(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for (position, pattern) in default_catalog().into_iter().enumerate() {
        let result = sqlx::query(
            r#"
            INSERT INTO threat_patterns (name, category, indicators, severity_weight, active, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#
        )
        .bind(&pattern.name)
        .bind(&pattern.category)
        .bind(&pattern.indicators)
        .bind(pattern.severity_weight)
        .bind(pattern.active)
        .bind(position as i32)
        .execute(pool)
        .await?;

        inserted += result.rows_affected();
    }

    if inserted > 0 {
        tracing::info!("Seeded {} default threat patterns", inserted);
    }
    Ok(inserted)
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Users
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    name VARCHAR(255),
    is_active BOOLEAN NOT NULL DEFAULT true,
    last_login TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Pattern catalog (curated out-of-band, read at scan time)
CREATE TABLE IF NOT EXISTS threat_patterns (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL UNIQUE,
    category VARCHAR(50) NOT NULL,
    indicators TEXT[] NOT NULL CHECK (cardinality(indicators) > 0),
    severity_weight DOUBLE PRECISION NOT NULL CHECK (severity_weight >= 0 AND severity_weight <= 1),
    active BOOLEAN NOT NULL DEFAULT true,
    position INT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- One row per scan
CREATE TABLE IF NOT EXISTS threat_records (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    threat_type VARCHAR(50) NOT NULL,
    severity_level VARCHAR(20) NOT NULL
        CHECK (severity_level IN ('safe', 'low', 'medium', 'high', 'critical')),
    source_type VARCHAR(20) NOT NULL
        CHECK (source_type IN ('email', 'message', 'link', 'other')),
    source_content TEXT NOT NULL,
    detected_patterns TEXT[] NOT NULL DEFAULT '{}',
    confidence_score DOUBLE PRECISION NOT NULL
        CHECK (confidence_score >= 0 AND confidence_score <= 95),
    explanation TEXT NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'new'
        CHECK (status IN ('new', 'acknowledged', 'resolved', 'false_positive')),
    detected_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    resolved_at TIMESTAMPTZ,
    CHECK ((status = 'resolved') = (resolved_at IS NOT NULL))
);

-- Per user, per day counters
CREATE TABLE IF NOT EXISTS daily_stats (
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    stat_date DATE NOT NULL,
    total_scanned BIGINT NOT NULL DEFAULT 0,
    threats_detected BIGINT NOT NULL DEFAULT 0,
    false_positives BIGINT NOT NULL DEFAULT 0,
    safe_count BIGINT NOT NULL DEFAULT 0,
    low_count BIGINT NOT NULL DEFAULT 0,
    medium_count BIGINT NOT NULL DEFAULT 0,
    high_count BIGINT NOT NULL DEFAULT 0,
    critical_count BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, stat_date),
    CHECK (safe_count + low_count + medium_count + high_count + critical_count = total_scanned)
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_threat_records_user_detected ON threat_records(user_id, detected_at DESC);
CREATE INDEX IF NOT EXISTS idx_threat_records_status ON threat_records(status);
CREATE INDEX IF NOT EXISTS idx_threat_patterns_active ON threat_patterns(active, position);
"#;
