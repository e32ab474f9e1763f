// =====================================================================================
// File: core-database/src/migrations.rs
// Description: Embedded versioned schema migrations
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use crate::DatabaseError;
use sqlx::{Pool, Postgres, Row};
use tracing::info;

/// Migration definition
struct Migration {
    version: i32,
    name: &'static str,
    up_sql: &'static [&'static str],
}

/// All migrations in order
fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        name: "create_call_tables",
        up_sql: &[
            r#"
            CREATE TABLE call_records (
                id BIGSERIAL PRIMARY KEY,
                call_sid VARCHAR(100) NOT NULL UNIQUE,
                from_number VARCHAR(30) NOT NULL DEFAULT '',
                to_number VARCHAR(30) NOT NULL DEFAULT '',
                transcript TEXT NOT NULL,
                emergency_type VARCHAR(30) NOT NULL,
                severity_level VARCHAR(20) NOT NULL,
                severity_score REAL NOT NULL,
                risk_indicators JSONB NOT NULL DEFAULT '[]',
                assigned_service VARCHAR(30) NOT NULL,
                priority INTEGER NOT NULL,
                location_address VARCHAR(500),
                summary TEXT NOT NULL DEFAULT '',
                confidence REAL NOT NULL,
                spoken TEXT NOT NULL DEFAULT '',
                immediate_actions JSONB NOT NULL DEFAULT '[]',
                precautions JSONB NOT NULL DEFAULT '[]',
                danger_question TEXT NOT NULL DEFAULT '',
                escalated_spoken TEXT NOT NULL DEFAULT '',
                status VARCHAR(30) NOT NULL DEFAULT 'PENDING',
                assigned_unit VARCHAR(50),
                processing_time_ms DOUBLE PRECISION NOT NULL DEFAULT 0,
                call_metadata JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ
            )
            "#,
            "CREATE INDEX idx_call_records_created_at ON call_records (created_at DESC)",
            "CREATE INDEX idx_call_records_status ON call_records (status)",
            "CREATE INDEX idx_call_records_emergency_type ON call_records (emergency_type)",
            r#"
            CREATE TABLE call_notes (
                id BIGSERIAL PRIMARY KEY,
                call_id BIGINT NOT NULL REFERENCES call_records (id) ON DELETE CASCADE,
                note TEXT NOT NULL,
                created_by VARCHAR(100),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX idx_call_notes_call_id ON call_notes (call_id)",
        ],
    }]
}

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), DatabaseError> {
    create_migrations_table(pool).await?;
    let current_version = get_current_migration_version(pool).await?;

    for migration in get_migrations() {
        if migration.version <= current_version {
            continue;
        }

        info!(version = migration.version, name = migration.name, "Applying migration");

        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
        for statement in migration.up_sql {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        }
        sqlx::query("INSERT INTO migrations (version, name, applied_at) VALUES ($1, $2, NOW())")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(version = migration.version, "Migration completed");
    }

    Ok(())
}

/// Create the migrations tracking table
async fn create_migrations_table(pool: &Pool<Postgres>) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(())
}

/// Get the current migration version
async fn get_current_migration_version(pool: &Pool<Postgres>) -> Result<i32, DatabaseError> {
    let row = sqlx::query("SELECT COALESCE(MAX(version), 0) as version FROM migrations")
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::from)?;

    Ok(row.get("version"))
}
