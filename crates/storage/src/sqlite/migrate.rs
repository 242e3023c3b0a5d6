use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (profiles, per-level records, and the leaderboard
/// index).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL,
                    avatar_url TEXT,
                    current_level INTEGER NOT NULL CHECK (current_level >= 1),
                    total_score INTEGER NOT NULL CHECK (total_score >= 0),
                    quiz_completed INTEGER NOT NULL CHECK (quiz_completed IN (0, 1)),
                    created_at TEXT NOT NULL,
                    last_completed_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS level_records (
                    user_id TEXT NOT NULL,
                    level INTEGER NOT NULL CHECK (level >= 1),
                    score INTEGER NOT NULL CHECK (score >= 0),
                    completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                    last_question_index INTEGER NOT NULL CHECK (last_question_index >= 0),
                    PRIMARY KEY (user_id, level),
                    FOREIGN KEY (user_id) REFERENCES profiles(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_profiles_score_completed_at
                    ON profiles (total_score DESC, last_completed_at ASC);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
