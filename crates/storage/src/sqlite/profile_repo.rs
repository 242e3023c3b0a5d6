use std::collections::{BTreeMap, HashMap};

use quiz_core::model::{Profile, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{level_record_from_row, profile_from_row, ser};
use crate::repository::{ProfileRepository, ProfileUpdate, StorageError};

impl SqliteRepository {
    async fn level_records_for(
        &self,
        id: UserId,
    ) -> Result<BTreeMap<u32, quiz_core::model::LevelRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT level, score, completed, last_question_index
            FROM level_records WHERE user_id = ?1
            ORDER BY level ASC
            ",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = BTreeMap::new();
        for row in rows {
            let (level, record) = level_record_from_row(&row)?;
            records.insert(level, record);
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn fetch_profile(&self, id: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, avatar_url, current_level, total_score, quiz_completed, created_at, last_completed_at
            FROM profiles WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => {
                let levels = self.level_records_for(id).await?;
                profile_from_row(&row, levels).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn create_profile(&self, profile: &Profile) -> Result<Profile, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
            INSERT INTO profiles (id, username, avatar_url, current_level, total_score, quiz_completed, created_at, last_completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(profile.id().to_string())
        .bind(profile.username().to_string())
        .bind(profile.avatar_url().map(ToString::to_string))
        .bind(i64::from(profile.current_level()))
        .bind(i64::from(profile.total_score()))
        .bind(i64::from(profile.quiz_completed()))
        .bind(profile.created_at())
        .bind(profile.last_completed_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            // Lost a creation race: resolve by re-fetching the winner.
            drop(tx);
            return self
                .fetch_profile(profile.id())
                .await?
                .ok_or(StorageError::Conflict);
        }

        for (level, record) in profile.completed_levels() {
            sqlx::query(
                r"
                INSERT INTO level_records (user_id, level, score, completed, last_question_index)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(profile.id().to_string())
            .bind(i64::from(*level))
            .bind(i64::from(record.score()))
            .bind(i64::from(record.is_completed()))
            .bind(i64::from(record.last_question_index()))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(profile.clone())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO profiles (id, username, avatar_url, current_level, total_score, quiz_completed, created_at, last_completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                avatar_url = excluded.avatar_url,
                current_level = excluded.current_level,
                total_score = excluded.total_score,
                quiz_completed = excluded.quiz_completed,
                last_completed_at = excluded.last_completed_at
            ",
        )
        .bind(profile.id().to_string())
        .bind(profile.username().to_string())
        .bind(profile.avatar_url().map(ToString::to_string))
        .bind(i64::from(profile.current_level()))
        .bind(i64::from(profile.total_score()))
        .bind(i64::from(profile.quiz_completed()))
        .bind(profile.created_at())
        .bind(profile.last_completed_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (level, record) in profile.completed_levels() {
            sqlx::query(
                r"
                INSERT INTO level_records (user_id, level, score, completed, last_question_index)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, level) DO UPDATE SET
                    score = excluded.score,
                    completed = excluded.completed,
                    last_question_index = excluded.last_question_index
                ",
            )
            .bind(profile.id().to_string())
            .bind(i64::from(*level))
            .bind(i64::from(record.score()))
            .bind(i64::from(record.is_completed()))
            .bind(i64::from(record.last_question_index()))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn update_details(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile, StorageError> {
        let res = sqlx::query(
            r"
            UPDATE profiles SET
                username = COALESCE(?2, username),
                avatar_url = COALESCE(?3, avatar_url)
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .bind(update.username)
        .bind(update.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.fetch_profile(id).await?.ok_or(StorageError::NotFound)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let profile_rows = sqlx::query(
            r"
            SELECT id, username, avatar_url, current_level, total_score, quiz_completed, created_at, last_completed_at
            FROM profiles
            ORDER BY total_score DESC, last_completed_at IS NULL, last_completed_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let level_rows = sqlx::query(
            r"
            SELECT user_id, level, score, completed, last_question_index
            FROM level_records
            ORDER BY user_id, level ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut levels_by_user: HashMap<String, BTreeMap<u32, quiz_core::model::LevelRecord>> =
            HashMap::new();
        for row in level_rows {
            let user_id = row.try_get::<String, _>("user_id").map_err(ser)?;
            let (level, record) = level_record_from_row(&row)?;
            levels_by_user.entry(user_id).or_default().insert(level, record);
        }

        let mut profiles = Vec::with_capacity(profile_rows.len());
        for row in profile_rows {
            let id = row.try_get::<String, _>("id").map_err(ser)?;
            let levels = levels_by_user.remove(&id).unwrap_or_default();
            profiles.push(profile_from_row(&row, levels)?);
        }
        Ok(profiles)
    }
}
