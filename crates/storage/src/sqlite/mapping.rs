use std::collections::BTreeMap;

use quiz_core::model::{LevelRecord, Profile, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_from_text(raw: &str) -> Result<UserId, StorageError> {
    raw.parse::<UserId>()
        .map_err(|_| StorageError::Serialization(format!("invalid user id: {raw}")))
}

pub(crate) fn u32_from_i64(raw: i64, field: &str) -> Result<u32, StorageError> {
    u32::try_from(raw).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

/// Decodes one `level_records` row into its level number and record.
pub(crate) fn level_record_from_row(row: &SqliteRow) -> Result<(u32, LevelRecord), StorageError> {
    let level = u32_from_i64(row.try_get::<i64, _>("level").map_err(ser)?, "level")?;
    let score = u32_from_i64(row.try_get::<i64, _>("score").map_err(ser)?, "score")?;
    let completed = row.try_get::<i64, _>("completed").map_err(ser)? != 0;
    let last_question_index = u32_from_i64(
        row.try_get::<i64, _>("last_question_index").map_err(ser)?,
        "last_question_index",
    )?;

    Ok((
        level,
        LevelRecord::from_persisted(score, completed, last_question_index),
    ))
}

/// Rebuilds a domain `Profile` from its row and its level records.
pub(crate) fn profile_from_row(
    row: &SqliteRow,
    completed_levels: BTreeMap<u32, LevelRecord>,
) -> Result<Profile, StorageError> {
    let id = user_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let username = row.try_get::<String, _>("username").map_err(ser)?;
    let avatar_url = row.try_get::<Option<String>, _>("avatar_url").map_err(ser)?;
    let current_level = u32_from_i64(
        row.try_get::<i64, _>("current_level").map_err(ser)?,
        "current_level",
    )?;
    let total_score = u32_from_i64(
        row.try_get::<i64, _>("total_score").map_err(ser)?,
        "total_score",
    )?;
    let quiz_completed = row.try_get::<i64, _>("quiz_completed").map_err(ser)? != 0;

    Profile::from_persisted(
        id,
        username,
        avatar_url,
        current_level,
        total_score,
        completed_levels,
        quiz_completed,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("last_completed_at").map_err(ser)?,
    )
    .map_err(|e| StorageError::Serialization(e.to_string()))
}
