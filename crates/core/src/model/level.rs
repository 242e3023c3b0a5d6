use serde::{Deserialize, Serialize};

//
// ─── LEVEL STATE ───────────────────────────────────────────────────────────────
//

/// Lifecycle of a single level within a profile.
///
/// `Completed` is absorbing: once a level's record reaches it, no further
/// submission for that level changes the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    NotStarted,
    InProgress,
    Completed,
}

impl LevelState {
    /// Derives the state from an optional stored record.
    #[must_use]
    pub fn of(record: Option<&LevelRecord>) -> Self {
        match record {
            None => LevelState::NotStarted,
            Some(r) if r.is_completed() => LevelState::Completed,
            Some(_) => LevelState::InProgress,
        }
    }
}

//
// ─── LEVEL RECORD ──────────────────────────────────────────────────────────────
//

/// Persisted per-level progress.
///
/// While `completed` is false, `score` carries the raw running count of
/// correct answers and `last_question_index` the resume position. Once
/// `completed` flips true, `score` is the standardized level score and
/// `last_question_index` is no longer meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    score: u32,
    completed: bool,
    last_question_index: u32,
}

impl LevelRecord {
    /// Builds a non-terminal record for an interrupted level.
    #[must_use]
    pub fn in_progress(running_correct: u32, last_question_index: u32) -> Self {
        Self {
            score: running_correct,
            completed: false,
            last_question_index,
        }
    }

    /// Builds a terminal record with a standardized score.
    #[must_use]
    pub fn completed(score: u32) -> Self {
        Self {
            score,
            completed: true,
            last_question_index: 0,
        }
    }

    /// Rehydrates a record from storage without reinterpreting it.
    #[must_use]
    pub fn from_persisted(score: u32, completed: bool, last_question_index: u32) -> Self {
        Self {
            score,
            completed,
            last_question_index,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn last_question_index(&self) -> u32 {
        self.last_question_index
    }

    #[must_use]
    pub fn state(&self) -> LevelState {
        LevelState::of(Some(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_of_missing_record_is_not_started() {
        assert_eq!(LevelState::of(None), LevelState::NotStarted);
    }

    #[test]
    fn in_progress_record_keeps_resume_position() {
        let record = LevelRecord::in_progress(3, 5);
        assert_eq!(record.state(), LevelState::InProgress);
        assert_eq!(record.score(), 3);
        assert_eq!(record.last_question_index(), 5);
    }

    #[test]
    fn completed_record_is_terminal() {
        let record = LevelRecord::completed(8);
        assert_eq!(record.state(), LevelState::Completed);
        assert_eq!(record.score(), 8);
    }
}
