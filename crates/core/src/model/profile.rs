use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{LevelRecord, LevelState, UserId};
use crate::scoring::{self, QuizRules};

pub(crate) const DEFAULT_USERNAME: &str = "User";
const FIRST_LEVEL: u32 = 1;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Consistency errors while rehydrating a profile from storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("current_level must be at least 1, got {level}")]
    CurrentLevelBelowFirst { level: u32 },

    #[error("level key must be at least 1, got {level}")]
    LevelKeyBelowFirst { level: u32 },

    #[error("total_score {stored} does not match completed-level sum {computed}")]
    ScoreMismatch { stored: u32, computed: u32 },
}

/// Expected, non-error reasons for refusing a progress submission.
///
/// These model replays and stale clients; callers branch on them instead of
/// treating them as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressRejection {
    /// The whole quiz is already finished; the profile is frozen.
    QuizAlreadyCompleted,
    /// The targeted level already has a sticky completed record. Echoes the
    /// stored score so the caller can display it.
    LevelAlreadyCompleted { score: u32 },
    /// The level number is outside the playable range.
    LevelOutOfRange { level: u32 },
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

/// A user's persisted quiz progress.
///
/// Mutation goes exclusively through the transition methods, which keep the
/// invariants: `current_level` never decreases, completed level records are
/// never overwritten, `total_score` is always the clamped sum over completed
/// levels, and a `quiz_completed` profile accepts no further progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: UserId,
    username: String,
    avatar_url: Option<String>,
    current_level: u32,
    total_score: u32,
    completed_levels: BTreeMap<u32, LevelRecord>,
    quiz_completed: bool,
    created_at: DateTime<Utc>,
    last_completed_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Creates a fresh profile with zeroed defaults, as provisioned on first
    /// contact.
    #[must_use]
    pub fn new(id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: DEFAULT_USERNAME.to_string(),
            avatar_url: None,
            current_level: FIRST_LEVEL,
            total_score: 0,
            completed_levels: BTreeMap::new(),
            quiz_completed: false,
            created_at: now,
            last_completed_at: None,
        }
    }

    /// Rehydrates a profile from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the stored fields are internally
    /// inconsistent: a level below 1, or a `total_score` that does not equal
    /// the sum over completed level records.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: UserId,
        username: String,
        avatar_url: Option<String>,
        current_level: u32,
        total_score: u32,
        completed_levels: BTreeMap<u32, LevelRecord>,
        quiz_completed: bool,
        created_at: DateTime<Utc>,
        last_completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProfileError> {
        if current_level < FIRST_LEVEL {
            return Err(ProfileError::CurrentLevelBelowFirst {
                level: current_level,
            });
        }
        if let Some(level) = completed_levels.keys().find(|level| **level < FIRST_LEVEL) {
            return Err(ProfileError::LevelKeyBelowFirst { level: *level });
        }

        let computed: u32 = completed_levels
            .values()
            .filter(|record| record.is_completed())
            .map(LevelRecord::score)
            .sum();
        if computed != total_score {
            return Err(ProfileError::ScoreMismatch {
                stored: total_score,
                computed,
            });
        }

        Ok(Self {
            id,
            username,
            avatar_url,
            current_level,
            total_score,
            completed_levels,
            quiz_completed,
            created_at,
            last_completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    #[must_use]
    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn completed_levels(&self) -> &BTreeMap<u32, LevelRecord> {
        &self.completed_levels
    }

    #[must_use]
    pub fn quiz_completed(&self) -> bool {
        self.quiz_completed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.last_completed_at
    }

    /// Stored record for a level, if any submission has touched it.
    #[must_use]
    pub fn level_record(&self, level: u32) -> Option<&LevelRecord> {
        self.completed_levels.get(&level)
    }

    /// Lifecycle state of a level for this profile.
    #[must_use]
    pub fn level_state(&self, level: u32) -> LevelState {
        LevelState::of(self.completed_levels.get(&level))
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Applies a level-completion submission.
    ///
    /// On acceptance the level gets a sticky completed record with the
    /// standardized score, `total_score` is recomputed as the clamped sum
    /// over completed levels, `current_level` advances to at least
    /// `level + 1`, and completing the final level freezes the profile.
    ///
    /// # Errors
    ///
    /// Returns `ProgressRejection` for replays (level or quiz already
    /// completed) and out-of-range level numbers. Rejections leave the
    /// profile untouched.
    pub fn complete_level(
        &mut self,
        level: u32,
        raw_correct: u32,
        total_questions: u32,
        rules: &QuizRules,
        now: DateTime<Utc>,
    ) -> Result<&LevelRecord, ProgressRejection> {
        self.guard_submission(level, rules)?;

        let score = scoring::standardize(raw_correct, total_questions, rules);
        // The resume index points past the end once the level is done.
        self.completed_levels.insert(
            level,
            LevelRecord::from_persisted(score, true, total_questions),
        );
        self.total_score = scoring::total_score(&self.completed_levels, rules);
        self.current_level = self.current_level.max(level + 1);
        if rules.is_final_level(level) {
            self.quiz_completed = true;
        }
        self.last_completed_at = Some(now);

        Ok(&self.completed_levels[&level])
    }

    /// Records a resume checkpoint for a level that is still being played.
    ///
    /// The record stores the raw running correct count and the caller's
    /// current question index; `total_score`, `current_level`, and
    /// `last_completed_at` are untouched.
    ///
    /// # Errors
    ///
    /// Same guard sequence as [`Profile::complete_level`].
    pub fn record_in_progress(
        &mut self,
        level: u32,
        question_index: u32,
        running_correct: u32,
        rules: &QuizRules,
    ) -> Result<&LevelRecord, ProgressRejection> {
        self.guard_submission(level, rules)?;

        self.completed_levels
            .insert(level, LevelRecord::in_progress(running_correct, question_index));
        Ok(&self.completed_levels[&level])
    }

    /// Updates display details. Independent of progress state; allowed even
    /// after the quiz is completed.
    pub fn update_details(&mut self, username: Option<String>, avatar_url: Option<String>) {
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(avatar_url) = avatar_url {
            self.avatar_url = Some(avatar_url);
        }
    }

    fn guard_submission(&self, level: u32, rules: &QuizRules) -> Result<(), ProgressRejection> {
        if self.quiz_completed {
            return Err(ProgressRejection::QuizAlreadyCompleted);
        }
        if !rules.level_in_range(level) {
            return Err(ProgressRejection::LevelOutOfRange { level });
        }
        if let Some(record) = self.completed_levels.get(&level) {
            if record.is_completed() {
                return Err(ProgressRejection::LevelAlreadyCompleted {
                    score: record.score(),
                });
            }
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn new_profile() -> Profile {
        Profile::new(UserId::random(), fixed_now())
    }

    #[test]
    fn fresh_profile_has_zeroed_defaults() {
        let profile = new_profile();
        assert_eq!(profile.current_level(), 1);
        assert_eq!(profile.total_score(), 0);
        assert!(profile.completed_levels().is_empty());
        assert!(!profile.quiz_completed());
        assert_eq!(profile.last_completed_at(), None);
        assert_eq!(profile.username(), "User");
    }

    #[test]
    fn completing_a_level_advances_and_scores() {
        let rules = QuizRules::default();
        let mut profile = new_profile();

        let record = profile
            .complete_level(1, 7, 10, &rules, fixed_now())
            .unwrap();
        assert_eq!(record.score(), 7);
        assert!(record.is_completed());

        assert_eq!(profile.total_score(), 7);
        assert_eq!(profile.current_level(), 2);
        assert!(!profile.quiz_completed());
        assert_eq!(profile.last_completed_at(), Some(fixed_now()));
    }

    #[test]
    fn completed_level_is_sticky() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        profile.complete_level(1, 7, 10, &rules, fixed_now()).unwrap();

        // A replay with a better raw score must not improve the record.
        let rejection = profile
            .complete_level(1, 10, 10, &rules, fixed_now())
            .unwrap_err();
        assert_eq!(
            rejection,
            ProgressRejection::LevelAlreadyCompleted { score: 7 }
        );
        assert_eq!(profile.level_record(1).unwrap().score(), 7);
        assert_eq!(profile.total_score(), 7);
    }

    #[test]
    fn out_of_order_completion_does_not_regress_current_level() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        profile.complete_level(3, 8, 10, &rules, fixed_now()).unwrap();
        assert_eq!(profile.current_level(), 4);

        profile.complete_level(1, 5, 10, &rules, fixed_now()).unwrap();
        assert_eq!(profile.current_level(), 4);
        assert_eq!(profile.total_score(), 13);
    }

    #[test]
    fn final_level_freezes_the_profile() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        for level in 1..=5 {
            profile
                .complete_level(level, 10, 10, &rules, fixed_now())
                .unwrap();
        }

        assert!(profile.quiz_completed());
        assert_eq!(profile.total_score(), 50);
        assert_eq!(profile.current_level(), 6);

        let rejection = profile
            .complete_level(2, 10, 10, &rules, fixed_now())
            .unwrap_err();
        assert_eq!(rejection, ProgressRejection::QuizAlreadyCompleted);

        let rejection = profile
            .record_in_progress(2, 3, 2, &rules)
            .unwrap_err();
        assert_eq!(rejection, ProgressRejection::QuizAlreadyCompleted);
    }

    #[test]
    fn mixed_scores_accumulate_per_scenario() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        for (level, correct) in [(1, 10), (2, 5), (3, 10), (4, 5), (5, 10)] {
            profile
                .complete_level(level, correct, 10, &rules, fixed_now())
                .unwrap();
        }
        assert_eq!(profile.total_score(), 40);
        assert!(profile.quiz_completed());
    }

    #[test]
    fn level_out_of_range_is_rejected() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        let rejection = profile
            .complete_level(6, 10, 10, &rules, fixed_now())
            .unwrap_err();
        assert_eq!(rejection, ProgressRejection::LevelOutOfRange { level: 6 });

        let rejection = profile
            .complete_level(0, 10, 10, &rules, fixed_now())
            .unwrap_err();
        assert_eq!(rejection, ProgressRejection::LevelOutOfRange { level: 0 });
    }

    #[test]
    fn in_progress_checkpoint_leaves_totals_alone() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        profile.record_in_progress(1, 4, 3, &rules).unwrap();

        assert_eq!(profile.level_state(1), LevelState::InProgress);
        assert_eq!(profile.total_score(), 0);
        assert_eq!(profile.current_level(), 1);
        assert_eq!(profile.last_completed_at(), None);

        let record = profile.level_record(1).unwrap();
        assert_eq!(record.last_question_index(), 4);
        assert_eq!(record.score(), 3);
    }

    #[test]
    fn in_progress_checkpoint_then_completion() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        profile.record_in_progress(1, 4, 3, &rules).unwrap();
        profile.complete_level(1, 6, 10, &rules, fixed_now()).unwrap();

        assert_eq!(profile.level_state(1), LevelState::Completed);
        assert_eq!(profile.total_score(), 6);

        let rejection = profile.record_in_progress(1, 2, 1, &rules).unwrap_err();
        assert_eq!(
            rejection,
            ProgressRejection::LevelAlreadyCompleted { score: 6 }
        );
    }

    #[test]
    fn from_persisted_rejects_score_mismatch() {
        let mut levels = BTreeMap::new();
        levels.insert(1, LevelRecord::completed(7));

        let err = Profile::from_persisted(
            UserId::random(),
            "User".into(),
            None,
            2,
            9,
            levels,
            false,
            fixed_now(),
            Some(fixed_now()),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ProfileError::ScoreMismatch {
                stored: 9,
                computed: 7
            }
        );
    }

    #[test]
    fn from_persisted_ignores_in_progress_scores_in_total() {
        let mut levels = BTreeMap::new();
        levels.insert(1, LevelRecord::completed(7));
        levels.insert(2, LevelRecord::in_progress(4, 6));

        let profile = Profile::from_persisted(
            UserId::random(),
            "User".into(),
            None,
            2,
            7,
            levels,
            false,
            fixed_now(),
            Some(fixed_now()),
        )
        .unwrap();
        assert_eq!(profile.total_score(), 7);
    }

    #[test]
    fn update_details_is_allowed_after_completion() {
        let rules = QuizRules::default();
        let mut profile = new_profile();
        for level in 1..=5 {
            profile
                .complete_level(level, 10, 10, &rules, fixed_now())
                .unwrap();
        }

        profile.update_details(Some("bubbles".into()), Some("https://a/b.png".into()));
        assert_eq!(profile.username(), "bubbles");
        assert_eq!(profile.avatar_url(), Some("https://a/b.png"));
        assert_eq!(profile.total_score(), 50);
    }
}
