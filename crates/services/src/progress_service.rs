use std::sync::Arc;

use quiz_core::model::{Profile, ProgressRejection, UserId};
use quiz_core::{Clock, QuizRules};
use storage::repository::ProfileRepository;

use crate::error::ProgressServiceError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Why a submission was refused without touching the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The whole quiz is finished; the profile accepts no further progress.
    QuizAlreadyCompleted,
    /// The level already carries a sticky completed record; `score` echoes
    /// the stored value for display.
    LevelAlreadyCompleted { score: u32 },
    /// The level number is outside the playable range.
    LevelOutOfRange { level: u32 },
}

impl From<ProgressRejection> for RejectReason {
    fn from(rejection: ProgressRejection) -> Self {
        match rejection {
            ProgressRejection::QuizAlreadyCompleted => RejectReason::QuizAlreadyCompleted,
            ProgressRejection::LevelAlreadyCompleted { score } => {
                RejectReason::LevelAlreadyCompleted { score }
            }
            ProgressRejection::LevelOutOfRange { level } => {
                RejectReason::LevelOutOfRange { level }
            }
        }
    }
}

/// Result of a progress submission.
///
/// Rejections are expected and frequent (duplicate submissions, flaky-client
/// retries); callers branch on the variant rather than catching errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The write was applied; carries the profile as persisted.
    Accepted(Profile),
    /// The submission was stale; no write was performed.
    Rejected(RejectReason),
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted(_))
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Reconciles quiz-session outcomes into persisted profiles.
///
/// Each public call performs exactly one read-then-write cycle against the
/// profile store, with no internal retries: every accepted write is an
/// idempotent merge (completed levels are sticky, the total is recomputed as
/// a sum), so callers may retry a failed call verbatim without risk of
/// double-application.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    rules: QuizRules,
    profiles: Arc<dyn ProfileRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, rules: QuizRules, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self {
            clock,
            rules,
            profiles,
        }
    }

    #[must_use]
    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    /// Guarantees a profile exists for `id`, provisioning zeroed defaults on
    /// first contact.
    ///
    /// Idempotent and safe under concurrent callers: the adapter resolves a
    /// creation race by returning the winner's record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store is unavailable.
    pub async fn ensure_profile(&self, id: UserId) -> Result<Profile, ProgressServiceError> {
        if let Some(profile) = self.profiles.fetch_profile(id).await? {
            return Ok(profile);
        }

        let fresh = Profile::new(id, self.clock.now());
        let created = self.profiles.create_profile(&fresh).await?;
        if created != fresh {
            tracing::warn!(user_id = %id, "profile creation raced; adopted existing record");
        } else {
            tracing::debug!(user_id = %id, "provisioned profile");
        }
        Ok(created)
    }

    /// Applies a level-completion event `(level, raw_correct, total_questions)`.
    ///
    /// Replayed or stale events yield `Rejected` with the stored state
    /// untouched; an accepted event writes the merged profile via upsert.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` for transient store failures,
    /// on either the read or the write. The caller owns retry policy; a
    /// verbatim retry is safe.
    pub async fn record_level_completion(
        &self,
        id: UserId,
        level: u32,
        raw_correct: u32,
        total_questions: u32,
    ) -> Result<SubmissionOutcome, ProgressServiceError> {
        let mut profile = self.ensure_profile(id).await?;

        let now = self.clock.now();
        let result = profile
            .complete_level(level, raw_correct, total_questions, &self.rules, now)
            .map(quiz_core::model::LevelRecord::score);
        match result {
            Ok(score) => {
                tracing::debug!(
                    user_id = %id,
                    level,
                    score,
                    total = profile.total_score(),
                    quiz_completed = profile.quiz_completed(),
                    "level completion accepted"
                );
            }
            Err(rejection) => {
                tracing::debug!(user_id = %id, level, ?rejection, "level completion rejected");
                return Ok(SubmissionOutcome::Rejected(rejection.into()));
            }
        }

        self.profiles.upsert_profile(&profile).await?;
        Ok(SubmissionOutcome::Accepted(profile))
    }

    /// Records a resume checkpoint for a level still in progress.
    ///
    /// Never mutates the total score or the current level; repeated
    /// application simply re-asserts the caller's current position.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` for transient store failures.
    pub async fn record_in_progress(
        &self,
        id: UserId,
        level: u32,
        question_index: u32,
        running_correct: u32,
    ) -> Result<SubmissionOutcome, ProgressServiceError> {
        let mut profile = self.ensure_profile(id).await?;

        if let Err(rejection) =
            profile.record_in_progress(level, question_index, running_correct, &self.rules)
        {
            tracing::debug!(user_id = %id, level, ?rejection, "checkpoint rejected");
            return Ok(SubmissionOutcome::Rejected(rejection.into()));
        }

        self.profiles.upsert_profile(&profile).await?;
        Ok(SubmissionOutcome::Accepted(profile))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
