use std::sync::Arc;

use quiz_core::{Clock, QuizRules};
use storage::repository::Storage;

use crate::error::QuizServicesError;
use crate::leaderboard_service::LeaderboardService;
use crate::profile_service::ProfileService;
use crate::progress_service::ProgressService;

/// Assembles the caller-facing services over a shared profile store.
#[derive(Clone)]
pub struct QuizServices {
    progress: Arc<ProgressService>,
    leaderboard: Arc<LeaderboardService>,
    profile: Arc<ProfileService>,
}

impl QuizServices {
    /// Build services over an already-constructed storage backend.
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock, rules: QuizRules) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            rules,
            Arc::clone(&storage.profiles),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(Arc::clone(&storage.profiles)));
        let profile = Arc::new(ProfileService::new(Arc::clone(&storage.profiles)));

        Self {
            progress,
            leaderboard,
            profile,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        rules: QuizRules,
    ) -> Result<Self, QuizServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock, rules))
    }

    /// Build services over an in-memory store, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock, rules: QuizRules) -> Self {
        Self::new(&Storage::in_memory(), clock, rules)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn profile(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profile)
    }
}
