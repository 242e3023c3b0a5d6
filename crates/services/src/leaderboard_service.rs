use std::cmp::Ordering;
use std::sync::Arc;

use quiz_core::model::{Profile, UserId};
use storage::repository::ProfileRepository;

use crate::error::LeaderboardError;

/// Comparator defining the leaderboard's total order: higher total score
/// first, ties broken by earlier `last_completed_at` (profiles that never
/// completed a level rank after those that have).
///
/// Profiles equal on both keys keep their store iteration order; the
/// ordering defines no further key for that case.
fn ranking_cmp(a: &Profile, b: &Profile) -> Ordering {
    b.total_score()
        .cmp(&a.total_score())
        .then_with(|| match (a.last_completed_at(), b.last_completed_at()) {
            (Some(a_at), Some(b_at)) => a_at.cmp(&b_at),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Derives the cross-user ranking from the profile store.
///
/// `rank_all` and `rank_of` share one comparator so a profile's rank always
/// matches its position in the ranked table.
#[derive(Clone)]
pub struct LeaderboardService {
    profiles: Arc<dyn ProfileRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    /// All profiles in ranking order.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if the store is unavailable.
    pub async fn rank_all(&self) -> Result<Vec<Profile>, LeaderboardError> {
        let mut profiles = self.profiles.list_profiles().await?;
        // Stable sort: full ties keep the store's order.
        profiles.sort_by(ranking_cmp);
        Ok(profiles)
    }

    /// The top `n` ranked profiles, for the leaderboard page.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if the store is unavailable.
    pub async fn top(&self, n: usize) -> Result<Vec<Profile>, LeaderboardError> {
        let mut ranked = self.rank_all().await?;
        ranked.truncate(n);
        Ok(ranked)
    }

    /// 1-based rank of `id` in the same ordering as [`Self::rank_all`], or 0
    /// if the user has no profile.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if the store is unavailable.
    pub async fn rank_of(&self, id: UserId) -> Result<u32, LeaderboardError> {
        let ranked = self.rank_all().await?;
        let position = ranked.iter().position(|profile| profile.id() == id);
        Ok(position.map_or(0, |index| u32::try_from(index + 1).unwrap_or(u32::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::QuizRules;
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn seed(repo: &InMemoryRepository, score_levels: &[(u32, u32)], minutes: i64) -> UserId {
        let rules = QuizRules::default();
        let at = fixed_now() + chrono::Duration::minutes(minutes);
        let mut profile = Profile::new(UserId::random(), fixed_now());
        for (level, correct) in score_levels {
            profile
                .complete_level(*level, *correct, 10, &rules, at)
                .unwrap();
        }
        repo.upsert_profile(&profile).await.unwrap();
        profile.id()
    }

    #[tokio::test]
    async fn orders_by_score_then_earlier_completion() {
        let repo = InMemoryRepository::new();
        let svc = LeaderboardService::new(Arc::new(repo.clone()));

        let low = seed(&repo, &[(1, 3)], 0).await;
        let tie_late = seed(&repo, &[(1, 9)], 10).await;
        let tie_early = seed(&repo, &[(1, 9)], 1).await;
        let high = seed(&repo, &[(1, 10), (2, 10)], 5).await;

        let ranked = svc.rank_all().await.unwrap();
        let ids: Vec<_> = ranked.iter().map(Profile::id).collect();
        assert_eq!(ids, vec![high, tie_early, tie_late, low]);
    }

    #[tokio::test]
    async fn rank_of_matches_rank_all_positions() {
        let repo = InMemoryRepository::new();
        let svc = LeaderboardService::new(Arc::new(repo.clone()));

        for minutes in 0..4 {
            seed(&repo, &[(1, minutes as u32 + 3)], minutes).await;
        }

        let ranked = svc.rank_all().await.unwrap();
        for (index, profile) in ranked.iter().enumerate() {
            let rank = svc.rank_of(profile.id()).await.unwrap();
            assert_eq!(rank, index as u32 + 1);
        }
    }

    #[tokio::test]
    async fn rank_of_missing_user_is_zero() {
        let repo = InMemoryRepository::new();
        let svc = LeaderboardService::new(Arc::new(repo.clone()));
        seed(&repo, &[(1, 5)], 0).await;

        assert_eq!(svc.rank_of(UserId::random()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn never_completed_profiles_rank_last_within_score() {
        let repo = InMemoryRepository::new();
        let svc = LeaderboardService::new(Arc::new(repo.clone()));

        let idle = Profile::new(UserId::random(), fixed_now());
        repo.upsert_profile(&idle).await.unwrap();

        // Completed a level but scored zero: same total as idle, ranks first.
        let zero = seed(&repo, &[(1, 0)], 0).await;

        let ranked = svc.rank_all().await.unwrap();
        let ids: Vec<_> = ranked.iter().map(Profile::id).collect();
        assert_eq!(ids, vec![zero, idle.id()]);
    }

    #[tokio::test]
    async fn top_truncates_the_ranking() {
        let repo = InMemoryRepository::new();
        let svc = LeaderboardService::new(Arc::new(repo.clone()));
        for minutes in 0..5 {
            seed(&repo, &[(1, 5)], minutes).await;
        }

        let top = svc.top(3).await.unwrap();
        assert_eq!(top.len(), 3);
        let all = svc.rank_all().await.unwrap();
        assert_eq!(&all[..3], &top[..]);
    }
}
