use quiz_core::QuizRules;
use quiz_core::model::{LevelState, Profile, UserId};
use quiz_core::time::fixed_now;
use storage::repository::{ProfileRepository, ProfileUpdate};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_persists_levels_and_totals() {
    let repo = connect("memdb_roundtrip").await;
    let rules = QuizRules::default();
    let id = UserId::random();

    let mut profile = Profile::new(id, fixed_now());
    profile
        .complete_level(1, 7, 10, &rules, fixed_now())
        .unwrap();
    profile.record_in_progress(2, 4, 3, &rules).unwrap();
    repo.upsert_profile(&profile).await.unwrap();

    let fetched = repo.fetch_profile(id).await.expect("fetch").unwrap();
    assert_eq!(fetched.total_score(), 7);
    assert_eq!(fetched.current_level(), 2);
    assert_eq!(fetched.level_state(1), LevelState::Completed);
    assert_eq!(fetched.level_state(2), LevelState::InProgress);
    assert_eq!(fetched.level_record(2).unwrap().last_question_index(), 4);
    assert_eq!(fetched.last_completed_at(), Some(fixed_now()));
}

#[tokio::test]
async fn sqlite_upsert_merges_level_records() {
    let repo = connect("memdb_merge").await;
    let rules = QuizRules::default();
    let id = UserId::random();

    let mut profile = Profile::new(id, fixed_now());
    profile
        .complete_level(1, 5, 10, &rules, fixed_now())
        .unwrap();
    repo.upsert_profile(&profile).await.unwrap();

    profile
        .complete_level(2, 9, 10, &rules, fixed_now())
        .unwrap();
    repo.upsert_profile(&profile).await.unwrap();

    let fetched = repo.fetch_profile(id).await.unwrap().unwrap();
    assert_eq!(fetched.completed_levels().len(), 2);
    assert_eq!(fetched.total_score(), 14);
}

#[tokio::test]
async fn sqlite_create_resolves_duplicate_by_refetch() {
    let repo = connect("memdb_create_race").await;
    let rules = QuizRules::default();
    let id = UserId::random();

    let mut winner = Profile::new(id, fixed_now());
    winner
        .complete_level(1, 8, 10, &rules, fixed_now())
        .unwrap();
    repo.create_profile(&winner).await.unwrap();

    let loser = Profile::new(id, fixed_now());
    let resolved = repo.create_profile(&loser).await.unwrap();
    assert_eq!(resolved.total_score(), 8);

    let stored = repo.fetch_profile(id).await.unwrap().unwrap();
    assert_eq!(stored.total_score(), 8);
}

#[tokio::test]
async fn sqlite_update_details_is_partial() {
    let repo = connect("memdb_details").await;
    let id = UserId::random();

    let mut profile = Profile::new(id, fixed_now());
    profile.update_details(None, Some("https://a/old.png".into()));
    repo.upsert_profile(&profile).await.unwrap();

    let updated = repo
        .update_details(
            id,
            ProfileUpdate {
                username: Some("grace".into()),
                avatar_url: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.username(), "grace");
    assert_eq!(updated.avatar_url(), Some("https://a/old.png"));

    let missing = repo
        .update_details(UserId::random(), ProfileUpdate::default())
        .await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn sqlite_lists_profiles_in_ranking_order() {
    let repo = connect("memdb_ranking").await;
    let rules = QuizRules::default();
    let now = fixed_now();

    // Low scorer, early finisher of a tie pair, late finisher, never played.
    let mut low = Profile::new(UserId::random(), now);
    low.complete_level(1, 3, 10, &rules, now).unwrap();

    let mut early = Profile::new(UserId::random(), now);
    early.complete_level(1, 9, 10, &rules, now).unwrap();

    let mut late = Profile::new(UserId::random(), now);
    late.complete_level(1, 9, 10, &rules, now + chrono::Duration::minutes(5))
        .unwrap();

    let idle = Profile::new(UserId::random(), now);

    for profile in [&low, &late, &early, &idle] {
        repo.upsert_profile(profile).await.unwrap();
    }

    let listed = repo.list_profiles().await.unwrap();
    let ids: Vec<_> = listed.iter().map(Profile::id).collect();
    assert_eq!(ids, vec![early.id(), late.id(), low.id(), idle.id()]);
}
