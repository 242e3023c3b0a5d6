use async_trait::async_trait;
use quiz_core::model::{Profile, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Partial update of a profile's display fields.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Repository contract for user profiles.
///
/// Absence is a distinguished outcome (`Ok(None)` from `fetch_profile`), not
/// an error; retry and backoff policy live with the caller, not here.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures. A missing
    /// profile is `Ok(None)`.
    async fn fetch_profile(&self, id: UserId) -> Result<Option<Profile>, StorageError>;

    /// Insert a profile if absent.
    ///
    /// Safe under concurrent callers for the same id: on a uniqueness
    /// conflict the existing record is re-fetched and returned, so the loser
    /// of a creation race observes the winner's profile instead of an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile can neither be stored nor
    /// re-fetched.
    async fn create_profile(&self, profile: &Profile) -> Result<Profile, StorageError>;

    /// Insert-or-update a profile and its level records in one write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Apply a partial update of display fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist, or
    /// other storage errors.
    async fn update_details(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile, StorageError>;

    /// Fetch all profiles for ranking.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn fetch_profile(&self, id: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<Profile, StorageError> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Losing the creation race returns the winner's record unchanged.
        Ok(guard
            .entry(profile.id())
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(profile.id(), profile.clone());
        Ok(())
    }

    async fn update_details(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile, StorageError> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let profile = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        profile.update_details(update.username, update.avatar_url);
        Ok(profile.clone())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

/// Aggregates the profile repository behind a trait object for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo);
        Self { profiles }
    }
}
