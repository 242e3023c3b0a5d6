use std::sync::Arc;

use quiz_core::model::{Profile, UserId};
use storage::repository::{ProfileRepository, ProfileUpdate, StorageError};

use crate::error::ProfileServiceError;

/// Read and edit of profile display details (username, avatar).
///
/// Detail edits are independent of quiz progress and stay available after
/// the quiz is completed.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    /// Fetch a profile for display.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::NotFound` if no profile exists for `id`.
    pub async fn get(&self, id: UserId) -> Result<Profile, ProfileServiceError> {
        self.profiles
            .fetch_profile(id)
            .await?
            .ok_or(ProfileServiceError::NotFound)
    }

    /// Apply a partial edit of display fields.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::NotFound` if no profile exists for `id`.
    pub async fn update_details(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile, ProfileServiceError> {
        match self.profiles.update_details(id, update).await {
            Ok(profile) => Ok(profile),
            Err(StorageError::NotFound) => Err(ProfileServiceError::NotFound),
            Err(err) => Err(err.into()),
        }
    }
}
