mod ids;
mod level;
mod profile;

pub use ids::{ParseIdError, UserId};
pub use level::{LevelRecord, LevelState};
pub use profile::{Profile, ProfileError, ProgressRejection};
