#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod leaderboard_service;
pub mod profile_service;
pub mod progress_service;

pub use quiz_core::{Clock, QuizRules};

pub use app_services::QuizServices;
pub use error::{
    LeaderboardError, ProfileServiceError, ProgressServiceError, QuizServicesError,
};
pub use leaderboard_service::LeaderboardService;
pub use profile_service::ProfileService;
pub use progress_service::{ProgressService, RejectReason, SubmissionOutcome};
