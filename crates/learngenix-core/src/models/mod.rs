//! Data models for LearnGenix entities.
//!
//! Every backend response has an explicit type here; a body that does not
//! match its type is rejected by the API client rather than read ad hoc.
//!
//! - `UserIdentity`, `Role`, `AuthResponse`: accounts and authentication
//! - `Exercise` and its create/update/submit bodies
//! - `Subject`, `Topic`, `Achievement`: catalog entries
//! - `DashboardSummary`: per-user stats, progress and recent activity
//! - `UserProgress`: recorded attempts

pub mod catalog;
pub mod dashboard;
pub mod exercise;
pub mod progress;
pub mod user;

pub use catalog::{topics_by_subject, Achievement, Subject, Topic};
pub use dashboard::{DashboardSummary, ProgressOverview, RecentActivity, UnlockedAchievement, UserStats};
pub use exercise::{Difficulty, Exercise, ExerciseType, ExerciseUpdate, NewExercise, SubmissionResult, SubmitAnswer};
pub use progress::{average_score, ProgressSubmission, UserProgress};
pub use user::{AuthResponse, ConfirmationResent, RegisterRequest, Role, UserIdentity};
