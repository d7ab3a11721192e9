use serde::{Deserialize, Serialize};

/// A recorded attempt at an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProgress {
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    #[serde(default)]
    pub score: f64,
    /// Seconds
    #[serde(default)]
    pub time_spent: Option<u64>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for recording an attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProgressSubmission {
    pub exercise_id: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub is_correct: bool,
}

/// Average score over a set of attempts, `None` when there are none.
pub fn average_score(progress: &[UserProgress]) -> Option<f64> {
    if progress.is_empty() {
        return None;
    }
    Some(progress.iter().map(|p| p.score).sum::<f64>() / progress.len() as f64)
}
