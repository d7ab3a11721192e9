use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::UserIdentity;

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Aggregate counters for a user. The backend sends `{}` for users that have
/// never answered anything, so every field defaults to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct UserStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_exercises: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub completed_exercises: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub average_score: f64,
    /// Seconds
    #[serde(deserialize_with = "null_as_default")]
    pub total_time: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_points: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub current_streak: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub best_streak: u32,
    pub last_activity: Option<String>,
}

impl UserStats {
    /// Share of exercises completed, 0-100.
    pub fn completion_percent(&self) -> u32 {
        if self.total_exercises == 0 {
            return 0;
        }
        let pct = u64::from(self.completed_exercises) * 100 / u64::from(self.total_exercises);
        pct.min(100) as u32
    }

    /// Total practice time as `1h 05m` / `12m`.
    pub fn total_time_display(&self) -> String {
        let minutes = self.total_time / 60;
        if minutes >= 60 {
            format!("{}h {:02}m", minutes / 60, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

/// Overall and per-subject progress percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct ProgressOverview {
    pub general: u32,
    pub by_subject: BTreeMap<String, u32>,
}

/// An achievement the user has unlocked, as embedded in the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UnlockedAchievement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub unlocked_at: Option<String>,
}

/// One recently answered exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecentActivity {
    #[serde(default)]
    pub exercise_title: Option<String>,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub time_spent: Option<u64>,
}

/// Personalized dashboard data for the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardSummary {
    pub user: UserIdentity,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub progress: ProgressOverview,
    #[serde(default)]
    pub achievements: Vec<UnlockedAchievement>,
    #[serde(default)]
    pub recent_activity: Vec<RecentActivity>,
    /// Only sent for teachers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_exercises: Option<u32>,
}

impl DashboardSummary {
    /// Correct answers among the recent activity entries.
    pub fn recent_correct(&self) -> usize {
        self.recent_activity
            .iter()
            .filter(|a| a.is_correct == Some(true))
            .count()
    }
}
