//! Formatting helpers for terminal output.

use learngenix_core::models::{Exercise, RecentActivity};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format a backend timestamp to a more readable date
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 {
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}

/// Seconds as `m:ss`
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// One line per recent activity entry
pub fn activity_line(activity: &RecentActivity) -> String {
    let mark = match activity.is_correct {
        Some(true) => "✓",
        Some(false) => "✗",
        None => "·",
    };
    let title = format_optional(&activity.exercise_title, "(untitled exercise)");
    let when = activity
        .completed_at
        .as_deref()
        .map(format_date)
        .unwrap_or_default();
    let score = activity.score.map(|s| format!("{:.0} pts", s)).unwrap_or_default();
    format!("{} {:<40} {:>8} {}", mark, truncate_string(&title, 40), score, when)
        .trim_end()
        .to_string()
}

/// Multi-line rendering of an exercise for practice
pub fn exercise_block(exercise: &Exercise) -> String {
    let mut lines = vec![
        format!(
            "{} [{} · {}]",
            exercise.title,
            exercise.kind.display_name(),
            exercise.difficulty
        ),
        String::new(),
        exercise.content.clone(),
    ];

    let choices = exercise.choices();
    if !choices.is_empty() {
        lines.push(String::new());
        lines.extend(choices.iter().map(|c| format!("  - {}", c)));
    }

    if let Some(limit) = exercise.time_limit.filter(|l| *l > 0) {
        lines.push(String::new());
        lines.push(format!("Time limit: {}", format_duration(limit as u64)));
    }

    lines.push(String::new());
    lines.push(format!("id: {}", exercise.id));
    lines.join("\n")
}
