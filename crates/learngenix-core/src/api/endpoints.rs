//! Endpoint paths, relative to `ApiConfig::base_url`.

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_ME: &str = "/auth/me";
pub const AUTH_RESEND_CONFIRMATION: &str = "/auth/resend-confirmation";

pub const EXERCISES: &str = "/exercises";
pub const EXERCISES_NEXT: &str = "/exercises/next";
pub const EXERCISES_SUBMIT: &str = "/exercises/submit";

pub const PROGRESS: &str = "/progress";
pub const PROGRESS_SUBMIT: &str = "/progress/submit";

pub const DASHBOARD_SUMMARY: &str = "/dashboard/summary";
pub const SUBJECTS: &str = "/dashboard/subjects";
pub const TOPICS: &str = "/dashboard/topics";
pub const ACHIEVEMENTS: &str = "/dashboard/achievements";

pub fn exercise(id: &str) -> String {
    format!("{}/{}", EXERCISES, id)
}

pub fn subject(id: &str) -> String {
    format!("{}/{}", SUBJECTS, id)
}

pub fn topic(id: &str) -> String {
    format!("{}/{}", TOPICS, id)
}
