use serde::{Deserialize, Serialize};

fn default_subject_color() -> Option<String> {
    Some("bg-blue-500".to_string())
}

/// A subject area (math, science, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub icon: String,
    #[serde(default = "default_subject_color")]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A topic inside a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Topic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Topic {
    pub fn belongs_to(&self, subject: &Subject) -> bool {
        self.subject_id.as_deref() == Some(subject.id.as_str())
    }
}

/// An achievement definition from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Group topics under the subject they belong to, keeping subject order.
/// Topics without a known subject are returned separately.
pub fn topics_by_subject<'a>(
    subjects: &'a [Subject],
    topics: &'a [Topic],
) -> (Vec<(&'a Subject, Vec<&'a Topic>)>, Vec<&'a Topic>) {
    let grouped: Vec<(&Subject, Vec<&Topic>)> = subjects
        .iter()
        .map(|s| (s, topics.iter().filter(|t| t.belongs_to(s)).collect()))
        .collect();

    let orphans = topics
        .iter()
        .filter(|t| !subjects.iter().any(|s| t.belongs_to(s)))
        .collect();

    (grouped, orphans)
}
