use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Opaque task identifier. New keys are UUID v4 strings, but any string
/// already present in a stored blob is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Alta,
    #[serde(rename = "Média")]
    Media,
    Baixa,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Alta => "Alta",
            Priority::Media => "Média",
            Priority::Baixa => "Baixa",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Priority::Alta => Priority::Media,
            Priority::Media => Priority::Baixa,
            Priority::Baixa => Priority::Alta,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Priority::Alta => Priority::Baixa,
            Priority::Media => Priority::Alta,
            Priority::Baixa => Priority::Media,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0:?}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alta" | "high" => Ok(Priority::Alta),
            "média" | "media" | "medium" => Ok(Priority::Media),
            "baixa" | "low" => Ok(Priority::Baixa),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// Lenient reader for stored priorities: anything that does not name a
/// known priority loads as `None`.
mod priority_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Priority;

    pub fn serialize<S>(value: &Option<Priority>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Validated field values coming out of the input form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub key: TaskKey,
    #[serde(rename = "value")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, with = "priority_serde")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub postponement_history: Vec<DateTime<Utc>>,
}

impl Task {
    pub fn new(draft: TaskDraft) -> Self {
        Self {
            key: TaskKey::mint(),
            title: draft.title,
            description: draft.description,
            priority: Some(draft.priority),
            deadline: Some(draft.deadline),
            completed: false,
            postponement_history: Vec::new(),
        }
    }

    /// Copy with the editable fields replaced; completion and history stay.
    pub fn with_draft(&self, draft: &TaskDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: Some(draft.priority),
            deadline: Some(draft.deadline),
            ..self.clone()
        }
    }

    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }

    /// Copy pushed back by one day, counting from `now` when there was no
    /// deadline, with `now` recorded in the history.
    pub fn postponed(&self, now: DateTime<Utc>) -> Self {
        let base = self.deadline.unwrap_or(now);
        let deadline = base.checked_add_signed(Duration::days(1)).unwrap_or(base);
        let mut postponement_history = self.postponement_history.clone();
        postponement_history.push(now);
        Self {
            deadline: Some(deadline),
            postponement_history,
            ..self.clone()
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.deadline.is_some_and(|d| d < now)
    }

    pub fn is_postponed(&self) -> bool {
        !self.postponement_history.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        !self.completed && self.postponement_history.is_empty()
    }
}
