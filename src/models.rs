// Data models for the to-do store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier assigned to a task at creation. Unique within a store, never reused.
pub type TaskId = i64;

/// A single to-do entry
///
/// Serialized with camelCase field names (`dueDate`, not `due_date`) so older
/// persisted blobs keep parsing. Absent optionals are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Travel,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Travel => "travel",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Category::Work),
            "personal" => Ok(Category::Personal),
            "travel" => Ok(Category::Travel),
            "other" => Ok(Category::Other),
            _ => Err(format!("unknown category: {}", s)),
        }
    }
}
