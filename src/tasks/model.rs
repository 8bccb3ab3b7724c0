//! Canonical task shape and the closed enums it is built from.
//!
//! Wire format is camelCase JSON, matching the service's original API.
//! Persisted rows keep enums as their lowercase wire strings and the
//! nested collections as JSON TEXT columns ([`TaskRow`]).

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! closed_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }, default $default:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub const ALL: &'static [&'static str] = &[$($wire),+];
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(anyhow!(
                        "unknown {} value: {other:?} (expected one of {:?})",
                        stringify!($name),
                        Self::ALL
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
}, default Medium);

closed_enum!(Status {
    Todo => "todo",
    InProgress => "in-progress",
    Completed => "completed",
    Cancelled => "cancelled",
}, default Todo);

closed_enum!(Category {
    Work => "work",
    Personal => "personal",
    Study => "study",
    Health => "health",
    Shopping => "shopping",
    Finance => "finance",
    Other => "other",
}, default Personal);

closed_enum!(Difficulty {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
    Expert => "expert",
}, default Medium);

/// Shared low/medium/high scale for energy level and focus required.
closed_enum!(EffortLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
}, default Medium);

closed_enum!(Recurrence {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
    None => "none",
}, default None);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNote {
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// The canonical task record. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Owner — fixed at creation, never reassigned.
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    /// Derived: true iff `status == completed`. Never set independently.
    pub completed: bool,
    /// Set on the first transition into `completed`.
    pub completion_date: Option<String>,
    pub completion_percentage: i64,
    pub due_date: String,
    pub start_date: Option<String>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub reminder: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: Recurrence,
    pub tags: Vec<String>,
    pub project: Option<String>,
    /// Soft references to other task ids. Not checked for existence and
    /// not cleaned up when the target is deleted.
    pub dependencies: Vec<String>,
    pub difficulty: Difficulty,
    pub energy_level: EffortLevel,
    pub focus_required: EffortLevel,
    /// Populated by an external scoring service, not computed here.
    pub ai_priority_score: i64,
    pub attachments: Vec<Attachment>,
    pub notes: Vec<TaskNote>,
    pub time_slots: Vec<TimeSlot>,
    pub created_at: String,
    pub updated_at: String,
    pub last_viewed: String,
    /// Modeled but never consulted by any query; deletes are hard.
    pub is_deleted: bool,
}

/// Persisted shape: enums as text, collections as JSON strings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub completed: bool,
    pub completion_date: Option<String>,
    pub completion_percentage: i64,
    pub due_date: String,
    pub start_date: Option<String>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub reminder: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: String,
    pub tags: String,
    pub project: Option<String>,
    pub dependencies: String,
    pub difficulty: String,
    pub energy_level: String,
    pub focus_required: String,
    pub ai_priority_score: i64,
    pub attachments: String,
    pub notes: String,
    pub time_slots: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_viewed: String,
    pub is_deleted: bool,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(Task {
            category: row.category.parse()?,
            priority: row.priority.parse()?,
            status: row.status.parse()?,
            recurrence_pattern: row.recurrence_pattern.parse()?,
            difficulty: row.difficulty.parse()?,
            energy_level: row.energy_level.parse()?,
            focus_required: row.focus_required.parse()?,
            tags: serde_json::from_str(&row.tags)?,
            dependencies: serde_json::from_str(&row.dependencies)?,
            attachments: serde_json::from_str(&row.attachments)?,
            notes: serde_json::from_str(&row.notes)?,
            time_slots: serde_json::from_str(&row.time_slots)?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            completion_date: row.completion_date,
            completion_percentage: row.completion_percentage,
            due_date: row.due_date,
            start_date: row.start_date,
            estimated_hours: row.estimated_hours,
            actual_hours: row.actual_hours,
            reminder: row.reminder,
            is_recurring: row.is_recurring,
            project: row.project,
            ai_priority_score: row.ai_priority_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_viewed: row.last_viewed,
            is_deleted: row.is_deleted,
        })
    }
}
