//! Validate-and-normalize for candidate task payloads.
//!
//! Single source of truth for field constraints: both the create and the
//! update path run through here, so the two can never diverge in what
//! they accept. Every violated constraint is reported, not just the
//! first.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Violation;
use crate::tasks::model::{
    Attachment, Category, Difficulty, EffortLevel, Priority, Recurrence, Status, Task, TaskNote,
    TimeSlot,
};

pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;

/// A candidate payload: partial or full. Enum-valued fields arrive as raw
/// strings so unknown values become field violations rather than body
/// rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    /// Accepted for wire compatibility but never trusted: `completed` is
    /// derived from `status` during reconciliation.
    pub completed: Option<bool>,
    pub completion_percentage: Option<i64>,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub reminder: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurrence_pattern: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub difficulty: Option<String>,
    pub energy_level: Option<String>,
    pub focus_required: Option<String>,
    pub ai_priority_score: Option<i64>,
    pub attachments: Option<Vec<Attachment>>,
    pub notes: Option<Vec<TaskNote>>,
    pub time_slots: Option<Vec<TimeSlot>>,
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight
/// UTC). Returns the normalized RFC 3339 form.
pub fn parse_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0)?.and_utc();
        return Some(dt.to_rfc3339());
    }
    None
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Build a new task from a candidate payload, or report every violated
/// constraint. Owner is fixed here and never reassigned.
pub fn normalize_new(payload: &TaskPayload, user_id: &str) -> Result<Task, Vec<Violation>> {
    let now = now_rfc3339();
    let mut task = Task {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: String::new(),
        description: None,
        category: Category::default(),
        priority: Priority::default(),
        status: Status::default(),
        completed: false,
        completion_date: None,
        completion_percentage: 0,
        due_date: String::new(),
        start_date: None,
        estimated_hours: 1.0,
        actual_hours: 0.0,
        reminder: None,
        is_recurring: false,
        recurrence_pattern: Recurrence::default(),
        tags: Vec::new(),
        project: None,
        dependencies: Vec::new(),
        difficulty: Difficulty::default(),
        energy_level: EffortLevel::default(),
        focus_required: EffortLevel::default(),
        ai_priority_score: 50,
        attachments: Vec::new(),
        notes: Vec::new(),
        time_slots: Vec::new(),
        created_at: now.clone(),
        updated_at: now.clone(),
        last_viewed: now,
        is_deleted: false,
    };

    let mut violations = Vec::new();
    apply_fields(payload, &mut task, &mut violations);

    if task.title.is_empty() && !has_violation(&violations, "title") {
        violations.push(Violation::new("title", "Task title is required"));
    }
    if task.due_date.is_empty() && !has_violation(&violations, "dueDate") {
        violations.push(Violation::new("dueDate", "Due date is required"));
    }

    if !violations.is_empty() {
        return Err(violations);
    }
    reconcile_completion(&mut task);
    Ok(task)
}

/// Merge a candidate payload onto an existing task, or report every
/// violated constraint. Refreshes `updatedAt` on success.
pub fn apply_update(task: &mut Task, payload: &TaskPayload) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    apply_fields(payload, task, &mut violations);
    if !violations.is_empty() {
        return Err(violations);
    }
    reconcile_completion(task);
    task.updated_at = now_rfc3339();
    Ok(())
}

/// The completed/status invariant, enforced on every mutation path:
/// `status` is the source of truth, `completed` is derived. The first
/// transition into `completed` stamps the completion date.
pub fn reconcile_completion(task: &mut Task) {
    task.completed = task.status == Status::Completed;
    if task.completed && task.completion_date.is_none() {
        task.completion_date = Some(now_rfc3339());
    }
}

fn has_violation(violations: &[Violation], field: &str) -> bool {
    violations.iter().any(|v| v.field == field)
}

fn apply_fields(payload: &TaskPayload, task: &mut Task, violations: &mut Vec<Violation>) {
    if let Some(title) = &payload.title {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            violations.push(Violation::new("title", "Task title is required"));
        } else if trimmed.chars().count() > TITLE_MAX {
            violations.push(Violation::new(
                "title",
                format!("Title cannot exceed {TITLE_MAX} characters"),
            ));
        } else {
            task.title = trimmed.to_string();
        }
    }

    if let Some(description) = &payload.description {
        let trimmed = description.trim();
        if trimmed.chars().count() > DESCRIPTION_MAX {
            violations.push(Violation::new(
                "description",
                format!("Description cannot exceed {DESCRIPTION_MAX} characters"),
            ));
        } else if trimmed.is_empty() {
            task.description = None;
        } else {
            task.description = Some(trimmed.to_string());
        }
    }

    apply_enum(&payload.category, "category", &mut task.category, violations);
    apply_enum(&payload.priority, "priority", &mut task.priority, violations);
    apply_enum(&payload.status, "status", &mut task.status, violations);
    apply_enum(
        &payload.recurrence_pattern,
        "recurrencePattern",
        &mut task.recurrence_pattern,
        violations,
    );
    apply_enum(&payload.difficulty, "difficulty", &mut task.difficulty, violations);
    apply_enum(
        &payload.energy_level,
        "energyLevel",
        &mut task.energy_level,
        violations,
    );
    apply_enum(
        &payload.focus_required,
        "focusRequired",
        &mut task.focus_required,
        violations,
    );

    apply_date(&payload.due_date, "dueDate", violations, |v| task.due_date = v);
    apply_date(&payload.start_date, "startDate", violations, |v| {
        task.start_date = Some(v)
    });
    apply_date(&payload.reminder, "reminder", violations, |v| {
        task.reminder = Some(v)
    });

    if let Some(hours) = payload.estimated_hours {
        if !(0.0..=100.0).contains(&hours) {
            violations.push(Violation::new(
                "estimatedHours",
                "Estimated hours must be between 0 and 100",
            ));
        } else {
            task.estimated_hours = hours;
        }
    }
    if let Some(hours) = payload.actual_hours {
        if hours < 0.0 {
            violations.push(Violation::new("actualHours", "Actual hours cannot be negative"));
        } else {
            task.actual_hours = hours;
        }
    }
    if let Some(pct) = payload.completion_percentage {
        if !(0..=100).contains(&pct) {
            violations.push(Violation::new(
                "completionPercentage",
                "Completion percentage must be between 0 and 100",
            ));
        } else {
            task.completion_percentage = pct;
        }
    }
    if let Some(score) = payload.ai_priority_score {
        if !(0..=100).contains(&score) {
            violations.push(Violation::new(
                "aiPriorityScore",
                "AI priority score must be between 0 and 100",
            ));
        } else {
            task.ai_priority_score = score;
        }
    }

    if let Some(recurring) = payload.is_recurring {
        task.is_recurring = recurring;
    }

    if let Some(tags) = &payload.tags {
        task.tags = tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
    }

    if let Some(project) = &payload.project {
        let trimmed = project.trim();
        task.project = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    if let Some(deps) = &payload.dependencies {
        task.dependencies = deps.clone();
    }

    if let Some(attachments) = &payload.attachments {
        task.attachments = attachments
            .iter()
            .cloned()
            .map(|mut a| {
                a.uploaded_at.get_or_insert_with(now_rfc3339);
                a
            })
            .collect();
    }
    if let Some(notes) = &payload.notes {
        task.notes = notes
            .iter()
            .cloned()
            .map(|mut n| {
                n.created_at.get_or_insert_with(now_rfc3339);
                n
            })
            .collect();
    }
    if let Some(slots) = &payload.time_slots {
        task.time_slots = slots.clone();
    }
}

fn apply_enum<T: std::str::FromStr>(
    raw: &Option<String>,
    field: &str,
    target: &mut T,
    violations: &mut Vec<Violation>,
) {
    if let Some(raw) = raw {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => violations.push(Violation::new(
                field,
                format!("{raw:?} is not an allowed value for {field}"),
            )),
        }
    }
}

fn apply_date(
    raw: &Option<String>,
    field: &str,
    violations: &mut Vec<Violation>,
    mut set: impl FnMut(String),
) {
    if let Some(raw) = raw {
        match parse_datetime(raw) {
            Some(normalized) => set(normalized),
            None => violations.push(Violation::new(
                field,
                format!("{field} must be an RFC 3339 timestamp or YYYY-MM-DD date"),
            )),
        }
    }
}
