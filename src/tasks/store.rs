//! Task persistence: ownership-scoped queries, mutations, and the two
//! statistics reads.
//!
//! Every operation here carries `user_id` in its WHERE clause — a task
//! belonging to another owner is indistinguishable from one that does
//! not exist. Reads and writes share the Storage pool and run under the
//! standard query timeout.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::storage::with_timeout;
use crate::tasks::model::{Status, Task, TaskRow};
use crate::tasks::validate::{self, TaskPayload};

/// Optional list filters and sort, straight from the query string.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring match over title OR description.
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Overview totals for one user. All-zero when the user has no tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskOverview {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub high_priority: i64,
    pub critical_priority: i64,
}

/// One entry of the per-status breakdown. Statuses with zero tasks have
/// no entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Map a wire-format sort field onto its column. The sort key is
/// interpolated into SQL, so anything outside this set is rejected.
fn sort_column(field: &str) -> Option<&'static str> {
    Some(match field {
        "dueDate" => "due_date",
        "startDate" => "start_date",
        "createdAt" => "created_at",
        "updatedAt" => "updated_at",
        "completionDate" => "completion_date",
        "completionPercentage" => "completion_percentage",
        "estimatedHours" => "estimated_hours",
        "actualHours" => "actual_hours",
        "aiPriorityScore" => "ai_priority_score",
        "title" => "title",
        "status" => "status",
        "priority" => "priority",
        "category" => "category",
        _ => return None,
    })
}

/// Escape `%`, `_`, and `\` for a LIKE pattern with `ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    /// Validate, normalize, and persist a new task owned by `user_id`.
    /// Duplicate titles are permitted.
    pub async fn create_task(&self, user_id: &str, payload: &TaskPayload) -> Result<Task, ApiError> {
        let task = validate::normalize_new(payload, user_id).map_err(ApiError::ValidationFailed)?;
        self.insert(&task).await?;
        Ok(task)
    }

    /// Full update: merge `payload` onto the stored record, re-validate,
    /// persist. `NotFound` whether the id is absent or owned by someone
    /// else.
    pub async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        payload: &TaskPayload,
    ) -> Result<Task, ApiError> {
        let row = self.fetch(user_id, id).await?.ok_or(ApiError::NotFound("Task"))?;
        let mut task: Task = row.try_into().map_err(ApiError::Internal)?;
        validate::apply_update(&mut task, payload).map_err(ApiError::ValidationFailed)?;
        self.persist(&task).await?;
        Ok(task)
    }

    /// Status transition. The target must be a member of the closed
    /// status set; `completed`, `completionDate`, and
    /// `completionPercentage` are derived per the transition policy.
    pub async fn set_status(&self, user_id: &str, id: &str, target: &str) -> Result<Task, ApiError> {
        let status: Status = target
            .parse()
            .map_err(|_| ApiError::InvalidInput(format!("{target:?} is not a valid task status")))?;

        let row = self.fetch(user_id, id).await?.ok_or(ApiError::NotFound("Task"))?;
        let mut task: Task = row.try_into().map_err(ApiError::Internal)?;

        task.status = status;
        if status == Status::Completed {
            task.completed = true;
            task.completion_date = Some(Utc::now().to_rfc3339());
            task.completion_percentage = 100;
        } else {
            // Leaving completed (or moving between non-completed states)
            // resets partial progress. Explicit policy, not an accident.
            task.completed = false;
            task.completion_percentage = 0;
        }
        task.updated_at = Utc::now().to_rfc3339();

        self.persist(&task).await?;
        Ok(task)
    }

    /// Hard delete. Dependency ids held by other tasks are soft
    /// references and are left dangling.
    pub async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), ApiError> {
        let pool = self.pool.clone();
        let affected = with_timeout(async {
            Ok(sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(&pool)
                .await?
                .rows_affected())
        })
        .await?;
        if affected == 0 {
            return Err(ApiError::NotFound("Task"));
        }
        Ok(())
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Single-task fetch scoped to the owner.
    pub async fn get_task(&self, user_id: &str, id: &str) -> Result<Task, ApiError> {
        let row = self.fetch(user_id, id).await?.ok_or(ApiError::NotFound("Task"))?;
        row.try_into().map_err(ApiError::Internal)
    }

    /// Filtered, sorted list of the owner's tasks. Filters combine with
    /// AND; default order is due date ascending.
    pub async fn list_tasks(
        &self,
        user_id: &str,
        params: &TaskListParams,
    ) -> Result<Vec<Task>, ApiError> {
        let column = match params.sort_by.as_deref() {
            None => "due_date",
            Some(field) => sort_column(field).ok_or_else(|| {
                ApiError::InvalidQuery(format!("{field:?} is not a sortable field"))
            })?,
        };
        let direction = match params.sort_order.as_deref() {
            Some("desc") => "DESC",
            _ => "ASC",
        };

        let mut sql = String::from("SELECT * FROM tasks WHERE user_id = ?");
        let mut binds: Vec<String> = Vec::new();
        for (clause, value) in [
            (" AND status = ?", &params.status),
            (" AND priority = ?", &params.priority),
            (" AND category = ?", &params.category),
        ] {
            if let Some(value) = value {
                sql.push_str(clause);
                binds.push(value.clone());
            }
        }
        if let Some(search) = &params.search {
            sql.push_str(
                " AND (LOWER(title) LIKE ? ESCAPE '\\' \
                 OR LOWER(IFNULL(description, '')) LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            binds.push(pattern.clone());
            binds.push(pattern);
        }
        sql.push_str(&format!(" ORDER BY {column} {direction}"));

        let pool = self.pool.clone();
        let rows: Vec<TaskRow> = with_timeout(async {
            let mut query = sqlx::query_as(&sql).bind(user_id);
            for value in &binds {
                query = query.bind(value);
            }
            Ok(query.fetch_all(&pool).await?)
        })
        .await?;

        rows.into_iter()
            .map(|row| row.try_into().map_err(ApiError::Internal))
            .collect()
    }

    // ─── Statistics ─────────────────────────────────────────────────────────

    /// Overview totals. A user with no tasks gets all zeros, not an
    /// error.
    pub async fn overview_stats(&self, user_id: &str) -> Result<TaskOverview, ApiError> {
        let pool = self.pool.clone();
        let overview = with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT COUNT(*) AS total_tasks,
                        COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0) AS completed_tasks,
                        COALESCE(SUM(CASE WHEN priority = 'high' THEN 1 ELSE 0 END), 0) AS high_priority,
                        COALESCE(SUM(CASE WHEN priority = 'critical' THEN 1 ELSE 0 END), 0) AS critical_priority
                 FROM tasks WHERE user_id = ?",
            )
            .bind(user_id)
            .fetch_one(&pool)
            .await?)
        })
        .await?;
        Ok(overview)
    }

    /// Per-status counts. Independent read from `overview_stats` — the
    /// two may observe different snapshots under concurrent mutation.
    pub async fn status_breakdown(&self, user_id: &str) -> Result<Vec<StatusCount>, ApiError> {
        let pool = self.pool.clone();
        let rows = with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT status, COUNT(*) AS count FROM tasks
                 WHERE user_id = ? GROUP BY status ORDER BY status",
            )
            .bind(user_id)
            .fetch_all(&pool)
            .await?)
        })
        .await?;
        Ok(rows)
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<TaskRow>, ApiError> {
        let pool = self.pool.clone();
        let row = with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&pool)
                .await?)
        })
        .await?;
        Ok(row)
    }

    async fn insert(&self, task: &Task) -> Result<(), ApiError> {
        let pool = self.pool.clone();
        let json = CollectionsJson::encode(task)?;
        with_timeout(async {
            sqlx::query(
                "INSERT INTO tasks
                 (id, user_id, title, description, category, priority, status, completed,
                  completion_date, completion_percentage, due_date, start_date, estimated_hours,
                  actual_hours, reminder, is_recurring, recurrence_pattern, tags, project,
                  dependencies, difficulty, energy_level, focus_required, ai_priority_score,
                  attachments, notes, time_slots, created_at, updated_at, last_viewed, is_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&task.id)
            .bind(&task.user_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.category.as_str())
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.completed)
            .bind(&task.completion_date)
            .bind(task.completion_percentage)
            .bind(&task.due_date)
            .bind(&task.start_date)
            .bind(task.estimated_hours)
            .bind(task.actual_hours)
            .bind(&task.reminder)
            .bind(task.is_recurring)
            .bind(task.recurrence_pattern.as_str())
            .bind(&json.tags)
            .bind(&task.project)
            .bind(&json.dependencies)
            .bind(task.difficulty.as_str())
            .bind(task.energy_level.as_str())
            .bind(task.focus_required.as_str())
            .bind(task.ai_priority_score)
            .bind(&json.attachments)
            .bind(&json.notes)
            .bind(&json.time_slots)
            .bind(&task.created_at)
            .bind(&task.updated_at)
            .bind(&task.last_viewed)
            .bind(task.is_deleted)
            .execute(&pool)
            .await?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Write back every mutable column. The `(id, user_id)` scope is kept
    /// even here; owner and `created_at` are immutable by omission.
    async fn persist(&self, task: &Task) -> Result<(), ApiError> {
        let pool = self.pool.clone();
        let json = CollectionsJson::encode(task)?;
        with_timeout(async {
            sqlx::query(
                "UPDATE tasks SET
                 title = ?, description = ?, category = ?, priority = ?, status = ?,
                 completed = ?, completion_date = ?, completion_percentage = ?, due_date = ?,
                 start_date = ?, estimated_hours = ?, actual_hours = ?, reminder = ?,
                 is_recurring = ?, recurrence_pattern = ?, tags = ?, project = ?,
                 dependencies = ?, difficulty = ?, energy_level = ?, focus_required = ?,
                 ai_priority_score = ?, attachments = ?, notes = ?, time_slots = ?,
                 updated_at = ?, last_viewed = ?, is_deleted = ?
                 WHERE id = ? AND user_id = ?",
            )
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.category.as_str())
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.completed)
            .bind(&task.completion_date)
            .bind(task.completion_percentage)
            .bind(&task.due_date)
            .bind(&task.start_date)
            .bind(task.estimated_hours)
            .bind(task.actual_hours)
            .bind(&task.reminder)
            .bind(task.is_recurring)
            .bind(task.recurrence_pattern.as_str())
            .bind(&json.tags)
            .bind(&task.project)
            .bind(&json.dependencies)
            .bind(task.difficulty.as_str())
            .bind(task.energy_level.as_str())
            .bind(task.focus_required.as_str())
            .bind(task.ai_priority_score)
            .bind(&json.attachments)
            .bind(&json.notes)
            .bind(&json.time_slots)
            .bind(&task.updated_at)
            .bind(&task.last_viewed)
            .bind(task.is_deleted)
            .bind(&task.id)
            .bind(&task.user_id)
            .execute(&pool)
            .await?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}

/// JSON-encoded collection columns for one task.
struct CollectionsJson {
    tags: String,
    dependencies: String,
    attachments: String,
    notes: String,
    time_slots: String,
}

impl CollectionsJson {
    fn encode(task: &Task) -> Result<Self, ApiError> {
        Ok(Self {
            tags: serde_json::to_string(&task.tags).map_err(|e| ApiError::Internal(e.into()))?,
            dependencies: serde_json::to_string(&task.dependencies)
                .map_err(|e| ApiError::Internal(e.into()))?,
            attachments: serde_json::to_string(&task.attachments)
                .map_err(|e| ApiError::Internal(e.into()))?,
            notes: serde_json::to_string(&task.notes).map_err(|e| ApiError::Internal(e.into()))?,
            time_slots: serde_json::to_string(&task.time_slots)
                .map_err(|e| ApiError::Internal(e.into()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_whitelist() {
        assert_eq!(sort_column("dueDate"), Some("due_date"));
        assert_eq!(sort_column("aiPriorityScore"), Some("ai_priority_score"));
        assert_eq!(sort_column("dueDate; DROP TABLE tasks"), None);
        assert_eq!(sort_column("userId"), None);
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("50%_done\\"), "50\\%\\_done\\\\");
    }
}
