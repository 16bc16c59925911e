use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::Serialize;

use crate::models::{Priority, Task};
use crate::validation::validate_task;

use super::helpers::{
    day_bounds, fmt_datetime, parse_choice, parse_datetime, parse_opt_datetime, to_u32,
};
use super::{Database, NotFound};

pub const TASK_PAGE_SIZE: u32 = 20;

const TASK_COLUMNS: &str = "id, title, description, category_id, goal_id, priority, energy_level,
    estimated_minutes, actual_minutes, is_completed, completed_at, due_date, created_at, updated_at";

const TASK_ORDER: &str = "ORDER BY is_completed, priority, due_date IS NULL, due_date, created_at";

/// Which slice of the task list to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
    Overdue,
    /// Incomplete tasks due today
    Today,
}

impl std::str::FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            "today" => Ok(Self::Today),
            other => Err(format!("Unknown task filter: {other}")),
        }
    }
}

/// Filter, search and page for `list_tasks`
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub search: Option<String>,
    pub category_id: Option<i64>,
    /// 1-based; out-of-range pages clamp to the nearest valid page
    pub page: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub total: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub overdue: u32,
}

impl Database {
    /// Insert a task and return its id
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound` for an unknown category or goal, or a database error
    pub fn create_task(&self, task: &Task) -> Result<i64> {
        validate_task(task)?;
        self.ensure_task_links(task)?;

        let now = fmt_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO tasks (title, description, category_id, goal_id, priority, energy_level,
                                estimated_minutes, actual_minutes, is_completed, completed_at, due_date,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                task.title.trim(),
                task.description,
                task.category_id,
                task.goal_id,
                task.priority.rank(),
                task.energy_level.as_str(),
                task.estimated_minutes,
                task.actual_minutes,
                i32::from(task.is_completed),
                task.completed_at.map(fmt_datetime),
                task.due_date.map(fmt_datetime),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("Created task {id}: {}", task.title);
        Ok(id)
    }

    /// Get a task by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                Self::row_to_task,
            )
            .optional()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn find_task_by_title(&self, title: &str) -> Result<Option<Task>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE title = ?1 ORDER BY id LIMIT 1"),
                params![title],
                Self::row_to_task,
            )
            .optional()?;
        Ok(result)
    }

    /// Update every editable field of a task
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound`, or a database error
    pub fn update_task(&self, task: &Task) -> Result<()> {
        validate_task(task)?;
        self.ensure_task_links(task)?;

        let updated = self.conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, category_id = ?3, goal_id = ?4,
                    priority = ?5, energy_level = ?6, estimated_minutes = ?7, actual_minutes = ?8,
                    is_completed = ?9, completed_at = ?10, due_date = ?11, updated_at = ?12
             WHERE id = ?13",
            params![
                task.title.trim(),
                task.description,
                task.category_id,
                task.goal_id,
                task.priority.rank(),
                task.energy_level.as_str(),
                task.estimated_minutes,
                task.actual_minutes,
                i32::from(task.is_completed),
                task.completed_at.map(fmt_datetime),
                task.due_date.map(fmt_datetime),
                fmt_datetime(Utc::now()),
                task.id,
            ],
        )?;
        if updated == 0 {
            return Err(NotFound::new("Task", task.id).into());
        }
        Ok(())
    }

    /// Delete a task and, by cascade, its sessions
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, or a database error
    pub fn delete_task(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(NotFound::new("Task", id).into());
        }
        Ok(())
    }

    /// Set or clear completion, stamping `completed_at` with `now` when completing
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, or a database error
    pub fn set_task_completed(&self, id: i64, completed: bool, now: DateTime<Utc>) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE tasks SET is_completed = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                i32::from(completed),
                completed.then(|| fmt_datetime(now)),
                fmt_datetime(now),
                id,
            ],
        )?;
        if updated == 0 {
            return Err(NotFound::new("Task", id).into());
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub fn set_task_priority(&self, id: i64, priority: Priority, now: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET priority = ?1, updated_at = ?2 WHERE id = ?3",
            params![priority.rank(), fmt_datetime(now), id],
        )?;
        Ok(())
    }

    /// Filtered, searched and paginated task list
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn list_tasks(&self, query: &TaskQuery, now: DateTime<Utc>) -> Result<TaskPage> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        match query.filter {
            TaskFilter::All => {}
            TaskFilter::Pending => clauses.push("is_completed = 0"),
            TaskFilter::Completed => clauses.push("is_completed = 1"),
            TaskFilter::Overdue => {
                clauses.push("is_completed = 0 AND due_date IS NOT NULL AND due_date < ?");
                values.push(Value::Text(fmt_datetime(now)));
            }
            TaskFilter::Today => {
                let today = now.date_naive();
                let (start, end) = day_bounds(today, today);
                clauses.push("is_completed = 0 AND due_date >= ? AND due_date < ?");
                values.push(Value::Text(start));
                values.push(Value::Text(end));
            }
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push("(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
            let pattern = format!("%{}%", escape_like(search));
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }

        if let Some(category_id) = query.category_id {
            clauses.push("category_id = ?");
            values.push(Value::Integer(category_id));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM tasks {where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        let total = to_u32(total)?;
        let total_pages = total.div_ceil(TASK_PAGE_SIZE).max(1);
        let page = query.page.clamp(1, total_pages);

        let mut page_values = values;
        page_values.push(Value::Integer(i64::from(TASK_PAGE_SIZE)));
        page_values.push(Value::Integer(i64::from((page - 1) * TASK_PAGE_SIZE)));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_sql} {TASK_ORDER} LIMIT ? OFFSET ?"
        ))?;
        let tasks = stmt
            .query_map(params_from_iter(page_values.iter()), Self::row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TaskPage {
            tasks,
            page,
            total_pages,
            total,
        })
    }

    /// Every task, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn all_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Incomplete tasks by priority then due date (undated last)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn pending_tasks(&self, limit: u32) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE is_completed = 0
             ORDER BY priority, due_date IS NULL, due_date, created_at
             LIMIT ?1"
        ))?;
        let tasks = stmt
            .query_map(params![limit], Self::row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Incomplete tasks whose due date is before `cutoff`
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn overdue_tasks(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE is_completed = 0 AND due_date IS NOT NULL AND due_date < ?1
             ORDER BY due_date"
        ))?;
        let tasks = stmt
            .query_map(params![fmt_datetime(cutoff)], Self::row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Delete completed tasks finished before `cutoff`, returning how many went
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails
    pub fn delete_completed_tasks_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM tasks
             WHERE is_completed = 1 AND completed_at IS NOT NULL AND completed_at < ?1",
            params![fmt_datetime(cutoff)],
        )?;
        Ok(deleted)
    }

    /// Totals by status; in-progress counts every incomplete task, overdue ones included
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn task_counts(&self, now: DateTime<Utc>) -> Result<TaskCounts> {
        let (total, completed, overdue): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_completed), 0),
                    COALESCE(SUM(CASE WHEN is_completed = 0 AND due_date IS NOT NULL AND due_date < ?1
                                      THEN 1 ELSE 0 END), 0)
             FROM tasks",
            params![fmt_datetime(now)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let total = to_u32(total)?;
        let completed = to_u32(completed)?;
        let overdue = to_u32(overdue)?;
        Ok(TaskCounts {
            total,
            completed,
            in_progress: total.saturating_sub(completed),
            overdue,
        })
    }

    /// Pending task count for every priority, most urgent first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn pending_counts_by_priority(&self) -> Result<Vec<(Priority, u32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT priority, COUNT(*) FROM tasks WHERE is_completed = 0 GROUP BY priority",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut counts = Vec::with_capacity(Priority::ALL.len());
        for priority in Priority::ALL {
            let count = rows
                .iter()
                .find(|(rank, _)| *rank == priority.rank())
                .map_or(0, |(_, count)| *count);
            counts.push((*priority, to_u32(count)?));
        }
        Ok(counts)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn count_pending_tasks(&self) -> Result<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE is_completed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(to_u32(count)?)
    }

    /// Tasks whose completion timestamp falls on `date`
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn completed_tasks_on(&self, date: NaiveDate) -> Result<u32> {
        let (start, end) = day_bounds(date, date);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE is_completed = 1 AND completed_at >= ?1 AND completed_at < ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(to_u32(count)?)
    }

    fn ensure_task_links(&self, task: &Task) -> Result<()> {
        if self.get_category(task.category_id)?.is_none() {
            return Err(NotFound::new("Category", task.category_id).into());
        }
        if let Some(goal_id) = task.goal_id {
            if self.get_goal(goal_id)?.is_none() {
                return Err(NotFound::new("Goal", goal_id).into());
            }
        }
        Ok(())
    }

    /// Helper function to parse `Task` from database row
    pub(crate) fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let priority = Priority::try_from(row.get::<_, i64>(5)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Integer, e.into())
        })?;
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category_id: row.get(3)?,
            goal_id: row.get(4)?,
            priority,
            energy_level: parse_choice(&row.get::<_, String>(6)?)?,
            estimated_minutes: to_u32(row.get(7)?)?,
            actual_minutes: to_u32(row.get(8)?)?,
            is_completed: row.get::<_, i32>(9)? != 0,
            completed_at: parse_opt_datetime(row.get(10)?)?,
            due_date: parse_opt_datetime(row.get(11)?)?,
            created_at: parse_datetime(&row.get::<_, String>(12)?)?,
            updated_at: parse_datetime(&row.get::<_, String>(13)?)?,
        })
    }
}

/// Escape LIKE wildcards so search text matches literally
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
