//! Task command handlers

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use tabled::{Table, Tabled};
use timebox_core::{Language, SessionManager, TimeboxConfig};
use timebox_storage::{Database, EnergyLevel, Priority, Task, TaskFilter, TaskQuery};

use super::helpers::{
    open_database, or_dash, parse_due, print_heading, resolve_category, short_time, truncate_str,
    yes_no,
};

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Create a task
    Add {
        title: String,
        /// Category id or name
        #[arg(short, long)]
        category: String,
        /// 1-4 or critical/high/medium/low
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        energy: EnergyLevel,
        /// Estimated minutes
        #[arg(short = 't', long, default_value_t = 25)]
        estimate: u32,
        /// Due date: YYYY-MM-DD [HH:MM]
        #[arg(short, long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Goal the task contributes to
        #[arg(long)]
        goal: Option<i64>,
    },
    /// List tasks
    List {
        /// all, pending, completed, overdue or today
        #[arg(short, long, default_value = "all")]
        filter: TaskFilter,
        /// Match title or description
        #[arg(short, long)]
        search: Option<String>,
        /// Category id or name
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show a task and its progress
    Show { id: i64 },
    /// Change fields of a task
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        energy: Option<EnergyLevel>,
        #[arg(short = 't', long)]
        estimate: Option<u32>,
        /// Due date: YYYY-MM-DD [HH:MM], or "none" to clear it
        #[arg(short, long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Toggle completion (completing also closes its running session)
    Done { id: i64 },
    /// Delete a task and its sessions
    Delete { id: i64 },
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Est.")]
    estimate: String,
}

/// Handle task subcommands
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the operation fails
pub fn handle_task_command(config: &TimeboxConfig, action: TaskAction) -> Result<()> {
    let db = open_database(config)?;
    match action {
        TaskAction::Add {
            title,
            category,
            priority,
            energy,
            estimate,
            due,
            description,
            goal,
        } => {
            let today = Utc::now().date_naive();
            let mut task = Task::new(title, resolve_category(&db, &category)?.id);
            task.priority = priority;
            task.energy_level = energy;
            task.estimated_minutes = estimate;
            task.due_date = due.map(|d| parse_due(&d, today)).transpose()?;
            task.description = description.unwrap_or_default();
            task.goal_id = goal;
            let id = db.create_task(&task)?;
            println!("Created task {id}: {}", task.title);
        }
        TaskAction::List {
            filter,
            search,
            category,
            page,
        } => {
            let category_id = category
                .map(|c| resolve_category(&db, &c).map(|c| c.id))
                .transpose()?;
            let query = TaskQuery {
                filter,
                search,
                category_id,
                page,
            };
            list_tasks(&db, &query, config.language)?;
        }
        TaskAction::Show { id } => show_task(&db, id, config.language)?,
        TaskAction::Edit {
            id,
            title,
            category,
            priority,
            energy,
            estimate,
            due,
            description,
        } => {
            let mut task = db.get_task(id)?.with_context(|| format!("Task {id} not found"))?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(category) = category {
                task.category_id = resolve_category(&db, &category)?.id;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            if let Some(energy) = energy {
                task.energy_level = energy;
            }
            if let Some(estimate) = estimate {
                task.estimated_minutes = estimate;
            }
            if let Some(due) = due {
                task.due_date = if due.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(parse_due(&due, Utc::now().date_naive())?)
                };
            }
            if let Some(description) = description {
                task.description = description;
            }
            db.update_task(&task)?;
            println!("Updated task {id}");
        }
        TaskAction::Done { id } => {
            let result = SessionManager::new(&db).toggle_task_completion(id, Utc::now())?;
            if result.completed {
                println!("Task {id} completed");
            } else {
                println!("Task {id} reopened");
            }
            if let Some(session_id) = result.closed_session_id {
                println!("Closed running session {session_id}");
            }
        }
        TaskAction::Delete { id } => {
            db.delete_task(id)?;
            println!("Deleted task {id}");
        }
    }
    Ok(())
}

fn list_tasks(db: &Database, query: &TaskQuery, language: Language) -> Result<()> {
    let now = Utc::now();
    let page = db.list_tasks(query, now)?;
    if page.tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let rows: Vec<TaskRow> = page
        .tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id,
            title: truncate_str(&t.title, 40),
            priority: t.priority.label(),
            status: t.status(now).label(),
            due: or_dash(t.due_date.map(|due| short_time(language, due))),
            estimate: format!("{}m", t.estimated_minutes),
        })
        .collect();
    println!("\n{}", Table::new(rows));
    println!(
        "Page {}/{} ({} tasks)",
        page.page, page.total_pages, page.total
    );
    Ok(())
}

fn show_task(db: &Database, id: i64, language: Language) -> Result<()> {
    let now = Utc::now();
    let task = db.get_task(id)?.with_context(|| format!("Task {id} not found"))?;
    let category = db
        .get_category(task.category_id)?
        .map_or_else(|| "-".to_string(), |c| c.display_name());
    let progress = SessionManager::new(db).task_progress(id, now)?;

    print_heading(&task.title);
    if !task.description.is_empty() {
        println!("{}\n", task.description);
    }
    println!("Category:   {category}");
    println!("Priority:   {}", task.priority.label());
    println!("Energy:     {}", task.energy_level.label());
    println!("Status:     {}", task.status(now).label());
    println!(
        "Due:        {}",
        or_dash(task.due_date.map(|due| short_time(language, due)))
    );
    println!(
        "Progress:   {}m of {}m ({}%)",
        progress.total_minutes, task.estimated_minutes, progress.completion_percentage
    );
    println!("Running:    {}", yes_no(progress.has_active_session));

    let sessions = db.sessions_for_task(id)?;
    if !sessions.is_empty() {
        println!("\nSessions:");
        for session in sessions {
            println!(
                "  #{} {}  {}  {}",
                session.id,
                short_time(language, session.start_time),
                session.duration_display(),
                session.outcome.map_or("running", |o| o.label())
            );
        }
    }
    Ok(())
}
