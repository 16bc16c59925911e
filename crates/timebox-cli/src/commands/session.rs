//! Session command handlers

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use tabled::{Table, Tabled};
use timebox_core::analytics::format_duration;
use timebox_core::{
    Analytics, CompleteSession, Language, SessionManager, StartSession, TimeboxConfig,
};
use timebox_storage::{Database, SessionDetail, SessionOutcome};

use super::helpers::{open_database, or_dash, print_heading, short_time, truncate_str};

#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// Start a timebox on a task
    Start {
        /// Task id
        task: i64,
        /// Planned minutes (defaults to the preferred work duration)
        #[arg(short, long, conflicts_with = "suggest")]
        minutes: Option<u32>,
        /// Use a length learned from past focused sessions
        #[arg(long)]
        suggest: bool,
        /// Energy before starting, 1-5
        #[arg(short, long)]
        energy: Option<u8>,
    },
    /// Finish a session (defaults to the running one)
    Complete {
        id: Option<i64>,
        /// completed, partial, interrupted or abandoned
        #[arg(short, long, default_value = "completed")]
        outcome: SessionOutcome,
        /// Focus rating, 1-5
        #[arg(short, long)]
        focus: Option<u8>,
        /// Energy after, 1-5
        #[arg(short, long)]
        energy: Option<u8>,
        #[arg(short, long)]
        notes: Option<String>,
        #[arg(short, long)]
        distractions: Option<String>,
        #[arg(long)]
        insights: Option<String>,
        /// Also mark the task as completed
        #[arg(long)]
        task_done: bool,
    },
    /// Stop a session early (defaults to the running one)
    Pause { id: Option<i64> },
    /// List recent sessions
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one session in full
    Show { id: i64 },
    /// Show the running session, if any
    Active,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Planned")]
    planned: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Focus")]
    focus: String,
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
}

impl SessionRow {
    fn new(d: &SessionDetail, language: Language) -> Self {
        Self {
            id: d.session.id,
            task: truncate_str(&d.task_title, 30),
            category: d.category_name.clone(),
            started: short_time(language, d.session.start_time),
            planned: format!("{}m", d.session.planned_minutes),
            actual: d.session.duration_display(),
            focus: or_dash(d.session.focus_rating),
            outcome: d.session.outcome.map_or("Running", |o| o.label()),
        }
    }
}

/// Handle session subcommands
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the operation fails
pub fn handle_session_command(config: &TimeboxConfig, action: SessionAction) -> Result<()> {
    let db = open_database(config)?;
    let manager = SessionManager::new(&db);
    let now = Utc::now();
    match action {
        SessionAction::Start {
            task,
            minutes,
            suggest,
            energy,
        } => {
            let planned_minutes = if suggest {
                let task = db.get_task(task)?;
                Some(Analytics::new(&db).suggest_session_length(task.as_ref())?)
            } else {
                minutes
            };
            let session = manager.start_session(
                &StartSession {
                    task_id: task,
                    planned_minutes,
                    energy_before: energy,
                },
                now,
            )?;
            println!(
                "Started session {} ({} minutes). Finish with: timebox session complete",
                session.id, session.planned_minutes
            );
        }
        SessionAction::Complete {
            id,
            outcome,
            focus,
            energy,
            notes,
            distractions,
            insights,
            task_done,
        } => {
            let id = session_or_active(&db, id)?;
            let report = CompleteSession {
                outcome,
                focus_rating: focus,
                energy_after: energy,
                notes: notes.unwrap_or_default(),
                distractions: distractions.unwrap_or_default(),
                key_insights: insights.unwrap_or_default(),
                task_completed: task_done,
            };
            let done = manager.complete_session(id, &report, now)?;
            println!(
                "Completed session {} after {}. Take a {} minute break.",
                done.session.id,
                done.session.duration_display(),
                done.break_duration
            );
        }
        SessionAction::Pause { id } => {
            let id = session_or_active(&db, id)?;
            let session = manager.pause_session(id, now)?;
            println!(
                "Paused session {} after {}",
                session.id,
                session.duration_display()
            );
        }
        SessionAction::List { limit } => {
            let sessions = db.recent_sessions(limit)?;
            if sessions.is_empty() {
                println!("No sessions recorded yet.");
                return Ok(());
            }
            let rows: Vec<SessionRow> = sessions
                .iter()
                .map(|d| SessionRow::new(d, config.language))
                .collect();
            println!("\n{}", Table::new(rows));
        }
        SessionAction::Show { id } => {
            let detail = db
                .get_session_detail(id)?
                .with_context(|| format!("Session {id} not found"))?;
            show_session(&detail, config.language);
        }
        SessionAction::Active => match db.active_session()? {
            Some(session) => {
                let detail = db
                    .get_session_detail(session.id)?
                    .with_context(|| format!("Session {} not found", session.id))?;
                let elapsed = session.elapsed_minutes(now);
                print_heading("Running session");
                println!("Task:     {}", detail.task_title);
                println!("Started:  {}", short_time(config.language, session.start_time));
                println!(
                    "Elapsed:  {} of {}",
                    format_duration(elapsed),
                    format_duration(session.planned_minutes)
                );
                if elapsed > session.planned_minutes {
                    println!("The timebox is over. Wrap up and run `timebox session complete`.");
                }
            }
            None => println!("No active session."),
        },
    }
    Ok(())
}

fn session_or_active(db: &Database, id: Option<i64>) -> Result<i64> {
    match id {
        Some(id) => Ok(id),
        None => Ok(db
            .active_session()?
            .context("No active session. Pass a session id or start one first.")?
            .id),
    }
}

fn show_session(detail: &SessionDetail, language: Language) {
    let session = &detail.session;
    print_heading(&format!("Session {}", session.id));
    println!("Task:          {}", detail.task_title);
    println!("Category:      {}", detail.category_name);
    println!("Started:       {}", short_time(language, session.start_time));
    println!(
        "Ended:         {}",
        or_dash(session.end_time.map(|end| short_time(language, end)))
    );
    println!("Planned:       {}m", session.planned_minutes);
    println!("Actual:        {}", session.duration_display());
    println!(
        "Outcome:       {}",
        session.outcome.map_or("Running", |o| o.label())
    );
    println!("Focus:         {}", or_dash(session.focus_rating));
    println!(
        "Energy:        {} -> {}",
        or_dash(session.energy_before),
        or_dash(session.energy_after)
    );
    println!("Efficiency:    {:.0}%", session.efficiency_score());
    println!("Productivity:  {:.0}", session.productivity_score());
    for (label, text) in [
        ("Notes", &session.notes),
        ("Distractions", &session.distractions),
        ("Insights", &session.key_insights),
    ] {
        if !text.is_empty() {
            println!("{label}:\n  {text}");
        }
    }
}
