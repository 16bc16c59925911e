//! Habit command handlers

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Subcommand;
use tabled::{Table, Tabled};
use timebox_core::habits::{
    completion_rate, current_streak, habit_summaries, log_habit, longest_streak,
    COMPLETION_WINDOW_DAYS,
};
use timebox_core::TimeboxConfig;
use timebox_storage::{Database, Habit, HabitFrequency};

use super::helpers::{
    open_database, parse_date, print_heading, resolve_category, show_date, yes_no,
};

#[derive(Subcommand, Debug)]
pub enum HabitAction {
    /// Create a habit
    Add {
        name: String,
        /// Category id or name
        #[arg(short, long)]
        category: String,
        /// daily, weekly or monthly
        #[arg(short, long, default_value = "daily")]
        frequency: HabitFrequency,
        /// Completions needed per period
        #[arg(short, long, default_value_t = 1)]
        target: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// List habits with their streaks
    List {
        /// Include inactive habits
        #[arg(short, long)]
        all: bool,
    },
    /// Record a habit for a day
    Log {
        /// Habit id or name
        habit: String,
        /// YYYY-MM-DD, today or yesterday
        #[arg(short, long, default_value = "today")]
        date: String,
        /// Record the day as missed
        #[arg(long)]
        missed: bool,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Show streaks and the last two weeks of a habit
    Streak {
        /// Habit id or name
        habit: String,
    },
}

#[derive(Tabled)]
struct HabitRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Habit")]
    name: String,
    #[tabled(rename = "Frequency")]
    frequency: &'static str,
    #[tabled(rename = "Streak")]
    streak: u32,
    #[tabled(rename = "Best")]
    best: u32,
    #[tabled(rename = "30d rate")]
    rate: String,
    #[tabled(rename = "Today")]
    today: &'static str,
}

/// Handle habit subcommands
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the operation fails
pub fn handle_habit_command(config: &TimeboxConfig, action: HabitAction) -> Result<()> {
    let db = open_database(config)?;
    let today = Utc::now().date_naive();
    match action {
        HabitAction::Add {
            name,
            category,
            frequency,
            target,
            description,
        } => {
            let mut habit = Habit::new(name, resolve_category(&db, &category)?.id, frequency);
            habit.target_per_period = target;
            habit.description = description.unwrap_or_default();
            let id = db.create_habit(&habit)?;
            println!("Created habit {id}: {}", habit.name);
        }
        HabitAction::List { all } => {
            let summaries = habit_summaries(&db, !all, today)?;
            if summaries.is_empty() {
                println!("No habits yet. Add one with: timebox habit add");
                return Ok(());
            }
            let rows: Vec<HabitRow> = summaries
                .iter()
                .map(|s| HabitRow {
                    id: s.habit.id,
                    name: s.habit.name.clone(),
                    frequency: s.habit.frequency.label(),
                    streak: s.current_streak,
                    best: s.longest_streak,
                    rate: format!("{:.0}%", s.completion_rate),
                    today: yes_no(s.completed_today),
                })
                .collect();
            println!("\n{}", Table::new(rows));
        }
        HabitAction::Log {
            habit,
            date,
            missed,
            notes,
        } => {
            let habit = resolve_habit(&db, &habit)?;
            let date = parse_date(&date, today)?;
            log_habit(&db, habit.id, date, !missed, notes.as_deref().unwrap_or(""))?;
            let logs = db.habit_logs(habit.id)?;
            println!(
                "Logged {} on {} as {}. Current streak: {}",
                habit.name,
                show_date(config.language, date),
                if missed { "missed" } else { "done" },
                current_streak(&habit, &logs, today)
            );
        }
        HabitAction::Streak { habit } => {
            let habit = resolve_habit(&db, &habit)?;
            let logs = db.habit_logs(habit.id)?;
            let window_start = today - Duration::days(COMPLETION_WINDOW_DAYS - 1);

            print_heading(&habit.name);
            println!("Current streak:  {}", current_streak(&habit, &logs, today));
            println!("Longest streak:  {}", longest_streak(&habit, &logs));
            println!(
                "Last {COMPLETION_WINDOW_DAYS} days:    {:.0}%",
                completion_rate(&logs, window_start, today)
            );

            let marks: String = (0..14)
                .rev()
                .map(|offset| {
                    let day = today - Duration::days(offset);
                    match logs.iter().find(|l| l.date == day) {
                        Some(l) if l.completed => '#',
                        Some(_) => 'x',
                        None => '.',
                    }
                })
                .collect();
            println!("Last 14 days:    {marks}");
        }
    }
    Ok(())
}

fn resolve_habit(db: &Database, key: &str) -> Result<Habit> {
    let found = match key.parse::<i64>() {
        Ok(id) => db.get_habit(id)?,
        Err(_) => db.find_habit_by_name(key)?,
    };
    found.with_context(|| format!("No habit '{key}'. See `timebox habit list`"))
}
