//! Goal command handlers

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use tabled::{Table, Tabled};
use timebox_core::goals::goals_with_progress;
use timebox_core::TimeboxConfig;
use timebox_storage::{Goal, GoalPeriod, GoalStatus};

use super::helpers::{open_database, parse_date, resolve_category, truncate_str};

#[derive(Subcommand, Debug)]
pub enum GoalAction {
    /// Create a goal
    Add {
        title: String,
        /// Category id or name
        #[arg(short, long)]
        category: String,
        /// Target hours per period
        #[arg(short = 't', long)]
        hours: f64,
        /// daily, weekly, monthly, quarterly or yearly
        #[arg(short, long, default_value = "weekly")]
        period: GoalPeriod,
        #[arg(long)]
        description: Option<String>,
        /// Last day of the goal (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    /// List goals with progress in the current period
    List {
        /// active, paused, completed or abandoned
        #[arg(short, long)]
        status: Option<GoalStatus>,
    },
    /// Change fields of a goal
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 't', long)]
        hours: Option<f64>,
        #[arg(short, long)]
        period: Option<GoalPeriod>,
        #[arg(short, long)]
        status: Option<GoalStatus>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a goal
    Delete { id: i64 },
}

#[derive(Tabled)]
struct GoalRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Goal")]
    title: String,
    #[tabled(rename = "Period")]
    period: &'static str,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Logged")]
    logged: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

/// Handle goal subcommands
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the operation fails
pub fn handle_goal_command(config: &TimeboxConfig, action: GoalAction) -> Result<()> {
    let db = open_database(config)?;
    let today = Utc::now().date_naive();
    match action {
        GoalAction::Add {
            title,
            category,
            hours,
            period,
            description,
            end,
        } => {
            let mut goal = Goal::new(title, resolve_category(&db, &category)?.id, hours);
            goal.period = period;
            goal.description = description.unwrap_or_default();
            goal.end_date = end.map(|e| parse_date(&e, today)).transpose()?;
            let id = db.create_goal(&goal)?;
            println!(
                "Created goal {id}: {} ({}h {})",
                goal.title,
                goal.target_hours_per_period,
                goal.period.as_str()
            );
        }
        GoalAction::List { status } => {
            let goals = goals_with_progress(&db, status, today)?;
            if goals.is_empty() {
                println!("No goals found.");
                return Ok(());
            }
            let rows: Vec<GoalRow> = goals
                .iter()
                .map(|g| GoalRow {
                    id: g.goal.id,
                    title: truncate_str(&g.goal.title, 36),
                    period: g.goal.period.label(),
                    target: format!("{:.1}h", g.goal.target_hours_per_period),
                    logged: format!("{}m", g.minutes_logged),
                    progress: format!("{:.1}%", g.progress),
                    status: g.goal.status.label(),
                })
                .collect();
            println!("\n{}", Table::new(rows));
        }
        GoalAction::Edit {
            id,
            title,
            hours,
            period,
            status,
            description,
        } => {
            let mut goal = db.get_goal(id)?.with_context(|| format!("Goal {id} not found"))?;
            if let Some(title) = title {
                goal.title = title;
            }
            if let Some(hours) = hours {
                goal.target_hours_per_period = (hours * 10.0).round() / 10.0;
            }
            if let Some(period) = period {
                goal.period = period;
            }
            if let Some(status) = status {
                goal.status = status;
            }
            if let Some(description) = description {
                goal.description = description;
            }
            db.update_goal(&goal)?;
            println!("Updated goal {id}");
        }
        GoalAction::Delete { id } => {
            db.delete_goal(id)?;
            println!("Deleted goal {id}");
        }
    }
    Ok(())
}
