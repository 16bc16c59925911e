//! Dashboard, analytics and insights reports

use anyhow::Result;
use chrono::Utc;
use tabled::{Table, Tabled};
use timebox_core::analytics::{format_duration, parse_period};
use timebox_core::calendar::format_date_full;
use timebox_core::{Analytics, TimeboxConfig};

use super::helpers::{
    open_database, or_dash, print_heading, short_time, show_date, truncate_str,
};

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Sessions")]
    sessions: u32,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sessions")]
    sessions: u32,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Avg focus")]
    focus: String,
}

/// Today's activity, the running session, pending work and goals
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a query fails
pub fn handle_dashboard(config: &TimeboxConfig) -> Result<()> {
    let db = open_database(config)?;
    let now = Utc::now();
    let analytics = Analytics::new(&db);
    let dashboard = analytics.dashboard(now)?;

    print_heading("Today");
    println!(
        "Sessions: {}  Time: {}  Avg focus: {:.1}  Tasks done: {}",
        dashboard.today.sessions_count,
        format_duration(dashboard.today.total_minutes),
        dashboard.today.avg_focus,
        dashboard.today.completed_tasks
    );
    println!(
        "Daily goal: {}/{} sessions   Streak: {} days",
        dashboard.today.sessions_count,
        dashboard.preferences.daily_goal_sessions,
        analytics.session_streak(now.date_naive())?
    );
    match &dashboard.active_session {
        Some(active) => println!(
            "Running: {} ({} of {}m)",
            active.task_title,
            format_duration(active.session.elapsed_minutes(now)),
            active.session.planned_minutes
        ),
        None => println!("No session running."),
    }

    let counts = dashboard.task_counts;
    print_heading("Tasks");
    println!(
        "{} total, {} completed, {} in progress, {} overdue",
        counts.total, counts.completed, counts.in_progress, counts.overdue
    );
    let by_priority: Vec<String> = dashboard
        .priority_counts
        .iter()
        .map(|p| format!("{} {}", p.label, p.count))
        .collect();
    if !by_priority.is_empty() {
        println!("Pending by priority: {}", by_priority.join(", "));
    }
    for task in &dashboard.pending_tasks {
        println!(
            "  [{}] {} {}",
            task.id,
            truncate_str(&task.title, 40),
            or_dash(task.due_date.map(|due| short_time(config.language, due)))
        );
    }

    if !dashboard.category_minutes.is_empty() {
        let rows: Vec<CategoryRow> = dashboard
            .category_minutes
            .iter()
            .map(|c| CategoryRow {
                category: format!("{} {}", c.icon, c.name),
                time: format_duration(c.minutes),
                sessions: c.sessions,
            })
            .collect();
        println!("\n{}", Table::new(rows));
    }

    if !dashboard.active_goals.is_empty() {
        print_heading("Goals");
        for goal in &dashboard.active_goals {
            println!(
                "  {} {:.1}% of {:.1}h ({})",
                truncate_str(&goal.goal.title, 36),
                goal.progress,
                goal.goal.target_hours_per_period,
                goal.goal.period.label()
            );
        }
    }

    print_heading("Last 7 days");
    let week: Vec<String> = dashboard
        .weekday_labels
        .iter()
        .zip(&dashboard.weekly_minutes)
        .map(|(day, minutes)| format!("{day} {}", format_duration(*minutes)))
        .collect();
    println!("{}", week.join("  "));
    Ok(())
}

/// Totals, daily series and category split over a period of days
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a query fails
pub fn handle_analytics(config: &TimeboxConfig, period: Option<&str>) -> Result<()> {
    let db = open_database(config)?;
    let stats = Analytics::new(&db).analytics_stats(parse_period(period), Utc::now())?;

    print_heading(&format!(
        "Last {} days ({} to {})",
        stats.period,
        show_date(config.language, stats.start_date),
        show_date(config.language, stats.end_date)
    ));
    println!(
        "Sessions: {}  Hours: {:.1}  Avg focus: {:.1}  Avg length: {:.0}m",
        stats.totals.sessions,
        stats.totals.hours,
        stats.totals.avg_focus,
        stats.totals.avg_session_length
    );

    let rows: Vec<DayRow> = stats
        .daily
        .iter()
        .filter(|d| d.sessions > 0)
        .map(|d| DayRow {
            date: format_date_full(config.language, d.date),
            sessions: d.sessions,
            time: format_duration(d.minutes),
            focus: format!("{:.1}", d.avg_focus),
        })
        .collect();
    if rows.is_empty() {
        println!("\nNo sessions in this period.");
        return Ok(());
    }
    println!("\n{}", Table::new(rows));

    let categories: Vec<CategoryRow> = stats
        .categories
        .iter()
        .filter(|c| c.session_count > 0)
        .map(|c| CategoryRow {
            category: format!("{} {}", c.icon, c.name),
            time: format_duration(c.total_minutes),
            sessions: c.session_count,
        })
        .collect();
    println!("\n{}", Table::new(categories));
    Ok(())
}

/// Productivity insights, patterns and suggestions
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a query fails
pub fn handle_insights(config: &TimeboxConfig, period: Option<&str>) -> Result<()> {
    let db = open_database(config)?;
    let now = Utc::now();
    let days = parse_period(period);
    let analytics = Analytics::new(&db);
    let insights = analytics.insights(days, now)?;

    print_heading(&format!("Insights, last {days} days"));
    println!("Sessions:              {}", insights.total_sessions);
    println!("Hours:                 {:.1}", insights.total_hours);
    println!("Avg focus:             {:.1}", insights.avg_focus_rating);
    println!("Completion rate:       {:.0}%", insights.completion_rate);
    println!("Most productive hour:  {}", insights.most_productive_hour);
    println!("Best focus day:        {}", insights.best_focus_day);
    println!(
        "Suggested session:     {}m",
        analytics.suggest_session_length(None)?
    );

    let energy = analytics.energy_patterns(days, now)?;
    if !energy.hourly_energy.is_empty() {
        let peaks: Vec<String> = energy.peak_hours.iter().map(|h| format!("{h:02}:00")).collect();
        println!("Energy peaks:          {} ({})", peaks.join(", "), energy.best_time);
    }

    let distractions = analytics.distraction_patterns(days, now)?;
    if !distractions.is_empty() {
        print_heading("Top distractions");
        for d in distractions.iter().take(5) {
            println!("  {:<16} {}", d.keyword, d.count);
        }
    }

    let tips = analytics.productivity_tips(now)?;
    if !tips.is_empty() {
        print_heading("Tips");
        for tip in tips {
            println!("* {}: {}", tip.title, tip.message);
            println!("  {}", tip.action);
        }
    }
    Ok(())
}
