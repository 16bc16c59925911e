//! Daily reflection and weekly review handlers

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use timebox_core::analytics::{format_duration, week_start_of};
use timebox_core::reviews::{build_weekly_review, reflection_for, save_reflection};
use timebox_core::{Analytics, Language, TimeboxConfig};
use timebox_storage::{Database, Reflection, WeeklyReview, WeeklyReviewText};

use super::helpers::{open_database, or_dash, parse_date, print_heading, show_date};

#[derive(Args, Debug)]
pub struct ReflectArgs {
    /// YYYY-MM-DD, today or yesterday
    #[arg(short, long, default_value = "today")]
    pub date: String,
    /// Overall productivity, 1-5
    #[arg(long)]
    pub productivity: Option<u8>,
    /// Energy level, 1-5
    #[arg(long)]
    pub energy: Option<u8>,
    /// Mood, 1-5
    #[arg(long)]
    pub mood: Option<u8>,
    /// Stress level, 1-5
    #[arg(long)]
    pub stress: Option<u8>,
    #[arg(long)]
    pub wins: Option<String>,
    #[arg(long)]
    pub challenges: Option<String>,
    #[arg(long)]
    pub improvements: Option<String>,
    /// Focus for tomorrow
    #[arg(long)]
    pub tomorrow: Option<String>,
    #[arg(long)]
    pub gratitude: Option<String>,
}

impl ReflectArgs {
    fn has_changes(&self) -> bool {
        self.productivity.is_some()
            || self.energy.is_some()
            || self.mood.is_some()
            || self.stress.is_some()
            || self.wins.is_some()
            || self.challenges.is_some()
            || self.improvements.is_some()
            || self.tomorrow.is_some()
            || self.gratitude.is_some()
    }

    fn apply(self, reflection: &mut Reflection) {
        let ratings = [
            (self.productivity, &mut reflection.overall_productivity),
            (self.energy, &mut reflection.energy_level),
            (self.mood, &mut reflection.mood),
            (self.stress, &mut reflection.stress_level),
        ];
        for (value, slot) in ratings {
            if let Some(value) = value {
                *slot = value;
            }
        }
        let notes = [
            (self.wins, &mut reflection.wins),
            (self.challenges, &mut reflection.challenges),
            (self.improvements, &mut reflection.improvements),
            (self.tomorrow, &mut reflection.tomorrow_focus),
            (self.gratitude, &mut reflection.gratitude),
        ];
        for (value, slot) in notes {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Any day of the week to review (defaults to this week)
    #[arg(short, long)]
    pub week: Option<String>,
    #[arg(long)]
    pub wins: Option<String>,
    #[arg(long)]
    pub challenges: Option<String>,
    #[arg(long)]
    pub lessons: Option<String>,
    /// Focus for next week
    #[arg(long)]
    pub next: Option<String>,
    #[arg(long)]
    pub improvements: Option<String>,
}

/// Show or update the reflection for a day
///
/// Without any rating or note flags the reflection is only shown.
///
/// # Errors
///
/// Returns an error on invalid input or if the database operation fails
pub fn handle_reflect(config: &TimeboxConfig, args: ReflectArgs) -> Result<()> {
    let db = open_database(config)?;
    let date = parse_date(&args.date, Utc::now().date_naive())?;
    let day = reflection_for(&db, date)?;

    if !args.has_changes() {
        print_heading(&format!("Reflection for {}", show_date(config.language, date)));
        println!(
            "Sessions: {}  Time: {}  Avg focus: {:.1}  Tasks done: {}",
            day.day_stats.sessions_count,
            format_duration(day.day_stats.total_minutes),
            day.day_stats.avg_focus,
            day.day_stats.completed_tasks
        );
        if day.saved {
            print_reflection(&day.reflection);
        } else {
            println!("\nNot written yet. Add one with --wins, --challenges, --improvements and --tomorrow.");
        }
        return Ok(());
    }

    let mut reflection = day.reflection;
    args.apply(&mut reflection);
    let saved = save_reflection(&db, &reflection)?;
    println!("Saved reflection for {}", show_date(config.language, saved.date));
    Ok(())
}

fn print_reflection(r: &Reflection) {
    println!(
        "\nProductivity {}/5  Energy {}/5  Mood {}/5  Stress {}/5",
        r.overall_productivity, r.energy_level, r.mood, r.stress_level
    );
    for (label, text) in [
        ("Wins", &r.wins),
        ("Challenges", &r.challenges),
        ("Improvements", &r.improvements),
        ("Tomorrow", &r.tomorrow_focus),
        ("Gratitude", &r.gratitude),
    ] {
        if !text.is_empty() {
            println!("{label}: {text}");
        }
    }
}

/// Show the week's summary, or store a weekly review when notes are given
///
/// # Errors
///
/// Returns an error on invalid input or if the database operation fails
pub fn handle_review(config: &TimeboxConfig, args: ReviewArgs) -> Result<()> {
    let db = open_database(config)?;
    let today = Utc::now().date_naive();
    let week_start = match &args.week {
        Some(week) => week_start_of(parse_date(week, today)?),
        None => week_start_of(today),
    };

    let text = WeeklyReviewText {
        biggest_wins: args.wins.unwrap_or_default(),
        main_challenges: args.challenges.unwrap_or_default(),
        lessons_learned: args.lessons.unwrap_or_default(),
        next_week_focus: args.next.unwrap_or_default(),
        process_improvements: args.improvements.unwrap_or_default(),
    };
    if text != WeeklyReviewText::default() {
        let review = build_weekly_review(&db, week_start, &text)?;
        println!(
            "Saved weekly review for the week of {}",
            show_date(config.language, review.week_start_date)
        );
        print_review(&review);
        return Ok(());
    }

    show_week(&db, week_start, today, config.language)?;
    match db.weekly_review(week_start)? {
        Some(review) => print_review(&review),
        None => println!(
            "\nNo review written yet. Add one with --wins, --challenges, --lessons and --next."
        ),
    }
    Ok(())
}

fn show_week(
    db: &Database,
    week_start: NaiveDate,
    today: NaiveDate,
    language: Language,
) -> Result<()> {
    let summary = Analytics::new(db).weekly_summary(Some(week_start), today)?;
    print_heading(&format!(
        "Week of {} to {}",
        show_date(language, summary.week_start),
        show_date(language, summary.week_end)
    ));
    println!(
        "Sessions: {}  Time: {}  Avg focus: {:.1}  Completion: {:.0}%",
        summary.total_sessions,
        format_duration(summary.total_minutes),
        summary.avg_focus,
        summary.completion_rate
    );
    for day in &summary.daily_breakdown {
        println!(
            "  {} {:>3} sessions {:>7}",
            day.date.format("%a %d"),
            day.sessions,
            format_duration(day.minutes)
        );
    }
    Ok(())
}

fn print_review(review: &WeeklyReview) {
    println!(
        "\nSnapshot: {} sessions, {}, avg focus {}, goals {}/{}",
        review.total_sessions,
        format_duration(review.total_minutes),
        or_dash(review.average_focus_rating),
        review.goals_achieved,
        review.goals_total
    );
    for (label, text) in [
        ("Wins", &review.biggest_wins),
        ("Challenges", &review.main_challenges),
        ("Lessons", &review.lessons_learned),
        ("Next week", &review.next_week_focus),
        ("Process", &review.process_improvements),
    ] {
        if !text.is_empty() {
            println!("{label}: {text}");
        }
    }
}
