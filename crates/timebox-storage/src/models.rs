use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Declares a text-backed choice enum with a stable storage key and a display label.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident default $default:ident {
            $($(#[$vmeta:meta])* $variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $key)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Key stored in the database and accepted on the command line
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }

            /// Human-readable label used in reports and exports
            #[must_use]
            pub const fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = s.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == key)
                    .ok_or_else(|| format!("Unknown {}: {s}", stringify!($name)))
            }
        }
    };
}

choice_enum! {
    /// Life area a category belongs to
    pub enum CategoryType default Other {
        Work => ("work", "Work & Career"),
        Health => ("health", "Health & Fitness"),
        Learning => ("learning", "Learning & Development"),
        Personal => ("personal", "Personal Life"),
        Hobbies => ("hobbies", "Hobbies & Interests"),
        Finance => ("finance", "Finance & Money"),
        Relationships => ("relationships", "Relationships"),
        Spirituality => ("spirituality", "Spirituality & Mindfulness"),
        Travel => ("travel", "Travel & Adventure"),
        Other => ("other", "Other"),
    }
}

choice_enum! {
    /// Period a goal target applies to
    pub enum GoalPeriod default Weekly {
        Daily => ("daily", "Daily"),
        Weekly => ("weekly", "Weekly"),
        Monthly => ("monthly", "Monthly"),
        Quarterly => ("quarterly", "Quarterly"),
        Yearly => ("yearly", "Yearly"),
    }
}

choice_enum! {
    pub enum GoalStatus default Active {
        Active => ("active", "Active"),
        Paused => ("paused", "Paused"),
        Completed => ("completed", "Completed"),
        Abandoned => ("abandoned", "Abandoned"),
    }
}

choice_enum! {
    /// Energy a task demands
    pub enum EnergyLevel default Medium {
        Low => ("low", "Low Energy"),
        Medium => ("medium", "Medium Energy"),
        High => ("high", "High Energy"),
    }
}

choice_enum! {
    /// How a timebox session ended
    pub enum SessionOutcome default Completed {
        Completed => ("completed", "Completed Successfully"),
        Partial => ("partial", "Partially Completed"),
        Interrupted => ("interrupted", "Interrupted"),
        Abandoned => ("abandoned", "Abandoned"),
    }
}

choice_enum! {
    pub enum HabitFrequency default Daily {
        Daily => ("daily", "Daily"),
        Weekly => ("weekly", "Weekly"),
        Monthly => ("monthly", "Monthly"),
    }
}

choice_enum! {
    pub enum Theme default Light {
        Light => ("light", "Light"),
        Dark => ("dark", "Dark"),
        Auto => ("auto", "Auto"),
    }
}

choice_enum! {
    /// Computed task state, never stored
    pub enum TaskStatus default InProgress {
        Completed => ("completed", "Completed"),
        Overdue => ("overdue", "Overdue"),
        InProgress => ("in_progress", "In Progress"),
    }
}

/// Task priority, stored as its numeric rank (1 is most urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
}

impl Priority {
    pub const ALL: &'static [Self] = &[Self::Critical, Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn rank(self) -> i64 {
        self as i64
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// One step more urgent, saturating at `Critical`
    #[must_use]
    pub const fn escalated(self) -> Self {
        match self {
            Self::Critical | Self::High => Self::Critical,
            Self::Medium => Self::High,
            Self::Low => Self::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TryFrom<i64> for Priority {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Critical),
            2 => Ok(Self::High),
            3 => Ok(Self::Medium),
            4 => Ok(Self::Low),
            _ => Err(format!("Priority must be between 1 and 4, got {value}")),
        }
    }
}

impl From<Priority> for i64 {
    fn from(p: Priority) -> Self {
        p.rank()
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(rank) = s.trim().parse::<i64>() {
            return Self::try_from(rank);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown priority: {s}"))
    }
}

/// Life area used to group tasks, goals and habits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: CategoryType,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_CATEGORY_COLOR: &str = "#3498db";
pub const DEFAULT_CATEGORY_ICON: &str = "\u{1f4cb}";

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>, category_type: CategoryType) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            category_type,
            description: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

/// Time target for a category over a recurring period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub target_hours_per_period: f64,
    pub period: GoalPeriod,
    pub status: GoalStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    #[must_use]
    pub fn new(title: impl Into<String>, category_id: i64, target_hours_per_period: f64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            description: String::new(),
            category_id,
            // stored with one decimal place
            target_hours_per_period: (target_hours_per_period * 10.0).round() / 10.0,
            period: GoalPeriod::default(),
            status: GoalStatus::default(),
            start_date: now.date_naive(),
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn target_minutes(&self) -> f64 {
        self.target_hours_per_period * 60.0
    }
}

/// A unit of work that sessions are logged against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub goal_id: Option<i64>,
    pub priority: Priority,
    pub energy_level: EnergyLevel,
    pub estimated_minutes: u32,
    pub actual_minutes: u32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn new(title: impl Into<String>, category_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            description: String::new(),
            category_id,
            goal_id: None,
            priority: Priority::default(),
            energy_level: EnergyLevel::default(),
            estimated_minutes: 25,
            actual_minutes: 0,
            is_completed: false,
            completed_at: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| now > due)
    }

    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> TaskStatus {
        if self.is_completed {
            TaskStatus::Completed
        } else if self.is_overdue(now) {
            TaskStatus::Overdue
        } else {
            TaskStatus::InProgress
        }
    }

    /// Mark completed (or reopen) and stamp `completed_at` accordingly
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.is_completed = completed;
        self.completed_at = completed.then_some(now);
    }
}

/// A recorded timebox of focused work against a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub planned_minutes: u32,
    pub actual_minutes: Option<u32>,
    pub outcome: Option<SessionOutcome>,
    pub focus_rating: Option<u8>,
    pub energy_before: Option<u8>,
    pub energy_after: Option<u8>,
    pub notes: String,
    pub distractions: String,
    pub key_insights: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(task_id: i64, start_time: DateTime<Utc>, planned_minutes: u32) -> Self {
        Self {
            id: 0,
            task_id,
            start_time,
            end_time: None,
            planned_minutes,
            actual_minutes: None,
            outcome: None,
            focus_rating: None,
            energy_before: None,
            energy_after: None,
            notes: String::new(),
            distractions: String::new(),
            key_insights: String::new(),
            created_at: start_time,
            updated_at: start_time,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whole minutes elapsed since start, never less than one nor above `MAX_ACTUAL_MINUTES`
    #[must_use]
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        let minutes = now.signed_duration_since(self.start_time).num_minutes();
        u32::try_from(minutes)
            .unwrap_or(0)
            .clamp(1, crate::validation::MAX_ACTUAL_MINUTES)
    }

    #[must_use]
    pub fn duration_display(&self) -> String {
        match self.actual_minutes {
            Some(minutes) if minutes > 0 => {
                let hours = minutes / 60;
                let rest = minutes % 60;
                if hours > 0 {
                    format!("{hours}h {rest}m")
                } else {
                    format!("{rest}m")
                }
            }
            _ => "0m".to_string(),
        }
    }

    /// Planned vs actual time as a percentage, capped at 100
    #[must_use]
    pub fn efficiency_score(&self) -> f64 {
        match self.actual_minutes {
            Some(actual) if actual > 0 && self.planned_minutes > 0 => {
                (f64::from(self.planned_minutes) / f64::from(actual) * 100.0).min(100.0)
            }
            _ => 0.0,
        }
    }

    /// Weighted focus (40), efficiency (30) and outcome (30) score
    #[must_use]
    pub fn productivity_score(&self) -> f64 {
        let Some(focus) = self.focus_rating else {
            return 0.0;
        };
        let focus_score = f64::from(focus) / 5.0 * 40.0;
        let efficiency_score = self.efficiency_score() / 100.0 * 30.0;
        let completion_score = match self.outcome {
            Some(SessionOutcome::Completed) => 30.0,
            Some(SessionOutcome::Partial) => 15.0,
            _ => 0.0,
        };
        focus_score + efficiency_score + completion_score
    }
}

/// Recurring behaviour tracked by daily logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub frequency: HabitFrequency,
    pub target_per_period: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    #[must_use]
    pub fn new(name: impl Into<String>, category_id: i64, frequency: HabitFrequency) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            category_id,
            frequency,
            target_per_period: 1,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitLog {
    pub id: i64,
    pub habit_id: i64,
    pub date: NaiveDate,
    pub completed: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// End-of-day self assessment; one per date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: i64,
    pub date: NaiveDate,
    pub overall_productivity: u8,
    pub energy_level: u8,
    pub mood: u8,
    pub stress_level: u8,
    pub wins: String,
    pub challenges: String,
    pub improvements: String,
    pub tomorrow_focus: String,
    pub gratitude: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reflection {
    /// Unsaved draft with neutral ratings
    #[must_use]
    pub fn draft(date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            date,
            overall_productivity: 3,
            energy_level: 3,
            mood: 3,
            stress_level: 3,
            wins: String::new(),
            challenges: String::new(),
            improvements: String::new(),
            tomorrow_focus: String::new(),
            gratitude: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.id > 0
    }
}

/// Weekly retrospective with a quantitative snapshot of the week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReview {
    pub id: i64,
    pub week_start_date: NaiveDate,
    pub total_sessions: u32,
    pub total_minutes: u32,
    pub average_focus_rating: Option<f64>,
    pub goals_achieved: u32,
    pub goals_total: u32,
    pub biggest_wins: String,
    pub main_challenges: String,
    pub lessons_learned: String,
    pub next_week_focus: String,
    pub process_improvements: String,
    pub created_at: DateTime<Utc>,
}

/// Free-text portion of a weekly review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReviewText {
    pub biggest_wins: String,
    pub main_challenges: String,
    pub lessons_learned: String,
    pub next_week_focus: String,
    pub process_improvements: String,
}

/// Single-row user preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Preferences {
    pub default_work_duration: u32,
    pub default_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
    pub daily_goal_sessions: u32,
    pub weekly_goal_hours: f64,
    pub enable_notifications: bool,
    pub notification_sound: bool,
    pub session_reminders: bool,
    pub break_reminders: bool,
    pub theme: Theme,
    pub show_analytics_dashboard: bool,
    pub compact_task_view: bool,
    pub share_anonymous_stats: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_work_duration: 25,
            default_break_duration: 5,
            long_break_duration: 15,
            sessions_before_long_break: 4,
            daily_goal_sessions: 8,
            weekly_goal_hours: 20.0,
            enable_notifications: true,
            notification_sound: true,
            session_reminders: true,
            break_reminders: true,
            theme: Theme::default(),
            show_analytics_dashboard: true,
            compact_task_view: false,
            share_anonymous_stats: false,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_choice_enum_parses_case_insensitively() {
        assert_eq!("Weekly".parse::<GoalPeriod>(), Ok(GoalPeriod::Weekly));
        assert_eq!(" work ".parse::<CategoryType>(), Ok(CategoryType::Work));
        assert!("fortnightly".parse::<GoalPeriod>().is_err());
    }

    #[test]
    fn test_choice_enum_labels() {
        assert_eq!(SessionOutcome::Completed.label(), "Completed Successfully");
        assert_eq!(CategoryType::Spirituality.label(), "Spirituality & Mindfulness");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
    }

    #[test]
    fn test_priority_parse_and_escalate() {
        assert_eq!("2".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
        assert!("9".parse::<Priority>().is_err());
        assert_eq!(Priority::Low.escalated(), Priority::Medium);
        assert_eq!(Priority::Critical.escalated(), Priority::Critical);
    }

    #[test]
    fn test_priority_serializes_as_rank() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "2");
        let parsed: Priority = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_task_status() {
        let now = Utc::now();
        let mut task = Task::new("Write report", 1);
        assert_eq!(task.status(now), TaskStatus::InProgress);

        task.due_date = Some(now - Duration::hours(2));
        assert!(task.is_overdue(now));
        assert_eq!(task.status(now), TaskStatus::Overdue);

        task.set_completed(true, now);
        assert!(!task.is_overdue(now));
        assert_eq!(task.status(now), TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now));

        task.set_completed(false, now);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn test_session_duration_display() {
        let mut session = Session::new(1, Utc::now(), 25);
        assert_eq!(session.duration_display(), "0m");
        session.actual_minutes = Some(45);
        assert_eq!(session.duration_display(), "45m");
        session.actual_minutes = Some(65);
        assert_eq!(session.duration_display(), "1h 5m");
    }

    #[test]
    fn test_session_elapsed_minutes_floor_of_one() {
        let start = Utc::now();
        let session = Session::new(1, start, 25);
        assert_eq!(session.elapsed_minutes(start + Duration::seconds(20)), 1);
        assert_eq!(session.elapsed_minutes(start + Duration::seconds(150)), 2);
    }

    #[test]
    fn test_session_scores() {
        let mut session = Session::new(1, Utc::now(), 25);
        assert!(session.productivity_score().abs() < f64::EPSILON);

        session.actual_minutes = Some(50);
        session.focus_rating = Some(5);
        session.outcome = Some(SessionOutcome::Completed);
        assert!((session.efficiency_score() - 50.0).abs() < 1e-9);
        // 40 + 15 + 30
        assert!((session.productivity_score() - 85.0).abs() < 1e-9);

        session.actual_minutes = Some(20);
        assert!((session.efficiency_score() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_goal_target_rounded_to_one_decimal() {
        let goal = Goal::new("Read", 1, 2.46);
        assert!((goal.target_hours_per_period - 2.5).abs() < 1e-9);
        assert!((goal.target_minutes() - 150.0).abs() < 1e-9);
    }
}
