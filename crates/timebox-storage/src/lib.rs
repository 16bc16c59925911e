pub mod db;
pub mod migrations;
pub mod models;
pub mod validation;

pub use db::{
    fmt_date, fmt_datetime, CategoryMinutes, Database, DayTotals, NotFound, SessionDetail,
    TaskCounts, TaskFilter, TaskPage, TaskQuery, TASK_PAGE_SIZE,
};
pub use models::{
    Category, CategoryType, EnergyLevel, Goal, GoalPeriod, GoalStatus, Habit, HabitFrequency,
    HabitLog, Preferences, Priority, Reflection, Session, SessionOutcome, Task, TaskStatus, Theme,
    WeeklyReview, WeeklyReviewText,
};
pub use validation::ValidationError;
