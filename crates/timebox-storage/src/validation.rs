//! Field-level checks applied before any record is written.

use thiserror::Error;

use crate::models::{Category, Goal, Habit, Reflection, Session, Task, WeeklyReview};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_TARGET_HOURS: f64 = 9999.9;
/// A single timebox is planned for at most a day
pub const MAX_PLANNED_MINUTES: u32 = 1440;
/// Recorded length of one session, at most a year
pub const MAX_ACTUAL_MINUTES: u32 = 525_600;

/// A value rejected by validation; carries the offending field name
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field} must be a hex color like #3498db, got '{value}'")]
    InvalidColor { field: &'static str, value: String },

    #[error("{field} must not be before {earlier}")]
    OutOfOrder {
        field: &'static str,
        earlier: &'static str,
    },

    #[error("You already have a category named '{name}'")]
    DuplicateCategory { name: String },
}

pub type ValidationResult = Result<(), ValidationError>;

fn required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(())
    }
}

fn max_chars(field: &'static str, value: &str, max: usize) -> ValidationResult {
    if value.chars().count() > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> ValidationResult {
    if value < min || value > max || value.is_nan() {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    } else {
        Ok(())
    }
}

/// Ratings are 1..=5 wherever they appear
pub fn rating(field: &'static str, value: u8) -> ValidationResult {
    in_range(field, f64::from(value), 1.0, 5.0)
}

fn optional_rating(field: &'static str, value: Option<u8>) -> ValidationResult {
    value.map_or(Ok(()), |v| rating(field, v))
}

/// `#` followed by exactly six hex digits
pub fn color(field: &'static str, value: &str) -> ValidationResult {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor {
            field,
            value: value.to_string(),
        })
    }
}

/// Validate a category's own fields (uniqueness is checked by the database layer)
///
/// # Errors
///
/// Returns the first failing field
pub fn validate_category(category: &Category) -> ValidationResult {
    required("name", &category.name)?;
    max_chars("name", &category.name, MAX_NAME_CHARS)?;
    color("color", &category.color)?;
    max_chars("icon", &category.icon, 50)
}

/// # Errors
///
/// Returns the first failing field
pub fn validate_task(task: &Task) -> ValidationResult {
    required("title", &task.title)?;
    max_chars("title", &task.title, MAX_TITLE_CHARS)
}

/// # Errors
///
/// Returns the first failing field
pub fn validate_goal(goal: &Goal) -> ValidationResult {
    required("title", &goal.title)?;
    max_chars("title", &goal.title, MAX_TITLE_CHARS)?;
    if goal.target_hours_per_period <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "target_hours_per_period",
            min: 0.1,
            max: MAX_TARGET_HOURS,
            value: goal.target_hours_per_period,
        });
    }
    in_range(
        "target_hours_per_period",
        goal.target_hours_per_period,
        0.1,
        MAX_TARGET_HOURS,
    )
}

/// # Errors
///
/// Returns the first failing field
pub fn validate_session(session: &Session) -> ValidationResult {
    in_range(
        "planned_minutes",
        f64::from(session.planned_minutes),
        1.0,
        f64::from(MAX_PLANNED_MINUTES),
    )?;
    if let Some(actual) = session.actual_minutes {
        in_range(
            "actual_minutes",
            f64::from(actual),
            0.0,
            f64::from(MAX_ACTUAL_MINUTES),
        )?;
    }
    optional_rating("focus_rating", session.focus_rating)?;
    optional_rating("energy_before", session.energy_before)?;
    optional_rating("energy_after", session.energy_after)
}

/// # Errors
///
/// Returns the first failing field
pub fn validate_habit(habit: &Habit) -> ValidationResult {
    required("name", &habit.name)?;
    max_chars("name", &habit.name, MAX_NAME_CHARS)?;
    if habit.target_per_period == 0 {
        return Err(ValidationError::OutOfRange {
            field: "target_per_period",
            min: 1.0,
            max: f64::from(u32::MAX),
            value: 0.0,
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns the first failing field
pub fn validate_reflection(reflection: &Reflection) -> ValidationResult {
    rating("overall_productivity", reflection.overall_productivity)?;
    rating("energy_level", reflection.energy_level)?;
    rating("mood", reflection.mood)?;
    rating("stress_level", reflection.stress_level)?;
    required("wins", &reflection.wins)?;
    required("challenges", &reflection.challenges)?;
    required("improvements", &reflection.improvements)?;
    required("tomorrow_focus", &reflection.tomorrow_focus)
}

/// # Errors
///
/// Returns the first failing field
pub fn validate_weekly_review(review: &WeeklyReview) -> ValidationResult {
    required("biggest_wins", &review.biggest_wins)?;
    required("main_challenges", &review.main_challenges)?;
    required("lessons_learned", &review.lessons_learned)?;
    required("next_week_focus", &review.next_week_focus)
}

/// Clamp a percentage into 0..=100
#[must_use]
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryType, HabitFrequency};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_category_requires_name() {
        let category = Category::new("   ", CategoryType::Work);
        assert_eq!(
            validate_category(&category),
            Err(ValidationError::Required { field: "name" })
        );
    }

    #[test]
    fn test_category_name_length() {
        let category = Category::new("x".repeat(101), CategoryType::Work);
        assert_eq!(
            validate_category(&category),
            Err(ValidationError::TooLong {
                field: "name",
                max: 100
            })
        );
    }

    #[test]
    fn test_color_format() {
        assert!(color("color", "#3498db").is_ok());
        assert!(color("color", "#ABCDEF").is_ok());
        assert!(color("color", "3498db").is_err());
        assert!(color("color", "#3498d").is_err());
        assert!(color("color", "#34z8db").is_err());
    }

    #[test]
    fn test_goal_target_must_be_positive() {
        let goal = Goal::new("Run", 1, 0.0);
        assert!(matches!(
            validate_goal(&goal),
            Err(ValidationError::OutOfRange {
                field: "target_hours_per_period",
                ..
            })
        ));
        assert!(validate_goal(&Goal::new("Run", 1, 3.5)).is_ok());
    }

    #[test]
    fn test_session_rating_bounds() {
        let mut session = Session::new(1, Utc::now(), 25);
        session.focus_rating = Some(5);
        assert!(validate_session(&session).is_ok());
        session.focus_rating = Some(6);
        assert!(validate_session(&session).is_err());
        session.focus_rating = Some(0);
        assert!(validate_session(&session).is_err());
        session.focus_rating = None;
        session.planned_minutes = 0;
        assert!(validate_session(&session).is_err());
    }

    #[test]
    fn test_session_minutes_are_bounded() {
        let mut session = Session::new(1, Utc::now(), MAX_PLANNED_MINUTES);
        assert!(validate_session(&session).is_ok());
        session.planned_minutes = MAX_PLANNED_MINUTES + 1;
        assert!(matches!(
            validate_session(&session),
            Err(ValidationError::OutOfRange { field: "planned_minutes", .. })
        ));

        session.planned_minutes = 25;
        session.actual_minutes = Some(MAX_ACTUAL_MINUTES);
        assert!(validate_session(&session).is_ok());
        session.actual_minutes = Some(3_000_000_000);
        assert!(matches!(
            validate_session(&session),
            Err(ValidationError::OutOfRange { field: "actual_minutes", .. })
        ));
    }

    #[test]
    fn test_habit_target_at_least_one() {
        let mut habit = Habit::new("Stretch", 1, HabitFrequency::Daily);
        assert!(validate_habit(&habit).is_ok());
        habit.target_per_period = 0;
        assert!(validate_habit(&habit).is_err());
    }

    #[test]
    fn test_reflection_requires_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut reflection = Reflection::draft(date);
        assert_eq!(
            validate_reflection(&reflection),
            Err(ValidationError::Required { field: "wins" })
        );
        reflection.wins = "Shipped".into();
        reflection.challenges = "Meetings".into();
        reflection.improvements = "Batch email".into();
        reflection.tomorrow_focus = "Tests".into();
        assert!(validate_reflection(&reflection).is_ok());
        reflection.mood = 7;
        assert!(validate_reflection(&reflection).is_err());
    }

    #[test]
    fn test_clamp_percentage() {
        assert!((clamp_percentage(140.0) - 100.0).abs() < f64::EPSILON);
        assert!(clamp_percentage(-3.0).abs() < f64::EPSILON);
        assert!(clamp_percentage(f64::NAN).abs() < f64::EPSILON);
    }
}
