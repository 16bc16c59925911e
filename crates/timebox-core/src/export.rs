//! CSV, JSON and ZIP exports of everything the user has recorded.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use timebox_storage::Database;

/// Something that can be exported on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportEntity {
    Sessions,
    Tasks,
    Categories,
    Goals,
    Habits,
    Reflections,
}

impl ExportEntity {
    pub const ALL: [Self; 6] = [
        Self::Sessions,
        Self::Tasks,
        Self::Categories,
        Self::Goals,
        Self::Habits,
        Self::Reflections,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sessions => "sessions",
            Self::Tasks => "tasks",
            Self::Categories => "categories",
            Self::Goals => "goals",
            Self::Habits => "habits",
            Self::Reflections => "reflections",
        }
    }

    #[must_use]
    pub const fn csv_header(self) -> &'static [&'static str] {
        match self {
            Self::Sessions => &[
                "Date",
                "Task",
                "Category",
                "Duration (min)",
                "Focus Rating",
                "Outcome",
                "Notes",
            ],
            Self::Tasks => &[
                "Title",
                "Category",
                "Goal",
                "Priority",
                "Energy Level",
                "Estimated Minutes",
                "Actual Minutes",
                "Status",
                "Due Date",
                "Created At",
                "Completed At",
            ],
            Self::Categories => &[
                "Name",
                "Type",
                "Description",
                "Color",
                "Icon",
                "Is Active",
                "Created At",
            ],
            Self::Goals => &[
                "Title",
                "Category",
                "Target Hours",
                "Period",
                "Status",
                "Start Date",
                "End Date",
                "Created At",
            ],
            Self::Habits => &[
                "Name",
                "Category",
                "Description",
                "Frequency",
                "Target Per Period",
                "Is Active",
                "Created At",
            ],
            Self::Reflections => &[
                "Date",
                "Productivity",
                "Energy Level",
                "Mood",
                "Stress Level",
                "Wins",
                "Challenges",
                "Improvements",
                "Tomorrow Focus",
                "Gratitude",
                "Created At",
            ],
        }
    }

    /// Download name, e.g. `timebox_sessions.csv`
    #[must_use]
    pub fn file_name(self, format: ExportFormat) -> String {
        format!("timebox_{}.{}", self.as_str(), format.extension())
    }
}

impl std::str::FromStr for ExportEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == key)
            .ok_or_else(|| format!("Unknown export: {s}"))
    }
}

impl std::fmt::Display for ExportEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown export format: {other}")),
        }
    }
}

pub const ALL_JSON_FILE_NAME: &str = "timebox_all_data.json";
pub const ALL_ZIP_FILE_NAME: &str = "timebox_data_export.zip";

// ==================== Export Records ====================

#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub task: String,
    pub category: String,
    pub planned_minutes: u32,
    pub actual_minutes: Option<u32>,
    pub focus_rating: Option<u8>,
    pub outcome: Option<&'static str>,
    pub energy_before: Option<u8>,
    pub energy_after: Option<u8>,
    pub notes: String,
    pub distractions: String,
    pub key_insights: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub goal: Option<String>,
    pub priority: &'static str,
    pub energy_level: &'static str,
    pub estimated_minutes: u32,
    pub actual_minutes: u32,
    pub is_completed: bool,
    pub status: &'static str,
    pub due_date: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub category_type: &'static str,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Decimal text such as "5.0"
    pub target_hours_per_period: String,
    pub period: &'static str,
    pub status: &'static str,
    pub start_date: String,
    pub end_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub frequency: &'static str,
    pub target_per_period: u32,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReflectionRecord {
    pub id: i64,
    pub date: String,
    pub overall_productivity: u8,
    pub energy_level: u8,
    pub mood: u8,
    pub stress_level: u8,
    pub wins: String,
    pub challenges: String,
    pub improvements: String,
    pub tomorrow_focus: String,
    pub gratitude: String,
    pub created_at: String,
}

/// Every exportable record, labels resolved
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportData {
    pub sessions: Vec<SessionRecord>,
    pub tasks: Vec<TaskRecord>,
    pub categories: Vec<CategoryRecord>,
    pub goals: Vec<GoalRecord>,
    pub habits: Vec<HabitRecord>,
    pub reflections: Vec<ReflectionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullExport {
    pub export_date: String,
    pub user: String,
    pub data: ExportData,
}

fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn opt_text<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ExportData {
    /// Read everything from the database
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn collect(db: &Database, now: DateTime<Utc>) -> Result<Self> {
        let categories = db.list_categories(false)?;
        let category_names: HashMap<i64, String> =
            categories.iter().map(|c| (c.id, c.name.clone())).collect();
        let goals = db.list_goals(None)?;
        let goal_titles: HashMap<i64, String> =
            goals.iter().map(|g| (g.id, g.title.clone())).collect();
        let category_name = |id: i64| category_names.get(&id).cloned().unwrap_or_default();

        let sessions = db
            .all_session_details()?
            .into_iter()
            .map(|d| SessionRecord {
                id: d.session.id,
                date: d.session.start_time.date_naive().to_string(),
                start_time: iso(d.session.start_time),
                end_time: d.session.end_time.map(iso),
                task: d.task_title,
                category: d.category_name,
                planned_minutes: d.session.planned_minutes,
                actual_minutes: d.session.actual_minutes,
                focus_rating: d.session.focus_rating,
                outcome: d.session.outcome.map(|o| o.label()),
                energy_before: d.session.energy_before,
                energy_after: d.session.energy_after,
                notes: d.session.notes,
                distractions: d.session.distractions,
                key_insights: d.session.key_insights,
                created_at: iso(d.session.created_at),
            })
            .collect();

        let tasks = db
            .all_tasks()?
            .into_iter()
            .map(|t| TaskRecord {
                id: t.id,
                status: t.status(now).label(),
                category: category_name(t.category_id),
                goal: t.goal_id.and_then(|id| goal_titles.get(&id).cloned()),
                priority: t.priority.label(),
                energy_level: t.energy_level.label(),
                estimated_minutes: t.estimated_minutes,
                actual_minutes: t.actual_minutes,
                is_completed: t.is_completed,
                due_date: t.due_date.map(iso),
                created_at: iso(t.created_at),
                completed_at: t.completed_at.map(iso),
                title: t.title,
                description: t.description,
            })
            .collect();

        let habits = db
            .list_habits(false)?
            .into_iter()
            .map(|h| HabitRecord {
                id: h.id,
                category: category_name(h.category_id),
                frequency: h.frequency.label(),
                target_per_period: h.target_per_period,
                is_active: h.is_active,
                created_at: iso(h.created_at),
                name: h.name,
                description: h.description,
            })
            .collect();

        let goals = goals
            .into_iter()
            .map(|g| GoalRecord {
                id: g.id,
                category: category_name(g.category_id),
                target_hours_per_period: format!("{:.1}", g.target_hours_per_period),
                period: g.period.label(),
                status: g.status.label(),
                start_date: g.start_date.to_string(),
                end_date: g.end_date.map(|d| d.to_string()),
                created_at: iso(g.created_at),
                title: g.title,
                description: g.description,
            })
            .collect();

        let categories = categories
            .into_iter()
            .map(|c| CategoryRecord {
                id: c.id,
                category_type: c.category_type.label(),
                is_active: c.is_active,
                created_at: iso(c.created_at),
                name: c.name,
                description: c.description,
                color: c.color,
                icon: c.icon,
            })
            .collect();

        let reflections = db
            .list_reflections()?
            .into_iter()
            .map(|r| ReflectionRecord {
                id: r.id,
                date: r.date.to_string(),
                overall_productivity: r.overall_productivity,
                energy_level: r.energy_level,
                mood: r.mood,
                stress_level: r.stress_level,
                created_at: iso(r.created_at),
                wins: r.wins,
                challenges: r.challenges,
                improvements: r.improvements,
                tomorrow_focus: r.tomorrow_focus,
                gratitude: r.gratitude,
            })
            .collect();

        Ok(Self {
            sessions,
            tasks,
            categories,
            goals,
            habits,
            reflections,
        })
    }

    fn csv_rows(&self, entity: ExportEntity) -> Vec<Vec<String>> {
        match entity {
            ExportEntity::Sessions => self
                .sessions
                .iter()
                .map(|s| {
                    vec![
                        s.date.clone(),
                        s.task.clone(),
                        s.category.clone(),
                        s.actual_minutes.unwrap_or(0).to_string(),
                        opt_text(s.focus_rating),
                        opt_text(s.outcome),
                        s.notes.clone(),
                    ]
                })
                .collect(),
            ExportEntity::Tasks => self
                .tasks
                .iter()
                .map(|t| {
                    vec![
                        t.title.clone(),
                        t.category.clone(),
                        t.goal.clone().unwrap_or_default(),
                        t.priority.to_string(),
                        t.energy_level.to_string(),
                        t.estimated_minutes.to_string(),
                        t.actual_minutes.to_string(),
                        t.status.to_string(),
                        t.due_date.clone().unwrap_or_default(),
                        t.created_at.clone(),
                        t.completed_at.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
            ExportEntity::Categories => self
                .categories
                .iter()
                .map(|c| {
                    vec![
                        c.name.clone(),
                        c.category_type.to_string(),
                        c.description.clone(),
                        c.color.clone(),
                        c.icon.clone(),
                        c.is_active.to_string(),
                        c.created_at.clone(),
                    ]
                })
                .collect(),
            ExportEntity::Goals => self
                .goals
                .iter()
                .map(|g| {
                    vec![
                        g.title.clone(),
                        g.category.clone(),
                        g.target_hours_per_period.clone(),
                        g.period.to_string(),
                        g.status.to_string(),
                        g.start_date.clone(),
                        g.end_date.clone().unwrap_or_default(),
                        g.created_at.clone(),
                    ]
                })
                .collect(),
            ExportEntity::Habits => self
                .habits
                .iter()
                .map(|h| {
                    vec![
                        h.name.clone(),
                        h.category.clone(),
                        h.description.clone(),
                        h.frequency.to_string(),
                        h.target_per_period.to_string(),
                        h.is_active.to_string(),
                        h.created_at.clone(),
                    ]
                })
                .collect(),
            ExportEntity::Reflections => self
                .reflections
                .iter()
                .map(|r| {
                    vec![
                        r.date.clone(),
                        r.overall_productivity.to_string(),
                        r.energy_level.to_string(),
                        r.mood.to_string(),
                        r.stress_level.to_string(),
                        r.wins.clone(),
                        r.challenges.clone(),
                        r.improvements.clone(),
                        r.tomorrow_focus.clone(),
                        r.gratitude.clone(),
                        r.created_at.clone(),
                    ]
                })
                .collect(),
        }
    }

    /// One entity as CSV with its header row
    ///
    /// # Errors
    ///
    /// Returns an error if CSV writing fails
    pub fn to_csv(&self, entity: ExportEntity) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(entity.csv_header())?;
        for row in self.csv_rows(entity) {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to finish {entity} CSV: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV export is not valid UTF-8")
    }

    /// One entity as a pretty-printed JSON array
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self, entity: ExportEntity) -> Result<String> {
        let json = match entity {
            ExportEntity::Sessions => serde_json::to_string_pretty(&self.sessions),
            ExportEntity::Tasks => serde_json::to_string_pretty(&self.tasks),
            ExportEntity::Categories => serde_json::to_string_pretty(&self.categories),
            ExportEntity::Goals => serde_json::to_string_pretty(&self.goals),
            ExportEntity::Habits => serde_json::to_string_pretty(&self.habits),
            ExportEntity::Reflections => serde_json::to_string_pretty(&self.reflections),
        };
        json.with_context(|| format!("Failed to serialize {entity} export"))
    }
}

/// One entity in the requested format
///
/// # Errors
///
/// Returns an error if a database query or serialization fails
pub fn export_entity(
    db: &Database,
    entity: ExportEntity,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<String> {
    let data = ExportData::collect(db, now)?;
    match format {
        ExportFormat::Csv => data.to_csv(entity),
        ExportFormat::Json => data.to_json(entity),
    }
}

/// Everything in one JSON document, stamped with the export time and profile name
///
/// # Errors
///
/// Returns an error if a database query or serialization fails
pub fn export_all_json(db: &Database, profile: &str, now: DateTime<Utc>) -> Result<String> {
    let export = FullExport {
        export_date: iso(now),
        user: profile.to_string(),
        data: ExportData::collect(db, now)?,
    };
    let json = serde_json::to_string_pretty(&export).context("Failed to serialize full export")?;
    log::info!("Exported all data as JSON ({} bytes)", json.len());
    Ok(json)
}

/// The six CSV files in one deflated ZIP archive
///
/// # Errors
///
/// Returns an error if a database query or archive writing fails
pub fn export_all_zip(db: &Database, now: DateTime<Utc>) -> Result<Vec<u8>> {
    let data = ExportData::collect(db, now)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entity in ExportEntity::ALL {
        let csv = data.to_csv(entity)?;
        zip.start_file(format!("{entity}.csv"), options)
            .with_context(|| format!("Failed to add {entity}.csv to archive"))?;
        zip.write_all(csv.as_bytes())?;
    }
    let bytes = zip.finish().context("Failed to finish archive")?.into_inner();
    log::info!("Exported all data as ZIP ({} bytes)", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::io::Read;
    use timebox_storage::{Goal, Session, SessionOutcome, Task};

    fn seeded() -> (Database, DateTime<Utc>) {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let category = db.find_category_by_name("Work & Career").unwrap().unwrap().id;
        let goal = db.create_goal(&Goal::new("Ship v1", category, 5.0)).unwrap();

        let mut task = Task::new("Write, then \"edit\" report", category);
        task.goal_id = Some(goal);
        let task_id = db.create_task(&task).unwrap();

        let start = now - Duration::hours(3);
        let mut session = Session::new(task_id, start, 25);
        session.end_time = Some(start + Duration::minutes(30));
        session.actual_minutes = Some(30);
        session.outcome = Some(SessionOutcome::Completed);
        session.notes = "Good run".into();
        db.create_session(&session).unwrap();
        (db, now)
    }

    #[test]
    fn test_entity_parsing_and_file_names() {
        assert_eq!("Sessions".parse::<ExportEntity>(), Ok(ExportEntity::Sessions));
        assert!("users".parse::<ExportEntity>().is_err());
        assert_eq!(
            ExportEntity::Goals.file_name(ExportFormat::Csv),
            "timebox_goals.csv"
        );
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
    }

    #[test]
    fn test_sessions_csv_uses_labels() {
        let (db, now) = seeded();
        let csv = export_entity(&db, ExportEntity::Sessions, ExportFormat::Csv, now).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Task,Category,Duration (min),Focus Rating,Outcome,Notes")
        );
        assert_eq!(
            lines.next(),
            Some("2024-03-10,\"Write, then \"\"edit\"\" report\",Work & Career,30,,Completed Successfully,Good run")
        );
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let db = Database::open_in_memory().unwrap();
        let csv = export_entity(&db, ExportEntity::Reflections, ExportFormat::Csv, Utc::now())
            .unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("Date,Productivity,Energy Level,Mood"));
    }

    #[test]
    fn test_tasks_json_resolves_names() {
        let (db, now) = seeded();
        let json = export_entity(&db, ExportEntity::Tasks, ExportFormat::Json, now).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["category"], "Work & Career");
        assert_eq!(value[0]["goal"], "Ship v1");
        assert_eq!(value[0]["priority"], "Medium");
        assert_eq!(value[0]["status"], "In Progress");

        let goals = export_entity(&db, ExportEntity::Goals, ExportFormat::Json, now).unwrap();
        let value: serde_json::Value = serde_json::from_str(&goals).unwrap();
        assert_eq!(value[0]["target_hours_per_period"], "5.0");
    }

    #[test]
    fn test_export_all_json_envelope() {
        let (db, now) = seeded();
        let json = export_all_json(&db, "sam", now).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["user"], "sam");
        assert_eq!(value["data"]["sessions"][0]["outcome"], "Completed Successfully");
        assert_eq!(value["data"]["categories"].as_array().unwrap().len(), 5);
        assert!(value["data"]["habits"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_export_all_zip_contains_six_csvs() {
        let (db, now) = seeded();
        let bytes = export_all_zip(&db, now).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 6);

        let mut tasks = String::new();
        archive
            .by_name("tasks.csv")
            .unwrap()
            .read_to_string(&mut tasks)
            .unwrap();
        assert!(tasks.starts_with("Title,Category,Goal,Priority"));
        assert!(tasks.contains("Ship v1"));
    }
}
