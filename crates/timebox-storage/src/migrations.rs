use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::db::fmt_datetime;

/// Categories seeded into an empty database: (name, type, color, icon)
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str, &str)] = &[
    ("Work & Career", "work", "#3498db", "\u{1f4bc}"),
    ("Health & Fitness", "health", "#e74c3c", "\u{1f4aa}"),
    ("Learning & Development", "learning", "#f39c12", "\u{1f4da}"),
    ("Personal Life", "personal", "#2ecc71", "\u{1f3e0}"),
    ("Hobbies & Interests", "hobbies", "#9b59b6", "\u{1f3a8}"),
];

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if database table creation or index creation fails
#[allow(clippy::too_many_lines)]
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // Categories - life areas that group tasks, goals and habits
    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            category_type TEXT NOT NULL DEFAULT 'other',
            description TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '#3498db',
            icon TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Goals - hour targets per category and period
    conn.execute(
        "CREATE TABLE IF NOT EXISTS goals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER NOT NULL,
            target_hours_per_period REAL NOT NULL,
            period TEXT NOT NULL DEFAULT 'weekly',
            status TEXT NOT NULL DEFAULT 'active',
            start_date TEXT NOT NULL,
            end_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Tasks - units of work; goal link is dropped when the goal goes away
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER NOT NULL,
            goal_id INTEGER,
            priority INTEGER NOT NULL DEFAULT 3,
            energy_level TEXT NOT NULL DEFAULT 'medium',
            estimated_minutes INTEGER NOT NULL DEFAULT 25,
            actual_minutes INTEGER NOT NULL DEFAULT 0,
            is_completed INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            due_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE,
            FOREIGN KEY (goal_id) REFERENCES goals(id) ON DELETE SET NULL
        )",
        [],
    )?;

    // Sessions - timeboxes of focused work; end_time NULL means active
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT,
            planned_minutes INTEGER NOT NULL DEFAULT 25,
            actual_minutes INTEGER,
            outcome TEXT,
            focus_rating INTEGER,
            energy_before INTEGER,
            energy_after INTEGER,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Reflection columns were added to sessions after the first release
    ensure_columns(
        conn,
        "sessions",
        &[
            ("distractions", "TEXT NOT NULL DEFAULT ''"),
            ("key_insights", "TEXT NOT NULL DEFAULT ''"),
        ],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_task ON sessions(task_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(is_completed, due_date)",
        [],
    )?;

    // Habits and their per-day logs
    conn.execute(
        "CREATE TABLE IF NOT EXISTS habits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER NOT NULL,
            frequency TEXT NOT NULL DEFAULT 'daily',
            target_per_period INTEGER NOT NULL DEFAULT 1,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habit_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY (habit_id) REFERENCES habits(id) ON DELETE CASCADE,
            UNIQUE(habit_id, date)
        )",
        [],
    )?;

    // Daily reflections - one per date
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reflections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL UNIQUE,
            overall_productivity INTEGER NOT NULL,
            energy_level INTEGER NOT NULL,
            mood INTEGER NOT NULL,
            stress_level INTEGER NOT NULL,
            wins TEXT NOT NULL,
            challenges TEXT NOT NULL,
            improvements TEXT NOT NULL,
            tomorrow_focus TEXT NOT NULL,
            gratitude TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Weekly reviews - one per Monday
    conn.execute(
        "CREATE TABLE IF NOT EXISTS weekly_reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            week_start_date TEXT NOT NULL UNIQUE,
            total_sessions INTEGER NOT NULL DEFAULT 0,
            total_minutes INTEGER NOT NULL DEFAULT 0,
            average_focus_rating REAL,
            goals_achieved INTEGER NOT NULL DEFAULT 0,
            goals_total INTEGER NOT NULL DEFAULT 0,
            biggest_wins TEXT NOT NULL,
            main_challenges TEXT NOT NULL,
            lessons_learned TEXT NOT NULL,
            next_week_focus TEXT NOT NULL,
            process_improvements TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // Preferences - single row keyed by id = 1
    conn.execute(
        "CREATE TABLE IF NOT EXISTS preferences (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            default_work_duration INTEGER NOT NULL,
            default_break_duration INTEGER NOT NULL,
            long_break_duration INTEGER NOT NULL,
            sessions_before_long_break INTEGER NOT NULL,
            daily_goal_sessions INTEGER NOT NULL,
            weekly_goal_hours REAL NOT NULL,
            enable_notifications INTEGER NOT NULL,
            notification_sound INTEGER NOT NULL,
            session_reminders INTEGER NOT NULL,
            break_reminders INTEGER NOT NULL,
            theme TEXT NOT NULL,
            show_analytics_dashboard INTEGER NOT NULL,
            compact_task_view INTEGER NOT NULL,
            share_anonymous_stats INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Key/value bookkeeping (last scheduler runs and similar)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Add columns that older databases are missing
fn ensure_columns(conn: &Connection, table: &str, columns: &[(&str, &str)]) -> Result<()> {
    for (column_name, column_type) in columns {
        let column_exists: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1"),
            params![column_name],
            |row| row.get(0),
        )?;

        if column_exists == 0 {
            conn.execute(
                &format!("ALTER TABLE {table} ADD COLUMN {column_name} {column_type}"),
                [],
            )?;
            log::info!("Added {column_name} column to {table} table");
        }
    }
    Ok(())
}

/// Seed the default categories when the table is empty
///
/// # Errors
///
/// Returns an error if the count query or any insert fails
pub fn insert_default_categories(conn: &Connection) -> Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    let now = fmt_datetime(Utc::now());
    for (name, category_type, color, icon) in DEFAULT_CATEGORIES {
        conn.execute(
            "INSERT OR IGNORE INTO categories (name, category_type, description, color, icon, is_active, created_at, updated_at)
             VALUES (?1, ?2, '', ?3, ?4, 1, ?5, ?5)",
            params![name, category_type, color, icon, now],
        )?;
    }
    log::info!("Inserted {} default categories", DEFAULT_CATEGORIES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('categories','goals','tasks','sessions','habits','habit_logs','reflections','weekly_reviews','preferences','app_state')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 10);
    }

    #[test]
    fn test_missing_session_columns_are_added() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                planned_minutes INTEGER NOT NULL DEFAULT 25,
                actual_minutes INTEGER,
                outcome TEXT,
                focus_rating INTEGER,
                energy_before INTEGER,
                energy_after INTEGER,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .unwrap();

        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('sessions') WHERE name IN ('distractions', 'key_insights')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_default_categories_seeded_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        insert_default_categories(&conn).unwrap();
        insert_default_categories(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 5);
    }
}
