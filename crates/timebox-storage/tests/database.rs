use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use timebox_storage::{
    Category, CategoryType, Database, Goal, GoalStatus, HabitFrequency, NotFound, Priority,
    Reflection, Session, SessionOutcome, Task, TaskFilter, TaskQuery, ValidationError,
};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn work_category(db: &Database) -> i64 {
    db.find_category_by_name("Work & Career").unwrap().unwrap().id
}

fn finished_session(task_id: i64, start: DateTime<Utc>, minutes: u32, focus: u8) -> Session {
    let mut session = Session::new(task_id, start, 25);
    session.end_time = Some(start + Duration::minutes(i64::from(minutes)));
    session.actual_minutes = Some(minutes);
    session.outcome = Some(SessionOutcome::Completed);
    session.focus_rating = Some(focus);
    session
}

#[test]
fn test_default_categories_present() {
    let db = Database::open_in_memory().unwrap();
    let names: Vec<String> = db
        .list_categories(true)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "Health & Fitness",
            "Hobbies & Interests",
            "Learning & Development",
            "Personal Life",
            "Work & Career",
        ]
    );
}

#[test]
fn test_category_names_unique_case_insensitive() {
    let db = Database::open_in_memory().unwrap();
    let err = db
        .create_category(&Category::new("work & career", CategoryType::Work))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::DuplicateCategory { .. })
    ));

    let id = db
        .create_category(&Category::new("Side Project", CategoryType::Hobbies))
        .unwrap();
    let mut category = db.get_category(id).unwrap().unwrap();
    category.color = "#112233".into();
    db.update_category(&category).unwrap();
    assert_eq!(db.get_category(id).unwrap().unwrap().color, "#112233");
}

#[test]
fn test_missing_rows_report_not_found() {
    let db = Database::open_in_memory().unwrap();
    let err = db.delete_task(999).unwrap_err();
    assert_eq!(err.downcast_ref::<NotFound>(), Some(&NotFound::new("Task", 999)));

    let err = db.create_task(&Task::new("Orphan", 999)).unwrap_err();
    assert_eq!(
        err.downcast_ref::<NotFound>(),
        Some(&NotFound::new("Category", 999))
    );
}

#[test]
fn test_task_filters_search_and_ordering() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let now = at(2024, 3, 15, 12, 0);

    let mut overdue = Task::new("Quarterly report", category_id);
    overdue.priority = Priority::Low;
    overdue.due_date = Some(now - Duration::days(2));
    db.create_task(&overdue).unwrap();

    let mut due_today = Task::new("Call dentist", category_id);
    due_today.priority = Priority::High;
    due_today.due_date = Some(at(2024, 3, 15, 18, 0));
    db.create_task(&due_today).unwrap();

    let mut done = Task::new("Inbox zero", category_id);
    done.set_completed(true, now);
    done.description = "clear the REPORT backlog".into();
    db.create_task(&done).unwrap();

    let undated = Task::new("Read book", category_id);
    db.create_task(&undated).unwrap();

    let titles = |filter: TaskFilter, search: Option<&str>| -> Vec<String> {
        let query = TaskQuery {
            filter,
            search: search.map(String::from),
            page: 1,
            ..TaskQuery::default()
        };
        db.list_tasks(&query, now)
            .unwrap()
            .tasks
            .into_iter()
            .map(|t| t.title)
            .collect()
    };

    // incomplete first, then priority, undated last within a priority
    assert_eq!(
        titles(TaskFilter::All, None),
        vec!["Call dentist", "Read book", "Quarterly report", "Inbox zero"]
    );
    assert_eq!(titles(TaskFilter::Overdue, None), vec!["Quarterly report"]);
    assert_eq!(titles(TaskFilter::Today, None), vec!["Call dentist"]);
    assert_eq!(titles(TaskFilter::Completed, None), vec!["Inbox zero"]);
    assert_eq!(
        titles(TaskFilter::All, Some("report")),
        vec!["Quarterly report", "Inbox zero"]
    );

    let counts = db.task_counts(now).unwrap();
    assert_eq!(counts.total, 4);
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.overdue, 1);
    assert_eq!(counts.in_progress, 3);

    let by_priority = db.pending_counts_by_priority().unwrap();
    assert_eq!(by_priority[1], (Priority::High, 1));
    assert_eq!(by_priority[2], (Priority::Medium, 1));
    assert_eq!(by_priority[3], (Priority::Low, 1));
}

#[test]
fn test_task_pagination_clamps() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    for i in 0..45 {
        db.create_task(&Task::new(format!("Task {i:02}"), category_id))
            .unwrap();
    }
    let now = Utc::now();

    let page = db
        .list_tasks(
            &TaskQuery {
                page: 3,
                ..TaskQuery::default()
            },
            now,
        )
        .unwrap();
    assert_eq!(page.total, 45);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.tasks.len(), 5);

    let page = db
        .list_tasks(
            &TaskQuery {
                page: 99,
                ..TaskQuery::default()
            },
            now,
        )
        .unwrap();
    assert_eq!(page.page, 3);

    let page = db.list_tasks(&TaskQuery::default(), now).unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.tasks.len(), 20);
}

#[test]
fn test_deleting_goal_keeps_tasks() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let goal_id = db.create_goal(&Goal::new("Deep work", category_id, 10.0)).unwrap();

    let mut task = Task::new("Draft chapter", category_id);
    task.goal_id = Some(goal_id);
    let task_id = db.create_task(&task).unwrap();

    db.delete_goal(goal_id).unwrap();
    let task = db.get_task(task_id).unwrap().unwrap();
    assert_eq!(task.goal_id, None);
}

#[test]
fn test_deleting_category_cascades() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let task_id = db.create_task(&Task::new("Plan", category_id)).unwrap();
    db.create_session(&finished_session(task_id, at(2024, 3, 1, 9, 0), 30, 4))
        .unwrap();
    assert_eq!(db.count_tasks_in_category(category_id).unwrap(), 1);

    db.delete_category(category_id).unwrap();
    assert!(db.get_task(task_id).unwrap().is_none());
    assert!(db.all_session_details().unwrap().is_empty());
}

#[test]
fn test_session_aggregates() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let task_id = db.create_task(&Task::new("Code", category_id)).unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    db.create_session(&finished_session(task_id, at(2024, 3, 1, 9, 0), 30, 4))
        .unwrap();
    db.create_session(&finished_session(task_id, at(2024, 3, 1, 14, 0), 50, 2))
        .unwrap();
    db.create_session(&finished_session(task_id, at(2024, 3, 2, 0, 0), 15, 5))
        .unwrap();

    let totals = db.session_totals(day, day).unwrap();
    assert_eq!(totals.sessions, 2);
    assert_eq!(totals.minutes, 80);
    assert_eq!(totals.avg_focus, Some(3.0));

    assert_eq!(db.category_minutes_on(category_id, day).unwrap(), 80);
    assert_eq!(db.category_session_count_on(category_id, day).unwrap(), 2);

    let rows = db
        .category_minutes_between(day, day + Duration::days(1), true)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].minutes, 95);
    assert_eq!(rows[0].sessions, 3);

    assert_eq!(db.logged_minutes_for_task(task_id).unwrap(), 95);
    assert_eq!(
        db.session_dates().unwrap(),
        vec![day + Duration::days(1), day]
    );
    let mut focused = db.focused_session_minutes(None, None).unwrap();
    focused.sort_unstable();
    assert_eq!(focused, vec![15, 30]);
}

#[test]
fn test_active_session_lookup() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let task_id = db.create_task(&Task::new("Write", category_id)).unwrap();
    assert!(db.active_session().unwrap().is_none());

    let start = at(2024, 3, 1, 9, 0);
    let id = db.create_session(&Session::new(task_id, start, 25)).unwrap();
    let active = db.active_session().unwrap().unwrap();
    assert_eq!(active.id, id);
    assert_eq!(active.start_time, start);
    assert_eq!(db.active_session_for_task(task_id).unwrap().unwrap().id, id);
}

#[test]
fn test_habit_log_upsert() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let habit_id = db
        .create_habit(&timebox_storage::Habit::new(
            "Stretch",
            category_id,
            HabitFrequency::Daily,
        ))
        .unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let first = db.log_habit(habit_id, day, false, "").unwrap();
    let second = db.log_habit(habit_id, day, true, "done late").unwrap();
    assert_eq!(first.id, second.id);

    let logs = db.habit_logs(habit_id).unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].completed);
    assert_eq!(logs[0].notes, "done late");
}

#[test]
fn test_reflection_saved_once_per_date() {
    let db = Database::open_in_memory().unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert!(db.reflection_for_date(day).unwrap().is_none());

    let mut reflection = Reflection::draft(day);
    reflection.wins = "Shipped".into();
    reflection.challenges = "Meetings".into();
    reflection.improvements = "Block mornings".into();
    reflection.tomorrow_focus = "Tests".into();
    let saved = db.save_reflection(&reflection).unwrap();
    assert!(saved.is_saved());

    reflection.mood = 5;
    let again = db.save_reflection(&reflection).unwrap();
    assert_eq!(again.id, saved.id);
    assert_eq!(again.mood, 5);
    assert_eq!(db.list_reflections().unwrap().len(), 1);
}

#[test]
fn test_preferences_created_on_first_access() {
    let db = Database::open_in_memory().unwrap();
    let mut prefs = db.get_preferences().unwrap();
    assert_eq!(prefs.default_work_duration, 25);
    assert!(prefs.enable_notifications);

    prefs.enable_notifications = false;
    prefs.default_work_duration = 50;
    db.update_preferences(&prefs).unwrap();
    let reloaded = db.get_preferences().unwrap();
    assert!(!reloaded.enable_notifications);
    assert_eq!(reloaded.default_work_duration, 50);
}

#[test]
fn test_goal_status_filter_and_cleanup() {
    let db = Database::open_in_memory().unwrap();
    let category_id = work_category(&db);
    let mut paused = Goal::new("Paused goal", category_id, 2.0);
    paused.status = GoalStatus::Paused;
    db.create_goal(&paused).unwrap();
    db.create_goal(&Goal::new("Active goal", category_id, 5.0)).unwrap();

    let active = db.list_goals(Some(GoalStatus::Active)).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].title, "Active goal");
    assert_eq!(db.list_goals(None).unwrap().len(), 2);

    let now = at(2024, 6, 1, 0, 0);
    let mut old = Task::new("Old", category_id);
    old.set_completed(true, now - Duration::days(120));
    db.create_task(&old).unwrap();
    let mut recent = Task::new("Recent", category_id);
    recent.set_completed(true, now - Duration::days(10));
    db.create_task(&recent).unwrap();

    let deleted = db
        .delete_completed_tasks_before(now - Duration::days(90))
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(db.find_task_by_title("Old").unwrap().is_none());
    assert!(db.find_task_by_title("Recent").unwrap().is_some());
}
