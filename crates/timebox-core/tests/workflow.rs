use chrono::{Duration, TimeZone, Utc};
use timebox_core::analytics::Analytics;
use timebox_core::export::{export_all_json, export_entity, ExportEntity, ExportFormat};
use timebox_core::goals::{current_period_progress, goals_with_progress};
use timebox_core::session_manager::{CompleteSession, SessionError, SessionManager, StartSession};
use timebox_storage::{Database, Goal, GoalPeriod, GoalStatus, Session, SessionOutcome, Task};

#[test]
fn test_day_of_work_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timebox.db");
    let morning = Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap();

    {
        let db = Database::new(Some(path.clone())).unwrap();
        let category = db.find_category_by_name("Work & Career").unwrap().unwrap().id;
        let mut goal = Goal::new("Focus hours", category, 1.0);
        goal.period = GoalPeriod::Daily;
        db.create_goal(&goal).unwrap();

        let mut task = Task::new("Write proposal", category);
        task.estimated_minutes = 60;
        let task_id = db.create_task(&task).unwrap();

        let manager = SessionManager::new(&db);
        let session = manager
            .start_session(
                &StartSession {
                    task_id,
                    planned_minutes: Some(50),
                    energy_before: Some(4),
                },
                morning,
            )
            .unwrap();

        let second = manager.quick_start(task_id, morning + Duration::minutes(5));
        let err = second.unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::AlreadyActive {
                session_id: session.id
            })
        );

        let report = CompleteSession {
            outcome: SessionOutcome::Completed,
            focus_rating: Some(5),
            distractions: "One phone call".into(),
            ..CompleteSession::default()
        };
        let done = manager
            .complete_session(session.id, &report, morning + Duration::minutes(62))
            .unwrap();
        assert_eq!(done.session.actual_minutes, Some(62));
        assert_eq!(done.break_duration, 15);
    }

    // reopen from disk
    let db = Database::new(Some(path)).unwrap();
    let now = morning + Duration::hours(2);
    let stats = Analytics::new(&db).analytics_stats(7, now).unwrap();
    assert_eq!(stats.totals.sessions, 1);
    assert_eq!(stats.totals.minutes, 62);
    assert_eq!(stats.daily.len(), 7);

    let goals = goals_with_progress(&db, Some(GoalStatus::Active), now.date_naive()).unwrap();
    assert!((goals[0].progress - 100.0).abs() < f64::EPSILON);

    let csv = export_entity(&db, ExportEntity::Sessions, ExportFormat::Csv, now).unwrap();
    assert!(csv.contains("Write proposal,Work & Career,62,5,Completed Successfully"));

    let json = export_all_json(&db, "default", now).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["data"]["tasks"][0]["actual_minutes"], 0);
    assert_eq!(value["data"]["goals"][0]["period"], "Daily");
}

fn work_task(db: &Database, title: &str, estimated_minutes: u32) -> (i64, i64) {
    let category = db.find_category_by_name("Work & Career").unwrap().unwrap().id;
    let mut task = Task::new(title, category);
    task.estimated_minutes = estimated_minutes;
    (category, db.create_task(&task).unwrap())
}

#[test]
fn test_completing_task_closes_its_running_session() {
    let db = Database::open_in_memory().unwrap();
    let (_, task_id) = work_task(&db, "Review pull requests", 30);
    let start = Utc.with_ymd_and_hms(2024, 3, 11, 14, 0, 0).unwrap();

    let manager = SessionManager::new(&db);
    let session = manager.quick_start(task_id, start).unwrap();

    let toggled = manager
        .toggle_task_completion(task_id, start + Duration::minutes(30))
        .unwrap();
    assert!(toggled.completed);
    assert_eq!(toggled.closed_session_id, Some(session.id));

    let closed = db.get_session(session.id).unwrap().unwrap();
    assert_eq!(closed.outcome, Some(SessionOutcome::Completed));
    assert_eq!(closed.end_time, Some(start + Duration::minutes(30)));
    assert_eq!(closed.actual_minutes, Some(30));
    assert!(db.active_session().unwrap().is_none());
    assert!(db.get_task(task_id).unwrap().unwrap().is_completed);

    // reopening leaves sessions alone
    let reopened = manager
        .toggle_task_completion(task_id, start + Duration::minutes(40))
        .unwrap();
    assert!(!reopened.completed);
    assert_eq!(reopened.closed_session_id, None);
}

#[test]
fn test_goal_progress_counts_only_productive_sessions() {
    let db = Database::open_in_memory().unwrap();
    let (category, task_id) = work_task(&db, "Deep work", 60);
    let mut goal = Goal::new("Two focused hours", category, 2.0);
    goal.period = GoalPeriod::Weekly;
    goal.id = db.create_goal(&goal).unwrap();

    // Monday of the week under test
    let monday = Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap();
    let outcomes = [
        (SessionOutcome::Completed, 30),
        (SessionOutcome::Partial, 30),
        (SessionOutcome::Interrupted, 60),
        (SessionOutcome::Abandoned, 60),
    ];
    for (day, (outcome, minutes)) in (0_i64..).zip(outcomes) {
        let start = monday + Duration::days(day);
        let mut session = Session::new(task_id, start, 60);
        session.end_time = Some(start + Duration::minutes(minutes));
        session.actual_minutes = Some(u32::try_from(minutes).unwrap());
        session.outcome = Some(outcome);
        db.create_session(&session).unwrap();
    }

    let today = (monday + Duration::days(4)).date_naive();
    let progress = current_period_progress(&db, &goal, today).unwrap();
    assert_eq!(progress.minutes_logged, 60);
    assert!((progress.progress - 50.0).abs() < 1e-9);
}

#[test]
fn test_task_progress_includes_running_session() {
    let db = Database::open_in_memory().unwrap();
    let (_, task_id) = work_task(&db, "Write chapter", 60);
    let start = Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap();

    let mut earlier = Session::new(task_id, start - Duration::hours(3), 25);
    earlier.end_time = Some(start - Duration::hours(3) + Duration::minutes(20));
    earlier.actual_minutes = Some(20);
    earlier.outcome = Some(SessionOutcome::Completed);
    db.create_session(&earlier).unwrap();

    let manager = SessionManager::new(&db);
    manager.quick_start(task_id, start).unwrap();

    // a session started seconds ago already counts as one minute
    let just_started = manager
        .task_progress(task_id, start + Duration::seconds(15))
        .unwrap();
    assert!(just_started.has_active_session);
    assert_eq!(just_started.active_elapsed, 1);
    assert_eq!(just_started.total_minutes, 21);
    assert_eq!(just_started.completion_percentage, 35);

    let half_hour = manager
        .task_progress(task_id, start + Duration::minutes(30))
        .unwrap();
    assert_eq!(half_hour.total_minutes, 50);
    assert_eq!(half_hour.completion_percentage, 83);
    assert!(!half_hour.is_completed);
}
