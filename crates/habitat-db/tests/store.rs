use chrono::{NaiveDate, TimeZone, Utc};

use habitat_core::{HabitCandidate, NewReminder, NotificationScheduler, NotificationStore, SchedulerConfig};
use habitat_db::{Database, is_constraint_violation};
use habitat_db::notifications::NOTIFICATION_PAGE;
use habitat_types::models::{Category, Habit, Recurrence, Reminder, ReminderPayload, WeekdaySet};

const USER: &str = "00000000-0000-0000-0000-00000000000a";

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.create_user(USER, "alice@example.com", "Alice", "hash").unwrap();
    db
}

fn habit(id: &str, recurrence: Recurrence) -> Habit {
    Habit {
        id: id.into(),
        user_id: USER.into(),
        name: format!("Habit {id}"),
        description: None,
        color: "purple".into(),
        recurrence,
        start_date: None,
        end_date: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        notifications_enabled: true,
        category_id: None,
    }
}

fn paris(at: &str) -> Reminder {
    Reminder {
        at_time: at.into(),
        timezone: Some("Europe/Paris".into()),
    }
}

#[test]
fn users_round_trip_by_email_and_id() {
    let db = setup();
    let row = db.get_user_by_email("alice@example.com").unwrap().unwrap();
    assert_eq!(row.id, USER);
    assert_eq!(row.name, "Alice");

    let user = db.get_user_by_id(USER).unwrap().unwrap().into_user().unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert!(db.get_user_by_email("bob@example.com").unwrap().is_none());
}

#[test]
fn duplicate_email_is_rejected() {
    let db = setup();
    let err = db.create_user("other", "alice@example.com", "Imposter", "hash").unwrap_err();
    assert!(is_constraint_violation(&err));
}

#[test]
fn habit_with_reminder_is_stored_and_updated() {
    let db = setup();
    let mut h = habit("h1", Recurrence::Custom(WeekdaySet::from_indices([0, 2, 4])));
    h.start_date = Some(day(2024, 1, 8));
    db.create_habit(&h, Some(&paris("07:00"))).unwrap();

    let stored = db.get_habit(USER, "h1").unwrap().unwrap();
    assert_eq!(stored.recurrence, h.recurrence);
    assert_eq!(stored.start_date, Some(day(2024, 1, 8)));
    assert_eq!(stored.created_at, h.created_at);

    let reminders = db.get_reminders(&["h1".to_string()]).unwrap();
    assert_eq!(reminders.get("h1"), Some(&paris("07:00")));

    h.name = "Run".into();
    h.recurrence = Recurrence::Weekly;
    assert!(db.update_habit(&h, None).unwrap());
    let stored = db.get_habit(USER, "h1").unwrap().unwrap();
    assert_eq!(stored.name, "Run");
    assert_eq!(stored.recurrence, Recurrence::Weekly);
    assert!(db.get_reminders(&["h1".to_string()]).unwrap().is_empty());
}

#[test]
fn update_of_foreign_habit_is_refused() {
    let db = setup();
    db.create_user("bob", "bob@example.com", "Bob", "hash").unwrap();
    let h = habit("h1", Recurrence::Daily);
    db.create_habit(&h, None).unwrap();

    let mut stolen = h.clone();
    stolen.user_id = "bob".into();
    stolen.name = "Mine now".into();
    assert!(!db.update_habit(&stolen, None).unwrap());
    assert!(!db.delete_habit("bob", "h1").unwrap());
    assert!(db.get_habit("bob", "h1").unwrap().is_none());
}

#[test]
fn delete_cascades_to_reminder_and_logs() {
    let db = setup();
    db.create_habit(&habit("h1", Recurrence::Daily), Some(&paris("07:00"))).unwrap();
    db.toggle_log("h1", day(2024, 1, 3)).unwrap();

    assert!(db.delete_habit(USER, "h1").unwrap());
    let ids = vec!["h1".to_string()];
    assert!(db.get_reminders(&ids).unwrap().is_empty());
    assert!(db.completions_for_habits(&ids).unwrap().is_empty());
}

#[test]
fn toggle_flips_completion() {
    let db = setup();
    db.create_habit(&habit("h1", Recurrence::Daily), None).unwrap();
    let ids = vec!["h1".to_string()];

    assert!(db.toggle_log("h1", day(2024, 1, 3)).unwrap());
    assert!(db.completions_for_habits(&ids).unwrap()["h1"].contains(&day(2024, 1, 3)));

    assert!(!db.toggle_log("h1", day(2024, 1, 3)).unwrap());
    assert!(db.completions_for_habits(&ids).unwrap().is_empty());
}

#[test]
fn not_done_log_toggles_to_done() {
    let db = setup();
    db.create_habit(&habit("h1", Recurrence::Daily), None).unwrap();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO habit_logs (id, habit_id, date, done) VALUES ('l1', 'h1', '2024-01-03', 0)",
            [],
        )?;
        Ok(())
    })
    .unwrap();

    let ids = vec!["h1".to_string()];
    let logs = db.logs_between(&ids, day(2024, 1, 1), day(2024, 1, 7)).unwrap();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].done);

    assert!(db.toggle_log("h1", day(2024, 1, 3)).unwrap());
    let logs = db.logs_between(&ids, day(2024, 1, 1), day(2024, 1, 7)).unwrap();
    assert!(logs[0].done);
}

#[test]
fn logs_between_is_inclusive() {
    let db = setup();
    db.create_habit(&habit("h1", Recurrence::Daily), None).unwrap();
    for d in [1, 2, 7, 8] {
        db.toggle_log("h1", day(2024, 1, d)).unwrap();
    }
    let logs = db
        .logs_between(&["h1".to_string()], day(2024, 1, 1), day(2024, 1, 7))
        .unwrap();
    let dates: Vec<NaiveDate> = logs.iter().map(|l| l.date).collect();
    assert_eq!(dates, vec![day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 7)]);
}

#[test]
fn malformed_habit_rows_are_skipped() {
    let db = setup();
    db.create_habit(&habit("good", Recurrence::Daily), None).unwrap();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO habits (id, user_id, name, frequency, start_date, created_at)
             VALUES ('bad', ?1, 'Broken', 'DAILY', 'someday', '2024-01-01T00:00:00Z')",
            [USER],
        )?;
        Ok(())
    })
    .unwrap();

    let habits = db.list_habits(USER).unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].id, "good");
}

#[test]
fn notifiable_habits_respect_flag() {
    let db = setup();
    let mut muted = habit("muted", Recurrence::Daily);
    muted.notifications_enabled = false;
    db.create_habit(&muted, None).unwrap();
    db.create_habit(&habit("loud", Recurrence::Daily), None).unwrap();

    let all = db.list_notifiable_habits(None).unwrap();
    assert_eq!(all.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["loud"]);
    assert_eq!(db.list_notifiable_habits(Some(USER)).unwrap().len(), 1);
    assert!(db.list_notifiable_habits(Some("nobody")).unwrap().is_empty());
}

#[test]
fn reminder_existence_is_keyed_by_user_habit_and_day() {
    let db = setup();
    let new = NewReminder {
        user_id: USER.into(),
        habit_id: "h1".into(),
        day: day(2024, 1, 3),
        created_at: Utc.with_ymd_and_hms(2024, 1, 3, 5, 41, 0).unwrap(),
        payload: ReminderPayload {
            habit_id: "h1".into(),
            habit_name: "Run".into(),
            reminder_time: Some("07:00".into()),
            timezone: Some("Europe/Paris".into()),
        },
    };
    db.create_reminder(&new).unwrap();

    assert!(db.reminder_exists(USER, "h1", day(2024, 1, 3)).unwrap());
    assert!(!db.reminder_exists(USER, "h1", day(2024, 1, 4)).unwrap());
    assert!(!db.reminder_exists(USER, "h11", day(2024, 1, 3)).unwrap());

    let stored = db.list_notifications(USER, NOTIFICATION_PAGE).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, "reminder");
    let payload: serde_json::Value = serde_json::from_str(&stored[0].payload).unwrap();
    assert_eq!(payload["habitName"], "Run");
    assert_eq!(payload["reminderTime"], "07:00");
}

#[test]
fn notification_center_read_and_delete() {
    let db = setup();
    let store = &db;
    let scheduler = NotificationScheduler::new(store, SchedulerConfig::default());
    let candidates: Vec<HabitCandidate> = ["a", "b", "c"]
        .into_iter()
        .map(|id| HabitCandidate {
            habit: habit(id, Recurrence::Daily),
            reminder: None,
            logs: vec![],
        })
        .collect();

    let fired = scheduler.tick(None, &candidates, Utc.with_ymd_and_hms(2024, 1, 3, 7, 30, 0).unwrap());
    assert_eq!(fired.len(), 3);
    assert_eq!(db.unread_count(USER).unwrap(), 3);

    let list = db.list_notifications(USER, NOTIFICATION_PAGE).unwrap();
    assert!(db.mark_notification_read(USER, &list[0].id).unwrap());
    assert!(!db.mark_notification_read("someone-else", &list[1].id).unwrap());
    assert_eq!(db.unread_count(USER).unwrap(), 2);

    assert_eq!(db.mark_all_read(USER).unwrap(), 2);
    assert_eq!(db.unread_count(USER).unwrap(), 0);

    let deleted: ReminderPayload = serde_json::from_str(&list[2].payload).unwrap();
    assert!(db.delete_notification(USER, &list[2].id).unwrap());
    assert_eq!(db.list_notifications(USER, NOTIFICATION_PAGE).unwrap().len(), 2);

    // Only the habit whose reminder was deleted fires again.
    let again = scheduler.tick(None, &candidates, Utc.with_ymd_and_hms(2024, 1, 3, 7, 45, 0).unwrap());
    assert_eq!(again, vec![deleted.habit_id]);
}

fn category(id: &str, name: &str, color: &str) -> Category {
    Category {
        id: id.into(),
        user_id: USER.into(),
        name: name.into(),
        color: color.into(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}

#[test]
fn categories_are_listed_by_name_and_scoped_to_owner() {
    let db = setup();
    db.create_user("bob", "bob@example.com", "Bob", "hash").unwrap();
    db.create_category(&category("c1", "Sport", "green")).unwrap();
    db.create_category(&category("c2", "Health", "blue")).unwrap();

    let names: Vec<_> = db.list_categories(USER).unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["Health", "Sport"]);
    assert_eq!(db.get_category(USER, "c1").unwrap(), Some(category("c1", "Sport", "green")));

    assert!(db.list_categories("bob").unwrap().is_empty());
    assert!(db.get_category("bob", "c1").unwrap().is_none());
    assert!(!db.update_category("bob", "c1", "Mine", "red").unwrap());
    assert!(!db.delete_category("bob", "c1").unwrap());
}

#[test]
fn duplicate_category_name_is_a_constraint_violation() {
    let db = setup();
    db.create_category(&category("c1", "Sport", "green")).unwrap();
    let err = db.create_category(&category("c2", "Sport", "blue")).unwrap_err();
    assert!(is_constraint_violation(&err));

    // Any other failure is not reported as one.
    let err = anyhow::anyhow!("disk on fire");
    assert!(!is_constraint_violation(&err));
}

#[test]
fn category_recolor_propagates_to_its_habits() {
    let db = setup();
    db.create_category(&category("c1", "Sport", "green")).unwrap();
    let mut filed = habit("h1", Recurrence::Daily);
    filed.category_id = Some("c1".into());
    db.create_habit(&filed, None).unwrap();
    db.create_habit(&habit("h2", Recurrence::Daily), None).unwrap();

    assert!(db.update_category(USER, "c1", "Running", "orange").unwrap());
    assert_eq!(db.get_category(USER, "c1").unwrap().unwrap().name, "Running");
    let stored = db.get_habit(USER, "h1").unwrap().unwrap();
    assert_eq!(stored.color, "orange");
    assert_eq!(stored.category_id.as_deref(), Some("c1"));
    assert_eq!(db.get_habit(USER, "h2").unwrap().unwrap().color, "purple");
}

#[test]
fn deleting_a_category_keeps_its_habits() {
    let db = setup();
    db.create_category(&category("c1", "Sport", "green")).unwrap();
    let mut filed = habit("h1", Recurrence::Daily);
    filed.category_id = Some("c1".into());
    db.create_habit(&filed, None).unwrap();

    assert!(db.delete_category(USER, "c1").unwrap());
    assert!(db.get_category(USER, "c1").unwrap().is_none());
    let stored = db.get_habit(USER, "h1").unwrap().unwrap();
    assert_eq!(stored.category_id, None);
    assert!(!db.delete_category(USER, "c1").unwrap());
}
