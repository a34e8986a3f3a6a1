//! Integration tests for report queries.

use std::collections::HashMap;
use todo_seeder::report::{OutputFormat, ReportFormatter, Reporter};
use todo_seeder::schema::{standard_migrations, SchemaManager};
use todo_seeder::{BatchLoader, BulkUpdater, NewTodo, NewUser, Store, Table, TodoStatus};

fn migrated_store() -> Store {
    let mut store = Store::open_in_memory().unwrap();
    SchemaManager::initialize(store.conn_mut()).unwrap();
    SchemaManager::apply_all(store.conn_mut(), &mut standard_migrations()).unwrap();
    store
}

fn load_people(store: &mut Store) {
    let users = ["Alice", "Bob", "Carol"].into_iter().map(|name| NewUser {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    });
    BatchLoader::new(2).load(store.conn_mut(), users).unwrap();
}

/// Alice, Bob and Carol with 2, 2 and 1 todos, loaded through the batch loader
fn alice_bob_carol() -> Store {
    let mut store = migrated_store();
    load_people(&mut store);

    let now = chrono::Utc::now().naive_utc();
    let todos = [1, 1, 2, 2, 3]
        .into_iter()
        .enumerate()
        .map(|(i, user_id)| NewTodo {
            title: format!("todo {}", i),
            status: TodoStatus::Pending,
            created_at: now - chrono::Duration::hours(10 - i as i64),
            due_date: None,
            user_id,
        });
    BatchLoader::new(2).load(store.conn_mut(), todos).unwrap();
    store
}

/// Todos positioned relative to the store clock
fn timed_store() -> Store {
    let mut store = migrated_store();
    load_people(&mut store);
    store
        .conn()
        .execute_batch(
            "INSERT INTO todos (title, status, created_at, due_date, user_id) VALUES
                ('old overdue',    'pending',     datetime('now', '-40 days'), datetime('now', '-30 days'), 1),
                ('recent overdue', 'in_progress', datetime('now', '-3 days'),  datetime('now', '-1 days'),  1),
                ('done overdue',   'completed',   datetime('now', '-3 days'),  datetime('now', '-2 days'),  2),
                ('future',         'pending',     datetime('now', '-2 days'),  datetime('now', '+5 days'),  2),
                ('no due date',    'pending',     datetime('now', '-10 days'), NULL,                        3);",
        )
        .unwrap();
    store
}

#[test]
fn test_todo_count_by_user() {
    let store = alice_bob_carol();
    let counts: HashMap<String, i64> = Reporter::new(store.conn())
        .todo_count_by_user()
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|row| (row.name, row.count))
        .collect();

    assert_eq!(
        counts,
        HashMap::from([
            ("Alice".to_string(), 2),
            ("Bob".to_string(), 2),
            ("Carol".to_string(), 1),
        ])
    );
}

#[test]
fn test_users_lists_everyone_in_id_order() {
    let mut store = migrated_store();
    load_people(&mut store);
    let users = Reporter::new(store.conn()).users().collect_all().unwrap();

    let rows: Vec<(i64, &str, &str)> = users
        .iter()
        .map(|u| (u.id, u.name.as_str(), u.email.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (1, "Alice", "alice@example.com"),
            (2, "Bob", "bob@example.com"),
            (3, "Carol", "carol@example.com"),
        ]
    );

    let csv = ReportFormatter::format(&users[..1], OutputFormat::Csv);
    assert!(csv.starts_with("id,name,email,created_at\n1,Alice,alice@example.com,"));
}

#[test]
fn test_query_can_be_consumed_twice() {
    let store = alice_bob_carol();
    let reporter = Reporter::new(store.conn());
    let query = reporter.ids(Table::Todos);

    let first = query.collect_all().unwrap();
    let second = query.collect_all().unwrap();

    assert_eq!(first, vec![1, 2, 3, 4, 5]);
    assert_eq!(first, second);
}

#[test]
fn test_for_each_streams_and_counts() {
    let store = alice_bob_carol();
    let mut titles = Vec::new();
    let visited = Reporter::new(store.conn())
        .todos_for_user(1)
        .for_each(|todo| {
            titles.push(todo.title);
            Ok(())
        })
        .unwrap();

    assert_eq!(visited, 2);
    // Newest first
    assert_eq!(titles, vec!["todo 1", "todo 0"]);
}

#[test]
fn test_completion_report() {
    let mut store = alice_bob_carol();
    // Alice: todo 1 completed; Bob: todo 3 in progress
    BulkUpdater::set_status(store.conn_mut(), "completed", &[1]).unwrap();
    BulkUpdater::set_status(store.conn_mut(), "in_progress", &[3]).unwrap();

    let rows = Reporter::new(store.conn())
        .completion_report()
        .collect_all()
        .unwrap();

    let summary: Vec<(&str, i64, i64, i64)> = rows
        .iter()
        .map(|r| (r.name.as_str(), r.completed, r.not_completed, r.total))
        .collect();
    assert_eq!(
        summary,
        vec![("Alice", 1, 1, 2), ("Bob", 0, 2, 2), ("Carol", 0, 1, 1)]
    );
    assert_eq!(rows[0].email, "alice@example.com");
}

#[test]
fn test_completion_report_for_user() {
    let store = alice_bob_carol();
    let reporter = Reporter::new(store.conn());

    let bob = reporter
        .completion_report_for_user(2)
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(bob.name, "Bob");
    assert_eq!(bob.total, 2);

    assert!(reporter
        .completion_report_for_user(99)
        .first()
        .unwrap()
        .is_none());
}

#[test]
fn test_latest_todo_by_user() {
    let store = alice_bob_carol();
    let latest: Vec<(String, String)> = Reporter::new(store.conn())
        .latest_todo_by_user()
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|row| (row.name, row.title))
        .collect();

    assert_eq!(
        latest,
        vec![
            ("Alice".to_string(), "todo 1".to_string()),
            ("Bob".to_string(), "todo 3".to_string()),
            ("Carol".to_string(), "todo 4".to_string()),
        ]
    );
}

#[test]
fn test_overdue_todos() {
    let store = timed_store();
    let titles: Vec<String> = Reporter::new(store.conn())
        .overdue_todos()
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|todo| todo.title)
        .collect();

    // Earliest due first; completed and undated todos excluded
    assert_eq!(titles, vec!["old overdue", "recent overdue"]);
}

#[test]
fn test_stale_todos() {
    let store = timed_store();
    let mut titles: Vec<String> = Reporter::new(store.conn())
        .stale_todos()
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|todo| todo.title)
        .collect();
    titles.sort();

    assert_eq!(titles, vec!["future", "recent overdue"]);
}

#[test]
fn test_inactive_users() {
    let store = timed_store();
    store
        .conn()
        .execute_batch(
            "INSERT INTO users (name, email) VALUES
                ('Dave', 'dave@example.com'),
                ('Erin', 'erin@example.com');
             INSERT INTO todos (title, status, created_at, user_id) VALUES
                ('ancient', 'completed', datetime('now', '-60 days'), 4);",
        )
        .unwrap();
    let inactive = Reporter::new(store.conn())
        .inactive_users()
        .collect_all()
        .unwrap();

    // Bob completed a recent todo; Dave's completion is outside the window
    let names: Vec<(&str, i64)> = inactive
        .iter()
        .map(|u| (u.name.as_str(), u.total))
        .collect();
    assert_eq!(names, vec![("Alice", 1), ("Carol", 1), ("Dave", 0), ("Erin", 0)]);
    assert!(inactive.iter().all(|u| u.completed == 0));
}

#[test]
fn test_status_counts() {
    let store = timed_store();
    let counts: Vec<(TodoStatus, i64)> = Reporter::new(store.conn())
        .status_counts()
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|row| (row.status, row.count))
        .collect();

    assert_eq!(
        counts,
        vec![
            (TodoStatus::Completed, 1),
            (TodoStatus::InProgress, 1),
            (TodoStatus::Pending, 3),
        ]
    );
}

#[test]
fn test_limit_and_format() {
    let store = alice_bob_carol();
    let rows = Reporter::new(store.conn())
        .todo_count_by_user()
        .limit(2)
        .collect_all()
        .unwrap();
    assert_eq!(rows.len(), 2);

    let csv = ReportFormatter::format(&rows, OutputFormat::Csv);
    assert_eq!(csv, "user_id,name,count\n1,Alice,2\n2,Bob,2\n");
}

#[test]
fn test_reports_do_not_mutate() {
    let store = timed_store();
    let reporter = Reporter::new(store.conn());
    let before = reporter.count(Table::Todos).unwrap();

    reporter.overdue_todos().collect_all().unwrap();
    reporter.completion_report().collect_all().unwrap();
    reporter.inactive_users().collect_all().unwrap();

    assert_eq!(reporter.count(Table::Todos).unwrap(), before);
}
