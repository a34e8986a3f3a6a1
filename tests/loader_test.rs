//! Integration tests for batched loading.

use chrono::NaiveDate;
use todo_seeder::schema::{standard_migrations, SchemaManager};
use todo_seeder::{BatchLoader, ErrorKind, NewTodo, NewUser, SeedError, Store, TodoStatus};

fn fresh_store() -> Store {
    let mut store = Store::open_in_memory().unwrap();
    SchemaManager::initialize(store.conn_mut()).unwrap();
    store
}

fn migrated_store() -> Store {
    let mut store = fresh_store();
    SchemaManager::apply_all(store.conn_mut(), &mut standard_migrations()).unwrap();
    store
}

fn user(i: usize) -> NewUser {
    NewUser {
        name: format!("User {}", i),
        email: format!("user{}@example.com", i),
    }
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
}

#[test]
fn test_commits_every_row_in_ceil_batches() {
    for (n, b) in [(0, 3), (1, 1), (7, 3), (9, 3), (10, 1), (5, 100)] {
        let mut store = fresh_store();
        let stats = BatchLoader::new(b)
            .load(store.conn_mut(), (0..n).map(user))
            .unwrap();

        assert_eq!(stats.rows_committed, n as u64, "n={} b={}", n, b);
        assert_eq!(
            stats.batches_committed,
            n.div_ceil(b) as u64,
            "n={} b={}",
            n,
            b
        );
        assert_eq!(count(&store, "users"), n as i64);
    }
}

#[test]
fn test_preserves_insertion_order() {
    let mut store = fresh_store();
    BatchLoader::new(4)
        .load(store.conn_mut(), (0..10).map(user))
        .unwrap();

    let mut stmt = store
        .conn()
        .prepare("SELECT email FROM users ORDER BY id")
        .unwrap();
    let emails: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let expected: Vec<String> = (0..10).map(|i| format!("user{}@example.com", i)).collect();
    assert_eq!(emails, expected);
}

#[test]
fn test_duplicate_email_rolls_back_only_its_batch() {
    let mut store = fresh_store();
    // Record 4 repeats record 1's email; it falls in the second batch of 3
    let records = (0..9).map(|i| if i == 4 { user(1) } else { user(i) });

    let err = BatchLoader::new(3)
        .load(store.conn_mut(), records)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(err.batch_index(), Some(1));
    match err {
        SeedError::Batch { committed_rows, .. } => assert_eq!(committed_rows, 3),
        other => panic!("expected batch error, got {:?}", other),
    }
    assert_eq!(count(&store, "users"), 3, "only the first batch survives");
    let max_id: i64 = store
        .conn()
        .query_row("SELECT MAX(id) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(max_id, 3);
}

#[test]
fn test_failure_in_first_batch_leaves_table_unchanged() {
    let mut store = fresh_store();
    BatchLoader::new(10)
        .load(store.conn_mut(), (0..2).map(user))
        .unwrap();

    let err = BatchLoader::new(10)
        .load(store.conn_mut(), (2..6).map(user).chain(Some(user(0))))
        .unwrap_err();

    assert_eq!(err.batch_index(), Some(0));
    assert_eq!(count(&store, "users"), 2);
}

#[test]
fn test_stops_pulling_records_after_failed_batch() {
    let mut store = fresh_store();
    let mut pulled = 0;
    let records = (0..9)
        .inspect(|_| pulled += 1)
        .map(|i| if i == 4 { user(1) } else { user(i) });

    let err = BatchLoader::new(3)
        .load(store.conn_mut(), records)
        .unwrap_err();

    assert_eq!(err.batch_index(), Some(1));
    assert_eq!(pulled, 6, "third batch must never be generated");
}

#[test]
fn test_todo_with_missing_user_is_constraint_violation() {
    let mut store = migrated_store();
    BatchLoader::new(10)
        .load(store.conn_mut(), (0..1).map(user))
        .unwrap();

    let created_at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let todos = [1, 999].into_iter().map(|user_id| NewTodo {
        title: "Orphan".to_string(),
        status: TodoStatus::Pending,
        created_at,
        due_date: None,
        user_id,
    });

    let err = BatchLoader::new(10)
        .load(store.conn_mut(), todos)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(count(&store, "todos"), 0);
}

#[test]
fn test_todo_columns_round_trip() {
    let mut store = migrated_store();
    BatchLoader::new(10)
        .load(store.conn_mut(), (0..1).map(user))
        .unwrap();

    let created_at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let due = created_at + chrono::Duration::days(2);
    let todo = NewTodo {
        title: "Write report".to_string(),
        status: TodoStatus::InProgress,
        created_at,
        due_date: Some(due),
        user_id: 1,
    };
    BatchLoader::new(10)
        .load(store.conn_mut(), [todo])
        .unwrap();

    let (status, stored_created, stored_due): (String, String, String) = store
        .conn()
        .query_row(
            "SELECT status, created_at, due_date FROM todos",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(status, "in_progress");
    assert_eq!(stored_created, "2024-03-01 09:30:00");
    assert_eq!(stored_due, "2024-03-03 09:30:00");
}

#[test]
fn test_oversized_batch_rejected() {
    let mut store = fresh_store();
    let err = BatchLoader::new(20_000)
        .load(store.conn_mut(), (0..3).map(user))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(count(&store, "users"), 0);
}
