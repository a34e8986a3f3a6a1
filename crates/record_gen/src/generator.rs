//! Record generator that produces user and todo field values.
//!
//! The generator does not know about identities: ids are assigned by the
//! store, and the caller decides which user a todo belongs to.

use crate::fake::FakeData;
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Todos are created within this many days before "now"
const CREATED_WINDOW_DAYS: i64 = 45;
/// Due dates fall within this many days either side of "now"
const DUE_WINDOW_DAYS: i64 = 20;

/// Field values for one user
#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub name: String,
    pub email: String,
}

/// Field values for one todo
#[derive(Debug, Clone, PartialEq)]
pub struct TodoFields {
    pub title: String,
    pub created_at: NaiveDateTime,
    pub due_date: NaiveDateTime,
}

/// Deterministic user/todo generator
pub struct RecordGenerator {
    fake: FakeData,
    users_generated: u64,
}

impl RecordGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            fake: FakeData::new(StdRng::seed_from_u64(seed)),
            users_generated: 0,
        }
    }

    /// Generate one user. Emails stay unique for the lifetime of the generator.
    pub fn user(&mut self) -> UserFields {
        let first = self.fake.first_name();
        let last = self.fake.last_name();
        self.users_generated += 1;
        let email = self.fake.email(&first, &last, self.users_generated);
        UserFields {
            name: format!("{} {}", first, last),
            email,
        }
    }

    /// Generate one todo.
    ///
    /// Even indexes get a due date in the recent past, odd indexes one in the
    /// near future, so roughly half of the dataset is overdue.
    pub fn todo(&mut self, index: u64, now: NaiveDateTime) -> TodoFields {
        let title = self.fake.sentence(3, 8);
        let created_at = self.fake.recent(now, CREATED_WINDOW_DAYS);
        let due_date = if index % 2 == 0 {
            self.fake.recent(now, DUE_WINDOW_DAYS)
        } else {
            self.fake.soon(now, DUE_WINDOW_DAYS)
        };
        TodoFields {
            title,
            created_at,
            due_date,
        }
    }

    /// Lazily generate `count` users
    pub fn users(&mut self, count: u64) -> impl Iterator<Item = UserFields> + '_ {
        (0..count).map(move |_| self.user())
    }

    /// Lazily generate `count` todos relative to `now`
    pub fn todos(
        &mut self,
        count: u64,
        now: NaiveDateTime,
    ) -> impl Iterator<Item = TodoFields> + '_ {
        (0..count).map(move |i| self.todo(i, now))
    }

    /// Number of users produced so far
    pub fn users_generated(&self) -> u64 {
        self.users_generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fixed_now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_same_seed_same_output() {
        let a: Vec<_> = RecordGenerator::new(42).users(20).collect();
        let b: Vec<_> = RecordGenerator::new(42).users(20).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_emails_unique() {
        let mut gen = RecordGenerator::new(3);
        let emails: HashSet<String> = gen.users(5_000).map(|u| u.email).collect();
        assert_eq!(emails.len(), 5_000);
        assert_eq!(gen.users_generated(), 5_000);
    }

    #[test]
    fn test_user_fields_non_empty() {
        let mut gen = RecordGenerator::new(9);
        for user in gen.users(100) {
            assert!(!user.name.trim().is_empty());
            assert!(user.email.contains('@'));
        }
    }

    #[test]
    fn test_todo_due_dates_alternate() {
        let now = fixed_now();
        let mut gen = RecordGenerator::new(11);
        for (i, todo) in gen.todos(50, now).enumerate() {
            assert!(!todo.title.is_empty());
            assert!(todo.created_at <= now);
            if i % 2 == 0 {
                assert!(todo.due_date <= now, "todo {i} should be due in the past");
            } else {
                assert!(todo.due_date > now, "todo {i} should be due in the future");
            }
        }
    }
}
