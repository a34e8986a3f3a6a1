//! Fake value helpers.
//!
//! Thin wrapper over the `fake` crate that keeps a single seeded RNG so every
//! value drawn is reproducible.

use chrono::{Duration, NaiveDateTime, Timelike};
use fake::faker::internet::en::FreeEmailProvider;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::Rng;

const SECONDS_PER_DAY: i64 = 86_400;

/// Fake data source with deterministic RNG
pub struct FakeData {
    rng: StdRng,
}

impl FakeData {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn first_name(&mut self) -> String {
        FirstName().fake_with_rng(&mut self.rng)
    }

    pub fn last_name(&mut self) -> String {
        LastName().fake_with_rng(&mut self.rng)
    }

    /// Email address made unique by `counter`.
    ///
    /// Non-alphanumeric characters are stripped from the local part so names
    /// like "O'Connor" still yield a valid address.
    pub fn email(&mut self, first: &str, last: &str, counter: u64) -> String {
        let provider: String = FreeEmailProvider().fake_with_rng(&mut self.rng);
        format!(
            "{}.{}{}@{}",
            local_part(first),
            local_part(last),
            counter,
            provider.to_lowercase()
        )
    }

    /// Lorem sentence of `min..max` words
    pub fn sentence(&mut self, min: usize, max: usize) -> String {
        Sentence(min..max).fake_with_rng(&mut self.rng)
    }

    /// Timestamp within the `days` before `now`
    pub fn recent(&mut self, now: NaiveDateTime, days: i64) -> NaiveDateTime {
        let offset = self.rng.random_range(0..days * SECONDS_PER_DAY);
        whole_seconds(now - Duration::seconds(offset))
    }

    /// Timestamp within the `days` after `now`
    pub fn soon(&mut self, now: NaiveDateTime, days: i64) -> NaiveDateTime {
        let offset = self.rng.random_range(1..=days * SECONDS_PER_DAY);
        whole_seconds(now + Duration::seconds(offset))
    }
}

fn local_part(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn whole_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}
