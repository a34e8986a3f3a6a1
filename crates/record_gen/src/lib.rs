//! Synthetic record generator for todo-seeder.
//!
//! Produces well-formed user and todo field values on demand. Generation is
//! deterministic for a given seed, so two runs with the same seed produce
//! the same dataset.
//!
//! # Example
//!
//! ```rust
//! use record_gen::RecordGenerator;
//!
//! let mut gen = RecordGenerator::new(42);
//! let users: Vec<_> = gen.users(3).collect();
//! assert_eq!(users.len(), 3);
//! ```

pub mod fake;
pub mod generator;

pub use generator::{RecordGenerator, TodoFields, UserFields};
