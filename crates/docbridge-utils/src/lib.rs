//! Small, dependency-light helpers shared by the docbridge crates.

pub mod time;

pub use time::{RelativeTime, RelativeTimeError, Tense, relative_time_to_date};
