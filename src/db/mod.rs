/// Database module for pattern-pulse
///
/// Persists occurrences and pattern definitions in SQLite through sqlx.
/// The analytics never touch this module directly.

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::{Database, DatabaseStats};
pub use models::*;
