/// pattern-pulse library
///
/// Scores how well coding patterns reduce recurring problems and decides
/// which patterns apply to a new generation request.

pub mod core;
pub mod db;
pub mod error;
pub mod intelligence;

// Re-exports for convenience
pub use db::Database;
pub use error::{PulseError, Result};
