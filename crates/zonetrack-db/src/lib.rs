// zonetrack-db: SQLite tag directory and read log.

pub mod directory;
pub mod error;
pub mod history;
pub mod schema;

pub use directory::SqliteDirectory;
pub use error::DbError;
pub use history::{HistoryFilter, ReadEntry};
