//! Persistence layer.
//!
//! `SqliteStorage` owns the connection and the transaction protocol; the
//! feature modules (`labels`, `pins`, `watch`) operate on the `Transaction`
//! it hands out. `directory` holds the thin row helpers for entities owned
//! by external collaborators (users, containers, items, comments).

pub mod directory;
pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{MutationContext, SqliteStorage};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    Utc::now()
}
