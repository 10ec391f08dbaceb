//! Query functions take a plain `&Connection` so they compose inside
//! [`crate::Database::transaction`] as well as [`crate::Database::with_conn`].

pub mod feed;
pub mod friends;
pub mod users;
pub mod wakeups;

use anyhow::Result;

/// "?2, ?3, ..." for an IN clause whose first placeholder is `?{start}`.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
