use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::{FriendRequestRow, ShameEventRow};

// -- Friendships --

/// Inserts an edge. Callers pass the pair in canonical order (`user_a < user_b`).
pub fn insert_friendship(conn: &Connection, user_a: &str, user_b: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO friendships (user_a, user_b, created_at) VALUES (?1, ?2, ?3)",
        (user_a, user_b, created_at),
    )?;
    Ok(())
}

/// Deletes the edge between two users in either direction.
pub fn delete_friendship(conn: &Connection, a: &str, b: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM friendships
         WHERE (user_a = ?1 AND user_b = ?2) OR (user_a = ?2 AND user_b = ?1)",
        (a, b),
    )?;
    Ok(changed > 0)
}

pub fn are_friends(conn: &Connection, a: &str, b: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM friendships
             WHERE (user_a = ?1 AND user_b = ?2) OR (user_a = ?2 AND user_b = ?1)",
            (a, b),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn friend_ids(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_b FROM friendships WHERE user_a = ?1
         UNION
         SELECT user_a FROM friendships WHERE user_b = ?1",
    )?;
    let ids = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

// -- Friend requests --

const REQUEST_SELECT: &str = "SELECT r.id, r.from_user_id, fu.display_name, r.to_user_id, tu.display_name,
            r.status, r.created_at
     FROM friend_requests r
     JOIN users fu ON fu.id = r.from_user_id
     JOIN users tu ON tu.id = r.to_user_id";

fn map_request(row: &Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        from_display_name: row.get(2)?,
        to_user_id: row.get(3)?,
        to_display_name: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_friend_request(
    conn: &Connection,
    id: &str,
    from_user_id: &str,
    to_user_id: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO friend_requests (id, from_user_id, to_user_id, status, created_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        (id, from_user_id, to_user_id, created_at),
    )?;
    Ok(())
}

pub fn friend_request_by_id(conn: &Connection, id: &str) -> Result<Option<FriendRequestRow>> {
    let sql = format!("{REQUEST_SELECT} WHERE r.id = ?1");
    conn.query_row(&sql, [id], map_request).optional()
}

/// True when a pending request from `from` to `to` exists.
pub fn has_pending_request(conn: &Connection, from: &str, to: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM friend_requests
             WHERE from_user_id = ?1 AND to_user_id = ?2 AND status = 'pending'",
            (from, to),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Pending requests addressed to the user, newest first.
pub fn incoming_requests(conn: &Connection, user_id: &str) -> Result<Vec<FriendRequestRow>> {
    let sql = format!(
        "{REQUEST_SELECT} WHERE r.to_user_id = ?1 AND r.status = 'pending'
         ORDER BY r.created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], map_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Pending requests the user sent, newest first.
pub fn outgoing_requests(conn: &Connection, user_id: &str) -> Result<Vec<FriendRequestRow>> {
    let sql = format!(
        "{REQUEST_SELECT} WHERE r.from_user_id = ?1 AND r.status = 'pending'
         ORDER BY r.created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], map_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Moves a pending request to a terminal status. Returns false if it was
/// no longer pending.
pub fn resolve_friend_request(conn: &Connection, id: &str, status: &str, resolved_at: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE friend_requests SET status = ?2, resolved_at = ?3
         WHERE id = ?1 AND status = 'pending'",
        (id, status, resolved_at),
    )?;
    Ok(changed > 0)
}

/// Deletes a pending request (cancellation by the sender).
pub fn delete_pending_request(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM friend_requests WHERE id = ?1 AND status = 'pending'",
        [id],
    )?;
    Ok(changed > 0)
}

// -- Shame events --

pub fn insert_shame_event(conn: &Connection, event: &ShameEventRow) -> Result<()> {
    conn.execute(
        "INSERT INTO shame_events (id, target_user_id, shamer_user_id, local_date, points_deducted, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            event.id,
            event.target_user_id,
            event.shamer_user_id,
            event.local_date,
            event.points_deducted,
            event.created_at,
        ],
    )?;
    Ok(())
}

pub fn shames_on(conn: &Connection, target_user_id: &str, local_date: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM shame_events WHERE target_user_id = ?1 AND local_date = ?2",
        (target_user_id, local_date),
        |row| row.get(0),
    )?;
    Ok(count)
}
