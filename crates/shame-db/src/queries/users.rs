use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, email, password, display_name, sleep_goal, bedtime_goal, \
     utc_offset_minutes, push_token, total_score, current_streak, longest_streak, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        display_name: row.get(3)?,
        sleep_goal: row.get(4)?,
        bedtime_goal: row.get(5)?,
        utc_offset_minutes: row.get(6)?,
        push_token: row.get(7)?,
        total_score: row.get(8)?,
        current_streak: row.get(9)?,
        longest_streak: row.get(10)?,
        created_at: row.get(11)?,
    })
}

impl Database {
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_id(conn, id))
    }
}

// -- Users --

pub fn insert_user(conn: &Connection, user: &UserRow) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, password, display_name, sleep_goal, bedtime_goal,
                            utc_offset_minutes, push_token, total_score, current_streak,
                            longest_streak, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            user.id,
            user.email,
            user.password,
            user.display_name,
            user.sleep_goal,
            user.bedtime_goal,
            user.utc_offset_minutes,
            user.push_token,
            user.total_score,
            user.current_streak,
            user.longest_streak,
            user.created_at,
        ],
    )?;
    Ok(())
}

/// Email lookup is case-insensitive (column collation).
pub fn user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    conn.query_row(&sql, [email], map_user).optional()
}

pub fn user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], map_user).optional()
}

pub fn users_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<UserRow>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id IN ({}) ORDER BY display_name COLLATE NOCASE",
        super::placeholders(1, ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_profile(
    conn: &Connection,
    id: &str,
    display_name: &str,
    sleep_goal: &str,
    bedtime_goal: &str,
    utc_offset_minutes: i32,
) -> Result<()> {
    conn.execute(
        "UPDATE users SET display_name = ?2, sleep_goal = ?3, bedtime_goal = ?4,
                          utc_offset_minutes = ?5
         WHERE id = ?1",
        rusqlite::params![id, display_name, sleep_goal, bedtime_goal, utc_offset_minutes],
    )?;
    Ok(())
}

pub fn set_push_token(conn: &Connection, id: &str, token: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE users SET push_token = ?2 WHERE id = ?1",
        rusqlite::params![id, token],
    )?;
    Ok(())
}

pub fn update_streaks(conn: &Connection, id: &str, current: i64, longest: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET current_streak = ?2, longest_streak = ?3 WHERE id = ?1",
        rusqlite::params![id, current, longest],
    )?;
    Ok(())
}

/// Adds `delta` (possibly negative) to the lifetime score, never going below zero.
pub fn add_to_total_score(conn: &Connection, id: &str, delta: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET total_score = MAX(0, total_score + ?2) WHERE id = ?1",
        rusqlite::params![id, delta],
    )?;
    Ok(())
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Case-insensitive substring search over display name and email,
/// excluding the requester and their friends.
pub fn search_users(
    conn: &Connection,
    requester_id: &str,
    query: &str,
    limit: u32,
) -> Result<Vec<UserRow>> {
    let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         WHERE u.id != ?1
           AND (lower(u.display_name) LIKE ?2 ESCAPE '\\' OR lower(u.email) LIKE ?2 ESCAPE '\\')
           AND NOT EXISTS (
               SELECT 1 FROM friendships f
               WHERE (f.user_a = ?1 AND f.user_b = u.id) OR (f.user_b = ?1 AND f.user_a = u.id)
           )
         ORDER BY u.display_name COLLATE NOCASE
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![requester_id, pattern, limit], map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Sessions --

pub fn insert_session(conn: &Connection, id: &str, user_id: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at) VALUES (?1, ?2, ?3)",
        (id, user_id, created_at),
    )?;
    Ok(())
}

/// True when the session exists, belongs to `user_id` and was not revoked.
pub fn session_active(conn: &Connection, id: &str, user_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sessions WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL",
            (id, user_id),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn revoke_session(conn: &Connection, id: &str, revoked_at: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE sessions SET revoked_at = ?2 WHERE id = ?1 AND revoked_at IS NULL",
        (id, revoked_at),
    )?;
    Ok(changed > 0)
}
