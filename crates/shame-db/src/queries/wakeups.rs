use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::{ChallengeRow, ScoreRow, WakeUpRow};

// -- Pending challenges --

/// Stores the user's pending challenge, replacing any previous one.
pub fn upsert_challenge(conn: &Connection, challenge: &ChallengeRow) -> Result<()> {
    conn.execute(
        "INSERT INTO challenges (user_id, operand1, operand2, operation, correct_answer, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id) DO UPDATE SET
             operand1 = excluded.operand1,
             operand2 = excluded.operand2,
             operation = excluded.operation,
             correct_answer = excluded.correct_answer,
             created_at = excluded.created_at",
        rusqlite::params![
            challenge.user_id,
            challenge.operand1,
            challenge.operand2,
            challenge.operation,
            challenge.correct_answer,
            challenge.created_at,
        ],
    )?;
    Ok(())
}

pub fn pending_challenge(conn: &Connection, user_id: &str) -> Result<Option<ChallengeRow>> {
    conn.query_row(
        "SELECT user_id, operand1, operand2, operation, correct_answer, created_at
         FROM challenges WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(ChallengeRow {
                user_id: row.get(0)?,
                operand1: row.get(1)?,
                operand2: row.get(2)?,
                operation: row.get(3)?,
                correct_answer: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
}

pub fn delete_challenge(conn: &Connection, user_id: &str) -> Result<()> {
    conn.execute("DELETE FROM challenges WHERE user_id = ?1", [user_id])?;
    Ok(())
}

// -- Wake-up logs --

const WAKE_UP_COLUMNS: &str =
    "id, user_id, local_date, timestamp, goal_time, actual_time, math_problem_correct, shame_count";

fn map_wake_up(row: &Row<'_>) -> rusqlite::Result<WakeUpRow> {
    Ok(WakeUpRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        local_date: row.get(2)?,
        timestamp: row.get(3)?,
        goal_time: row.get(4)?,
        actual_time: row.get(5)?,
        math_problem_correct: row.get(6)?,
        shame_count: row.get(7)?,
    })
}

pub fn insert_wake_up(conn: &Connection, log: &WakeUpRow) -> Result<()> {
    conn.execute(
        "INSERT INTO wake_up_logs (id, user_id, local_date, timestamp, goal_time, actual_time,
                                   math_problem_correct, shame_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            log.id,
            log.user_id,
            log.local_date,
            log.timestamp,
            log.goal_time,
            log.actual_time,
            log.math_problem_correct,
            log.shame_count,
        ],
    )?;
    Ok(())
}

pub fn wake_up_on(conn: &Connection, user_id: &str, local_date: &str) -> Result<Option<WakeUpRow>> {
    let sql = format!("SELECT {WAKE_UP_COLUMNS} FROM wake_up_logs WHERE user_id = ?1 AND local_date = ?2");
    conn.query_row(&sql, (user_id, local_date), map_wake_up).optional()
}

/// Logs on or after `from_date`, newest first.
pub fn wake_ups_since(conn: &Connection, user_id: &str, from_date: &str) -> Result<Vec<WakeUpRow>> {
    let sql = format!(
        "SELECT {WAKE_UP_COLUMNS} FROM wake_up_logs
         WHERE user_id = ?1 AND local_date >= ?2
         ORDER BY local_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((user_id, from_date), map_wake_up)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn increment_wake_up_shame(conn: &Connection, user_id: &str, local_date: &str) -> Result<()> {
    conn.execute(
        "UPDATE wake_up_logs SET shame_count = shame_count + 1
         WHERE user_id = ?1 AND local_date = ?2",
        (user_id, local_date),
    )?;
    Ok(())
}

// -- Daily scores --

const SCORE_COLUMNS: &str = "id, user_id, local_date, wake_up_points, consistency_points, \
     sleep_duration_points, shame_count, shame_deductions, score, created_at";

fn map_score(row: &Row<'_>) -> rusqlite::Result<ScoreRow> {
    Ok(ScoreRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        local_date: row.get(2)?,
        wake_up_points: row.get(3)?,
        consistency_points: row.get(4)?,
        sleep_duration_points: row.get(5)?,
        shame_count: row.get(6)?,
        shame_deductions: row.get(7)?,
        score: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn insert_score(conn: &Connection, score: &ScoreRow) -> Result<()> {
    conn.execute(
        "INSERT INTO daily_scores (id, user_id, local_date, wake_up_points, consistency_points,
                                   sleep_duration_points, shame_count, shame_deductions, score,
                                   created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            score.id,
            score.user_id,
            score.local_date,
            score.wake_up_points,
            score.consistency_points,
            score.sleep_duration_points,
            score.shame_count,
            score.shame_deductions,
            score.score,
            score.created_at,
        ],
    )?;
    Ok(())
}

pub fn score_on(conn: &Connection, user_id: &str, local_date: &str) -> Result<Option<ScoreRow>> {
    let sql = format!("SELECT {SCORE_COLUMNS} FROM daily_scores WHERE user_id = ?1 AND local_date = ?2");
    conn.query_row(&sql, (user_id, local_date), map_score).optional()
}

/// Writes back the shame-related columns of an existing score.
pub fn update_score_shame(conn: &Connection, score: &ScoreRow) -> Result<()> {
    conn.execute(
        "UPDATE daily_scores SET shame_count = ?2, shame_deductions = ?3, score = ?4 WHERE id = ?1",
        rusqlite::params![score.id, score.shame_count, score.shame_deductions, score.score],
    )?;
    Ok(())
}

/// Scores on or after `from_date`, newest first.
pub fn scores_since(conn: &Connection, user_id: &str, from_date: &str) -> Result<Vec<ScoreRow>> {
    let sql = format!(
        "SELECT {SCORE_COLUMNS} FROM daily_scores
         WHERE user_id = ?1 AND local_date >= ?2
         ORDER BY local_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((user_id, from_date), map_score)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
