use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Timestamps are RFC 3339 UTC strings with fixed precision, so ORDER BY on
/// the text column is chronological. Local dates are `YYYY-MM-DD`.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            email               TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password            TEXT NOT NULL,
            display_name        TEXT NOT NULL,
            sleep_goal          TEXT NOT NULL,
            bedtime_goal        TEXT NOT NULL,
            utc_offset_minutes  INTEGER NOT NULL DEFAULT 0,
            push_token          TEXT,
            total_score         INTEGER NOT NULL DEFAULT 0,
            current_streak      INTEGER NOT NULL DEFAULT 0,
            longest_streak      INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            revoked_at  TEXT
        );

        -- At most one pending math challenge per user
        CREATE TABLE IF NOT EXISTS challenges (
            user_id         TEXT PRIMARY KEY REFERENCES users(id),
            operand1        INTEGER NOT NULL,
            operand2        INTEGER NOT NULL,
            operation       TEXT NOT NULL CHECK (operation IN ('addition', 'subtraction')),
            correct_answer  INTEGER NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wake_up_logs (
            id                      TEXT PRIMARY KEY,
            user_id                 TEXT NOT NULL REFERENCES users(id),
            local_date              TEXT NOT NULL,
            timestamp               TEXT NOT NULL,
            goal_time               TEXT NOT NULL,
            actual_time             TEXT NOT NULL,
            math_problem_correct    INTEGER NOT NULL,
            shame_count             INTEGER NOT NULL DEFAULT 0,
            UNIQUE(user_id, local_date)
        );

        CREATE TABLE IF NOT EXISTS daily_scores (
            id                      TEXT PRIMARY KEY,
            user_id                 TEXT NOT NULL REFERENCES users(id),
            local_date              TEXT NOT NULL,
            wake_up_points          INTEGER NOT NULL,
            consistency_points      INTEGER NOT NULL,
            sleep_duration_points   INTEGER NOT NULL,
            shame_count             INTEGER NOT NULL DEFAULT 0,
            shame_deductions        INTEGER NOT NULL DEFAULT 0,
            score                   INTEGER NOT NULL,
            created_at              TEXT NOT NULL,
            UNIQUE(user_id, local_date)
        );

        CREATE TABLE IF NOT EXISTS friend_requests (
            id              TEXT PRIMARY KEY,
            from_user_id    TEXT NOT NULL REFERENCES users(id),
            to_user_id      TEXT NOT NULL REFERENCES users(id),
            status          TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'rejected')),
            created_at      TEXT NOT NULL,
            resolved_at     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_friend_requests_to
            ON friend_requests(to_user_id, status);
        CREATE INDEX IF NOT EXISTS idx_friend_requests_from
            ON friend_requests(from_user_id, status);

        -- Undirected edge, stored once with user_a < user_b
        CREATE TABLE IF NOT EXISTS friendships (
            user_a      TEXT NOT NULL REFERENCES users(id),
            user_b      TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_a, user_b),
            CHECK (user_a < user_b)
        );

        CREATE INDEX IF NOT EXISTS idx_friendships_b
            ON friendships(user_b);

        CREATE TABLE IF NOT EXISTS shame_events (
            id                  TEXT PRIMARY KEY,
            target_user_id      TEXT NOT NULL REFERENCES users(id),
            shamer_user_id      TEXT NOT NULL REFERENCES users(id),
            local_date          TEXT NOT NULL,
            points_deducted     INTEGER NOT NULL,
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_shame_events_target
            ON shame_events(target_user_id, local_date);

        CREATE TABLE IF NOT EXISTS feed_items (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL CHECK (kind IN ('wake_up', 'shame', 'achievement')),
            message     TEXT NOT NULL,
            actor_id    TEXT REFERENCES users(id),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feed_items_author
            ON feed_items(author_id, created_at);

        -- One reaction per user per item
        CREATE TABLE IF NOT EXISTS feed_reactions (
            feed_item_id    TEXT NOT NULL REFERENCES feed_items(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            reaction        TEXT NOT NULL CHECK (reaction IN ('applause', 'muscle', 'fire')),
            created_at      TEXT NOT NULL,
            PRIMARY KEY (feed_item_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS feed_comments (
            id              TEXT PRIMARY KEY,
            feed_item_id    TEXT NOT NULL REFERENCES feed_items(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            text            TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feed_comments_item
            ON feed_comments(feed_item_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
