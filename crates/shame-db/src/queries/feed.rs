use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::{CommentRow, FeedItemRow, ReactionRow};

const ITEM_SELECT: &str = "SELECT f.id, f.author_id, u.display_name, f.kind, f.message, f.actor_id, f.created_at
     FROM feed_items f
     JOIN users u ON u.id = f.author_id";

fn map_item(row: &Row<'_>) -> rusqlite::Result<FeedItemRow> {
    Ok(FeedItemRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_display_name: row.get(2)?,
        kind: row.get(3)?,
        message: row.get(4)?,
        actor_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_feed_item(
    conn: &Connection,
    id: &str,
    author_id: &str,
    kind: &str,
    message: &str,
    actor_id: Option<&str>,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO feed_items (id, author_id, kind, message, actor_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, author_id, kind, message, actor_id, created_at],
    )?;
    Ok(())
}

pub fn feed_item_by_id(conn: &Connection, id: &str) -> Result<Option<FeedItemRow>> {
    let sql = format!("{ITEM_SELECT} WHERE f.id = ?1");
    conn.query_row(&sql, [id], map_item).optional()
}

/// Items authored by the user or any of their friends, newest first.
/// Items with equal timestamps come back in reverse insertion order.
pub fn feed_for_user(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<FeedItemRow>> {
    let sql = format!(
        "{ITEM_SELECT}
         WHERE f.author_id = ?1
            OR f.author_id IN (
                SELECT user_b FROM friendships WHERE user_a = ?1
                UNION
                SELECT user_a FROM friendships WHERE user_b = ?1
            )
         ORDER BY f.created_at DESC, f.rowid DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![user_id, limit], map_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Reactions --

/// One reaction per user per item: a second call replaces the type.
pub fn upsert_reaction(
    conn: &Connection,
    feed_item_id: &str,
    user_id: &str,
    reaction: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO feed_reactions (feed_item_id, user_id, reaction, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(feed_item_id, user_id) DO UPDATE SET reaction = excluded.reaction",
        (feed_item_id, user_id, reaction, created_at),
    )?;
    Ok(())
}

pub fn delete_reaction(conn: &Connection, feed_item_id: &str, user_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM feed_reactions WHERE feed_item_id = ?1 AND user_id = ?2",
        (feed_item_id, user_id),
    )?;
    Ok(changed > 0)
}

/// Batch-fetch reactions for a set of feed items, oldest first.
pub fn reactions_for_items(conn: &Connection, item_ids: &[String]) -> Result<Vec<ReactionRow>> {
    if item_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT r.feed_item_id, r.user_id, u.display_name, r.reaction, r.created_at
         FROM feed_reactions r
         JOIN users u ON u.id = r.user_id
         WHERE r.feed_item_id IN ({})
         ORDER BY r.created_at, r.rowid",
        super::placeholders(1, item_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(item_ids.iter()), |row| {
            Ok(ReactionRow {
                feed_item_id: row.get(0)?,
                user_id: row.get(1)?,
                display_name: row.get(2)?,
                reaction: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Comments --

pub fn insert_comment(
    conn: &Connection,
    id: &str,
    feed_item_id: &str,
    user_id: &str,
    text: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO feed_comments (id, feed_item_id, user_id, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (id, feed_item_id, user_id, text, created_at),
    )?;
    Ok(())
}

/// Batch-fetch comments for a set of feed items in posting order.
pub fn comments_for_items(conn: &Connection, item_ids: &[String]) -> Result<Vec<CommentRow>> {
    if item_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT c.id, c.feed_item_id, c.user_id, u.display_name, c.text, c.created_at
         FROM feed_comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.feed_item_id IN ({})
         ORDER BY c.created_at, c.rowid",
        super::placeholders(1, item_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(item_ids.iter()), |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                feed_item_id: row.get(1)?,
                user_id: row.get(2)?,
                display_name: row.get(3)?,
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{befriend, db, user};

    fn ts(minute: u32) -> String {
        format!("2026-01-05T08:{minute:02}:00.000000Z")
    }

    #[test]
    fn feed_merges_self_and_friends_newest_first() {
        let db = db();
        let me = user(&db, "Me");
        let friend = user(&db, "Friend");
        let stranger = user(&db, "Stranger");
        befriend(&db, &me, &friend);

        db.with_conn(|c| {
            insert_feed_item(c, "mine", &me, "wake_up", "m", None, &ts(1))?;
            insert_feed_item(c, "theirs", &friend, "wake_up", "f", None, &ts(2))?;
            insert_feed_item(c, "hidden", &stranger, "wake_up", "s", None, &ts(3))?;
            insert_feed_item(c, "shame", &friend, "shame", "x", Some(me.as_str()), &ts(2))
        })
        .unwrap();

        let feed = db.with_conn(|c| feed_for_user(c, &me, 50)).unwrap();
        let ids: Vec<_> = feed.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["shame", "theirs", "mine"]);
        assert_eq!(feed[0].actor_id.as_deref(), Some(me.as_str()));
        assert_eq!(feed[1].author_display_name, "Friend");

        let capped = db.with_conn(|c| feed_for_user(c, &me, 2)).unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn reacting_twice_keeps_latest_type() {
        let db = db();
        let me = user(&db, "Me");
        db.with_conn(|c| insert_feed_item(c, "i1", &me, "wake_up", "m", None, &ts(1)))
            .unwrap();

        db.with_conn(|c| upsert_reaction(c, "i1", &me, "applause", &ts(2))).unwrap();
        db.with_conn(|c| upsert_reaction(c, "i1", &me, "fire", &ts(3))).unwrap();

        let reactions = db
            .with_conn(|c| reactions_for_items(c, &["i1".to_string()]))
            .unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].reaction, "fire");

        assert!(db.with_conn(|c| delete_reaction(c, "i1", &me)).unwrap());
        assert!(!db.with_conn(|c| delete_reaction(c, "i1", &me)).unwrap());
    }

    #[test]
    fn changing_a_reaction_keeps_its_place() {
        let db = db();
        let ann = user(&db, "Ann");
        let ben = user(&db, "Ben");
        db.with_conn(|c| {
            insert_feed_item(c, "i1", &ann, "wake_up", "m", None, &ts(1))?;
            upsert_reaction(c, "i1", &ann, "applause", &ts(2))?;
            upsert_reaction(c, "i1", &ben, "fire", &ts(3))?;
            upsert_reaction(c, "i1", &ann, "muscle", &ts(4))
        })
        .unwrap();

        let reactions = db
            .with_conn(|c| reactions_for_items(c, &["i1".to_string()]))
            .unwrap();
        let seen: Vec<_> = reactions
            .iter()
            .map(|r| (r.display_name.as_str(), r.reaction.as_str()))
            .collect();
        assert_eq!(seen, vec![("Ann", "muscle"), ("Ben", "fire")]);
        assert_eq!(reactions[0].created_at, ts(2));
    }

    #[test]
    fn comments_append_in_order() {
        let db = db();
        let me = user(&db, "Me");
        db.with_conn(|c| {
            insert_feed_item(c, "i1", &me, "wake_up", "m", None, &ts(1))?;
            insert_comment(c, "c1", "i1", &me, "first", &ts(2))?;
            insert_comment(c, "c2", "i1", &me, "second", &ts(2))
        })
        .unwrap();

        let comments = db
            .with_conn(|c| comments_for_items(c, &["i1".to_string()]))
            .unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
