//! Social feed: wake-ups, shames and achievements of the user and their
//! friends, with reactions and comments.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use shame_db::models::{FeedItemRow, ShameEventRow};
use shame_db::queries::{feed as feed_q, friends as friends_q, users};
use shame_engine::{feed, schedule};
use shame_types::api::{Claims, CommentRequest, FeedQuery, ReactRequest, ShameResponse};
use shame_types::models::{FeedComment, FeedItem, FeedItemKind, ReactionType};

use crate::{
    AppState, AppStateInner, convert, error::ApiError, notifications, run_blocking, wakeup,
};

pub(crate) struct ShameOutcome {
    pub response: ShameResponse,
    pub target: Uuid,
    pub shamer: Uuid,
    pub shamer_display_name: String,
}

/// Loads an item the user may see: their own or a friend's.
fn visible_item(conn: &Connection, user_id: &str, item_id: &str) -> Result<FeedItemRow, ApiError> {
    let item = feed_q::feed_item_by_id(conn, item_id)?
        .ok_or_else(|| ApiError::not_found("feed item not found"))?;
    if item.author_id != user_id && !friends_q::are_friends(conn, user_id, &item.author_id)? {
        return Err(ApiError::not_found("feed item not found"));
    }
    Ok(item)
}

fn assemble(conn: &Connection, rows: Vec<FeedItemRow>) -> anyhow::Result<Vec<FeedItem>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let reactions = feed_q::reactions_for_items(conn, &ids)?;
    let comments = feed_q::comments_for_items(conn, &ids)?;
    convert::feed_items(rows, reactions, comments)
}

fn assemble_one(conn: &Connection, row: FeedItemRow) -> anyhow::Result<FeedItem> {
    assemble(conn, vec![row])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("feed item disappeared while loading"))
}

// -- Operations --

pub(crate) fn feed_for(
    state: &AppStateInner,
    user_id: &str,
    limit: Option<u32>,
) -> Result<Vec<FeedItem>, ApiError> {
    let limit = match limit {
        Some(0) => return Err(ApiError::validation("limit must be positive")),
        Some(n) => n.min(state.config.feed_limit),
        None => state.config.feed_limit,
    };
    Ok(state.db.with_conn(|conn| {
        let rows = feed_q::feed_for_user(conn, user_id, limit)?;
        assemble(conn, rows)
    })?)
}

pub(crate) fn set_reaction(
    state: &AppStateInner,
    user_id: &str,
    item_id: Uuid,
    reaction: Option<ReactionType>,
    now: DateTime<Utc>,
) -> Result<FeedItem, ApiError> {
    let item_id = item_id.to_string();
    state.db.transaction(|tx| {
        let item = visible_item(tx, user_id, &item_id)?;
        match reaction {
            Some(reaction) => feed_q::upsert_reaction(
                tx,
                &item_id,
                user_id,
                reaction.as_str(),
                &convert::timestamp(now),
            )?,
            None => {
                feed_q::delete_reaction(tx, &item_id, user_id)?;
            }
        }
        Ok(assemble_one(tx, item)?)
    })
}

pub(crate) fn add_comment(
    state: &AppStateInner,
    user_id: &str,
    item_id: Uuid,
    text: &str,
    now: DateTime<Utc>,
) -> Result<FeedComment, ApiError> {
    let text = feed::normalize_comment(text).ok_or_else(|| {
        ApiError::validation(format!(
            "comment must be 1 to {} characters",
            feed::MAX_COMMENT_CHARS
        ))
    })?;
    let item_id = item_id.to_string();
    state.db.transaction(|tx| {
        visible_item(tx, user_id, &item_id)?;
        let author = users::user_by_id(tx, user_id)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        let id = Uuid::new_v4();
        feed_q::insert_comment(tx, &id.to_string(), &item_id, user_id, text, &convert::timestamp(now))?;
        Ok(FeedComment {
            id,
            user_id: convert::parse_id(user_id)?,
            display_name: author.display_name,
            text: text.to_string(),
            created_at: now,
        })
    })
}

/// Posts a shame item under the target's name, records the event and
/// applies the score deduction.
pub(crate) fn shame_friend(
    state: &AppStateInner,
    shamer_id: &str,
    target: Uuid,
    now: DateTime<Utc>,
) -> Result<ShameOutcome, ApiError> {
    let target_id = target.to_string();
    if target_id == shamer_id {
        return Err(ApiError::validation("cannot shame yourself"));
    }

    let config = &state.config;
    state.db.transaction(|tx| {
        if !friends_q::are_friends(tx, shamer_id, &target_id)? {
            return Err(ApiError::not_found("friend not found"));
        }
        let shamer = users::user_by_id(tx, shamer_id)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        let target_user = users::user_by_id(tx, &target_id)?
            .ok_or_else(|| ApiError::not_found("friend not found"))?;

        let offset = schedule::user_offset(target_user.utc_offset_minutes)?;
        let date_key = convert::date_key(schedule::local_date(now, offset));

        if let Some(max) = config.max_shames_per_day {
            let already = friends_q::shames_on(tx, &target_id, &date_key)?;
            if already >= i64::from(max) {
                return Err(ApiError::conflict(format!(
                    "{} has already been shamed {} times today",
                    target_user.display_name, already
                )));
            }
        }

        let created_at = convert::timestamp(now);
        let item_id = Uuid::new_v4();
        feed_q::insert_feed_item(
            tx,
            &item_id.to_string(),
            &target_id,
            FeedItemKind::Shame.as_str(),
            &feed::shame_message(&target_user.display_name, &shamer.display_name),
            Some(shamer_id),
            &created_at,
        )?;

        let before = target_user.total_score;
        let score = wakeup::apply_shame_to_day(tx, &target_id, &date_key, config)?;
        let after = users::user_by_id(tx, &target_id)?
            .map(|u| u.total_score)
            .unwrap_or(before);

        friends_q::insert_shame_event(
            tx,
            &ShameEventRow {
                id: Uuid::new_v4().to_string(),
                target_user_id: target_id.clone(),
                shamer_user_id: shamer_id.to_string(),
                local_date: date_key.clone(),
                points_deducted: before - after,
                created_at,
            },
        )?;

        let item_row = feed_q::feed_item_by_id(tx, &item_id.to_string())?
            .ok_or_else(|| anyhow::anyhow!("feed item {item_id} vanished"))?;

        info!("{} shamed {}", shamer.display_name, target_user.display_name);

        Ok(ShameOutcome {
            response: ShameResponse {
                feed_item: assemble_one(tx, item_row)?,
                target_score: score.as_ref().map(convert::daily_score).transpose()?,
            },
            target,
            shamer: convert::parse_id(shamer_id)?,
            shamer_display_name: shamer.display_name,
        })
    })
}

// -- Handlers --

pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedItem>>, ApiError> {
    let uid = claims.sub.to_string();
    let items = run_blocking(&state, move |s| feed_for(s, &uid, query.limit)).await?;
    Ok(Json(items))
}

pub async fn react(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<ReactRequest>,
) -> Result<Json<FeedItem>, ApiError> {
    let uid = claims.sub.to_string();
    let item = run_blocking(&state, move |s| {
        set_reaction(s, &uid, item_id, Some(req.reaction), Utc::now())
    })
    .await?;
    Ok(Json(item))
}

pub async fn unreact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<FeedItem>, ApiError> {
    let uid = claims.sub.to_string();
    let item = run_blocking(&state, move |s| set_reaction(s, &uid, item_id, None, Utc::now())).await?;
    Ok(Json(item))
}

pub async fn comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let comment = run_blocking(&state, move |s| {
        add_comment(s, &uid, item_id, &req.text, Utc::now())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn shame(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(target): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let outcome = run_blocking(&state, move |s| shame_friend(s, &uid, target, Utc::now())).await?;

    notifications::notify_shame(
        &state.dispatcher,
        outcome.target,
        outcome.shamer,
        outcome.shamer_display_name,
        outcome.response.feed_item.id,
    )
    .await;

    Ok((StatusCode::CREATED, Json(outcome.response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestUser, state, state_with, ts};
    use shame_engine::GameConfig;

    fn post(state: &AppStateInner, author: &TestUser, message: &str, minute: u32) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .with_conn(|c| {
                feed_q::insert_feed_item(
                    c,
                    &id.to_string(),
                    &author.id,
                    "wake_up",
                    message,
                    None,
                    &convert::timestamp(ts(2026, 3, 2, 7, minute)),
                )
            })
            .unwrap();
        id
    }

    #[test]
    fn feed_is_limited_to_self_and_friends() {
        let state = state();
        let me = TestUser::new(&state, "Me");
        let friend = TestUser::new(&state, "Friend");
        let stranger = TestUser::new(&state, "Stranger");
        me.befriend(&state, &friend);
        post(&state, &me, "mine", 1);
        post(&state, &friend, "theirs", 2);
        post(&state, &stranger, "hidden", 3);

        let items = feed_for(&state, &me.id, None).unwrap();
        let messages: Vec<_> = items.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["theirs", "mine"]);

        assert_eq!(feed_for(&state, &me.id, Some(1)).unwrap().len(), 1);
        assert!(matches!(feed_for(&state, &me.id, Some(0)), Err(ApiError::Validation(_))));
    }

    #[test]
    fn reactions_upsert_and_require_visibility() {
        let state = state();
        let me = TestUser::new(&state, "Me");
        let friend = TestUser::new(&state, "Friend");
        let stranger = TestUser::new(&state, "Stranger");
        me.befriend(&state, &friend);
        let item = post(&state, &friend, "up early", 1);
        let now = ts(2026, 3, 2, 8, 0);

        set_reaction(&state, &me.id, item, Some(ReactionType::Applause), now).unwrap();
        let updated = set_reaction(&state, &me.id, item, Some(ReactionType::Muscle), now).unwrap();
        assert_eq!(updated.reactions.len(), 1);
        assert_eq!(updated.reactions[0].reaction, ReactionType::Muscle);
        assert_eq!(updated.reactions[0].display_name, "Me");

        let cleared = set_reaction(&state, &me.id, item, None, now).unwrap();
        assert!(cleared.reactions.is_empty());

        assert!(matches!(
            set_reaction(&state, &stranger.id, item, Some(ReactionType::Fire), now),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            set_reaction(&state, &me.id, Uuid::new_v4(), Some(ReactionType::Fire), now),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn comments_are_trimmed_and_bounded() {
        let state = state();
        let me = TestUser::new(&state, "Me");
        let item = post(&state, &me, "up early", 1);
        let now = ts(2026, 3, 2, 8, 0);

        let comment = add_comment(&state, &me.id, item, "  nice one  ", now).unwrap();
        assert_eq!(comment.text, "nice one");
        assert!(matches!(
            add_comment(&state, &me.id, item, "   ", now),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            add_comment(&state, &me.id, item, &"a".repeat(281), now),
            Err(ApiError::Validation(_))
        ));

        let items = feed_for(&state, &me.id, None).unwrap();
        assert_eq!(items[0].comments.len(), 1);
    }

    #[test]
    fn shame_posts_under_target_and_heads_the_feed() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        alice.befriend(&state, &bob);
        post(&state, &alice, "earlier", 1);

        let outcome = shame_friend(&state, &alice.id, bob.uuid(), ts(2026, 3, 2, 7, 45)).unwrap();
        let item = &outcome.response.feed_item;
        assert_eq!(item.kind, FeedItemKind::Shame);
        assert_eq!(item.author_id, bob.uuid());
        assert_eq!(item.actor_id, Some(alice.uuid()));
        assert_eq!(item.message, "Bob got SHAMED by Alice. Still sleeping? 😴");
        assert!(outcome.response.target_score.is_none());
        assert_eq!(outcome.target, bob.uuid());

        let feed = feed_for(&state, &alice.id, None).unwrap();
        assert_eq!(feed[0].id, item.id);
    }

    #[test]
    fn shame_requires_friendship() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        let now = ts(2026, 3, 2, 7, 45);
        assert!(matches!(
            shame_friend(&state, &alice.id, bob.uuid(), now),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            shame_friend(&state, &alice.id, alice.uuid(), now),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn shame_cap_applies_per_target_day() {
        let state = state_with(GameConfig {
            max_shames_per_day: Some(1),
            ..GameConfig::default()
        });
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        alice.befriend(&state, &bob);

        shame_friend(&state, &alice.id, bob.uuid(), ts(2026, 3, 2, 7, 45)).unwrap();
        assert!(matches!(
            shame_friend(&state, &alice.id, bob.uuid(), ts(2026, 3, 2, 8, 0)),
            Err(ApiError::Conflict(_))
        ));
        assert!(shame_friend(&state, &alice.id, bob.uuid(), ts(2026, 3, 3, 7, 45)).is_ok());
    }
}
