use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use shame_db::models::UserRow;
use shame_db::queries::{friends as friends_q, users, wakeups};
use shame_engine::{friendship, schedule};
use shame_types::api::{
    Claims, FriendEntry, FriendRequestsResponse, FriendshipStatusResponse, SendFriendRequest,
};
use shame_types::models::{FriendRequest, FriendRequestStatus, FriendshipStatus};

use crate::{
    AppState, AppStateInner, convert, error::ApiError, notifications, run_blocking, wakeup,
};

/// Relationship between `me` and `other` as the store sees it.
fn current_status(conn: &Connection, me: &str, other: &str) -> anyhow::Result<FriendshipStatus> {
    Ok(friendship::status(
        friends_q::are_friends(conn, me, other)?,
        friends_q::has_pending_request(conn, me, other)?,
        friends_q::has_pending_request(conn, other, me)?,
    ))
}

/// Whether `friend` is inside their shame window right now.
fn can_shame(conn: &Connection, friend: &UserRow, now: DateTime<Utc>) -> anyhow::Result<bool> {
    let (Ok(goal), Ok(offset)) = (
        schedule::parse_time_of_day(&friend.sleep_goal),
        schedule::user_offset(friend.utc_offset_minutes),
    ) else {
        return Ok(false);
    };
    let local = schedule::local_time(now, offset);
    let today = convert::date_key(local.date_naive());
    let woke_up = wakeups::wake_up_on(conn, &friend.id, &today)?.is_some();
    Ok(schedule::shame_window_open(goal, local.time(), woke_up))
}

// -- Operations --

pub(crate) fn friends_of(
    state: &AppStateInner,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<FriendEntry>, ApiError> {
    Ok(state.db.with_conn(|conn| {
        let ids = friends_q::friend_ids(conn, user_id)?;
        users::users_by_ids(conn, &ids)?
            .into_iter()
            .map(|friend| -> anyhow::Result<FriendEntry> {
                let friend = wakeup::with_current_streak(conn, friend, now)?;
                Ok(FriendEntry {
                    user: convert::public_user(&friend)?,
                    can_shame: can_shame(conn, &friend, now)?,
                })
            })
            .collect()
    })?)
}

pub(crate) fn pending_requests(
    state: &AppStateInner,
    user_id: &str,
) -> Result<FriendRequestsResponse, ApiError> {
    Ok(state.db.with_conn(|conn| {
        let incoming = friends_q::incoming_requests(conn, user_id)?
            .iter()
            .map(convert::friend_request)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let outgoing = friends_q::outgoing_requests(conn, user_id)?
            .iter()
            .map(convert::friend_request)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(FriendRequestsResponse { incoming, outgoing })
    })?)
}

pub(crate) fn create_request(
    state: &AppStateInner,
    from_user_id: &str,
    to_user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<FriendRequest, ApiError> {
    let to = to_user_id.to_string();
    state.db.transaction(|tx| {
        if from_user_id == to {
            return Err(friendship::RequestRejection::SelfRequest.into());
        }
        if users::user_by_id(tx, &to)?.is_none() {
            return Err(ApiError::not_found("user not found"));
        }
        let status = current_status(tx, from_user_id, &to)?;
        friendship::check_can_request(from_user_id, &to, status)?;

        let id = Uuid::new_v4().to_string();
        friends_q::insert_friend_request(tx, &id, from_user_id, &to, &convert::timestamp(now))?;
        let row = friends_q::friend_request_by_id(tx, &id)?
            .ok_or_else(|| anyhow::anyhow!("friend request {id} vanished"))?;
        Ok(convert::friend_request(&row)?)
    })
}

/// Moves a pending request addressed to `user_id` to `accepted` or `rejected`.
/// Accepting also creates the friendship edge.
pub(crate) fn resolve_request(
    state: &AppStateInner,
    user_id: &str,
    request_id: Uuid,
    outcome: FriendRequestStatus,
    now: DateTime<Utc>,
) -> Result<FriendRequest, ApiError> {
    let id = request_id.to_string();
    state.db.transaction(|tx| {
        let request = friends_q::friend_request_by_id(tx, &id)?
            .filter(|r| r.to_user_id == user_id)
            .ok_or_else(|| ApiError::not_found("friend request not found"))?;

        let resolved_at = convert::timestamp(now);
        if !friends_q::resolve_friend_request(tx, &id, outcome.as_str(), &resolved_at)? {
            return Err(ApiError::conflict("friend request is no longer pending"));
        }

        if outcome == FriendRequestStatus::Accepted
            && !friends_q::are_friends(tx, &request.from_user_id, &request.to_user_id)?
        {
            let (a, b) = friendship::canonical_pair(&request.from_user_id, &request.to_user_id);
            friends_q::insert_friendship(tx, a, b, &resolved_at)?;
        }

        let row = friends_q::friend_request_by_id(tx, &id)?
            .ok_or_else(|| anyhow::anyhow!("friend request {id} vanished"))?;
        Ok(convert::friend_request(&row)?)
    })
}

/// Withdraws a pending request the user sent.
pub(crate) fn withdraw_request(
    state: &AppStateInner,
    user_id: &str,
    request_id: Uuid,
) -> Result<(), ApiError> {
    let id = request_id.to_string();
    state.db.transaction(|tx| {
        friends_q::friend_request_by_id(tx, &id)?
            .filter(|r| r.from_user_id == user_id)
            .ok_or_else(|| ApiError::not_found("friend request not found"))?;
        if !friends_q::delete_pending_request(tx, &id)? {
            return Err(ApiError::conflict("friend request is no longer pending"));
        }
        Ok(())
    })
}

pub(crate) fn unfriend(state: &AppStateInner, user_id: &str, friend_id: Uuid) -> Result<(), ApiError> {
    let friend = friend_id.to_string();
    let removed = state
        .db
        .transaction(|tx| friends_q::delete_friendship(tx, user_id, &friend))?;
    if !removed {
        return Err(ApiError::not_found("not friends with this user"));
    }
    Ok(())
}

pub(crate) fn status_with(
    state: &AppStateInner,
    user_id: &str,
    other: Uuid,
) -> Result<FriendshipStatusResponse, ApiError> {
    let other_id = other.to_string();
    state.db.transaction(|tx| {
        if users::user_by_id(tx, &other_id)?.is_none() {
            return Err(ApiError::not_found("user not found"));
        }
        let status = if other_id == user_id {
            FriendshipStatus::None
        } else {
            current_status(tx, user_id, &other_id)?
        };
        Ok(FriendshipStatusResponse {
            user_id: other,
            status,
        })
    })
}

// -- Handlers --

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<FriendEntry>>, ApiError> {
    let uid = claims.sub.to_string();
    let friends = run_blocking(&state, move |s| friends_of(s, &uid, Utc::now())).await?;
    Ok(Json(friends))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FriendRequestsResponse>, ApiError> {
    let uid = claims.sub.to_string();
    let requests = run_blocking(&state, move |s| pending_requests(s, &uid)).await?;
    Ok(Json(requests))
}

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendFriendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let request = run_blocking(&state, move |s| {
        create_request(s, &uid, req.to_user_id, Utc::now())
    })
    .await?;

    info!("{} sent a friend request to {}", request.from_user_id, request.to_user_id);
    notifications::notify_friend_request(
        &state.dispatcher,
        request.to_user_id,
        request.id,
        request.from_user_id,
        request.from_display_name.clone(),
    )
    .await;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<FriendRequest>, ApiError> {
    let uid = claims.sub.to_string();
    let request = run_blocking(&state, move |s| {
        resolve_request(s, &uid, request_id, FriendRequestStatus::Accepted, Utc::now())
    })
    .await?;

    notifications::notify_request_accepted(
        &state.dispatcher,
        request.from_user_id,
        request.id,
        request.to_user_id,
        request.to_display_name.clone(),
    )
    .await;

    Ok(Json(request))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<FriendRequest>, ApiError> {
    let uid = claims.sub.to_string();
    let request = run_blocking(&state, move |s| {
        resolve_request(s, &uid, request_id, FriendRequestStatus::Rejected, Utc::now())
    })
    .await?;
    Ok(Json(request))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let uid = claims.sub.to_string();
    run_blocking(&state, move |s| withdraw_request(s, &uid, request_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(friend_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let uid = claims.sub.to_string();
    run_blocking(&state, move |s| unfriend(s, &uid, friend_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn friendship_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FriendshipStatusResponse>, ApiError> {
    let uid = claims.sub.to_string();
    let status = run_blocking(&state, move |s| status_with(s, &uid, user_id)).await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestUser, state, ts};

    #[test]
    fn request_lifecycle_accept() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        let now = ts(2026, 3, 2, 9, 0);

        let request = create_request(&state, &alice.id, bob.uuid(), now).unwrap();
        assert_eq!(request.status, FriendRequestStatus::Pending);
        assert_eq!(
            status_with(&state, &alice.id, bob.uuid()).unwrap().status,
            FriendshipStatus::PendingOutgoing
        );
        assert_eq!(
            status_with(&state, &bob.id, alice.uuid()).unwrap().status,
            FriendshipStatus::PendingIncoming
        );

        // Only the recipient may accept.
        assert!(matches!(
            resolve_request(&state, &alice.id, request.id, FriendRequestStatus::Accepted, now),
            Err(ApiError::NotFound(_))
        ));
        let accepted =
            resolve_request(&state, &bob.id, request.id, FriendRequestStatus::Accepted, now).unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);

        assert_eq!(
            status_with(&state, &alice.id, bob.uuid()).unwrap().status,
            FriendshipStatus::Friends
        );
        assert!(pending_requests(&state, &bob.id).unwrap().incoming.is_empty());
        assert!(matches!(
            resolve_request(&state, &bob.id, request.id, FriendRequestStatus::Rejected, now),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn reject_leaves_no_edge_and_allows_new_request() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        let now = ts(2026, 3, 2, 9, 0);

        let request = create_request(&state, &alice.id, bob.uuid(), now).unwrap();
        resolve_request(&state, &bob.id, request.id, FriendRequestStatus::Rejected, now).unwrap();
        assert_eq!(
            status_with(&state, &alice.id, bob.uuid()).unwrap().status,
            FriendshipStatus::None
        );
        assert!(create_request(&state, &alice.id, bob.uuid(), now).is_ok());
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        let now = ts(2026, 3, 2, 9, 0);

        assert!(matches!(
            create_request(&state, &alice.id, alice.uuid(), now),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            create_request(&state, &alice.id, Uuid::new_v4(), now),
            Err(ApiError::NotFound(_))
        ));
        create_request(&state, &alice.id, bob.uuid(), now).unwrap();
        assert!(matches!(
            create_request(&state, &alice.id, bob.uuid(), now),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            create_request(&state, &bob.id, alice.uuid(), now),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn cancel_is_sender_only() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        let request = create_request(&state, &alice.id, bob.uuid(), ts(2026, 3, 2, 9, 0)).unwrap();

        assert!(matches!(
            withdraw_request(&state, &bob.id, request.id),
            Err(ApiError::NotFound(_))
        ));
        withdraw_request(&state, &alice.id, request.id).unwrap();
        assert!(pending_requests(&state, &alice.id).unwrap().outgoing.is_empty());
    }

    #[test]
    fn remove_friend_requires_edge() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        alice.befriend(&state, &bob);

        unfriend(&state, &bob.id, alice.uuid()).unwrap();
        assert!(matches!(
            unfriend(&state, &bob.id, alice.uuid()),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(
            status_with(&state, &alice.id, bob.uuid()).unwrap().status,
            FriendshipStatus::None
        );
    }

    #[test]
    fn friends_are_sorted_with_shame_window() {
        let state = state();
        let me = TestUser::new(&state, "Me");
        let zed = TestUser::new(&state, "Zed");
        let amy = TestUser::new(&state, "amy");
        me.befriend(&state, &zed);
        me.befriend(&state, &amy);

        // Both have a 7:00 AM goal in UTC: 7:45 is inside the window.
        let friends = friends_of(&state, &me.id, ts(2026, 3, 2, 7, 45)).unwrap();
        let names: Vec<_> = friends.iter().map(|f| f.user.display_name.as_str()).collect();
        assert_eq!(names, vec!["amy", "Zed"]);
        assert!(friends.iter().all(|f| f.can_shame));

        let early = friends_of(&state, &me.id, ts(2026, 3, 2, 7, 15)).unwrap();
        assert!(early.iter().all(|f| !f.can_shame));
        let noon = friends_of(&state, &me.id, ts(2026, 3, 2, 12, 0)).unwrap();
        assert!(noon.iter().all(|f| !f.can_shame));
    }
}
