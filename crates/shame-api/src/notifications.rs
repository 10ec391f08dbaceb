//! Fire-and-forget notifications over the gateway, plus push-token
//! registration. Delivery never fails the request that triggered it.

use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use shame_db::queries::users;
use shame_gateway::Dispatcher;
use shame_types::api::{Claims, PushTokenRequest};
use shame_types::events::GatewayEvent;
use shame_types::models::Profile;

use crate::{
    AppState, convert,
    error::ApiError,
    run_blocking,
    wakeup::{self, WakeUpNotice},
};

const MAX_PUSH_TOKEN_LEN: usize = 4096;

/// One `WakeUp` event to every friend of the user who got up.
pub(crate) async fn notify_wake_up(dispatcher: &Dispatcher, notice: WakeUpNotice) {
    let delivered = dispatcher
        .send_to_users(
            &notice.friends,
            GatewayEvent::WakeUp {
                user_id: notice.user_id,
                display_name: notice.display_name,
                time: notice.time,
                feed_item_id: notice.feed_item_id,
            },
        )
        .await;
    debug!(
        "Wake-up of {} delivered to {}/{} friends",
        notice.user_id,
        delivered,
        notice.friends.len()
    );
}

pub(crate) async fn notify_shame(
    dispatcher: &Dispatcher,
    target: Uuid,
    from_user_id: Uuid,
    from_display_name: String,
    feed_item_id: Uuid,
) {
    dispatcher
        .send_to_user(
            target,
            GatewayEvent::Shamed {
                from_user_id,
                from_display_name,
                feed_item_id,
            },
        )
        .await;
}

pub(crate) async fn notify_friend_request(
    dispatcher: &Dispatcher,
    to_user_id: Uuid,
    request_id: Uuid,
    from_user_id: Uuid,
    from_display_name: String,
) {
    dispatcher
        .send_to_user(
            to_user_id,
            GatewayEvent::FriendRequestReceived {
                request_id,
                from_user_id,
                from_display_name,
            },
        )
        .await;
}

pub(crate) async fn notify_request_accepted(
    dispatcher: &Dispatcher,
    sender: Uuid,
    request_id: Uuid,
    by_user_id: Uuid,
    by_display_name: String,
) {
    dispatcher
        .send_to_user(
            sender,
            GatewayEvent::FriendRequestAccepted {
                request_id,
                by_user_id,
                by_display_name,
            },
        )
        .await;
}

/// Stores the device push token, or clears it with `null`.
pub async fn set_push_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PushTokenRequest>,
) -> Result<Json<Profile>, ApiError> {
    let token = req
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if token.as_ref().is_some_and(|t| t.len() > MAX_PUSH_TOKEN_LEN) {
        return Err(ApiError::validation("push token is too long"));
    }

    let uid = claims.sub.to_string();
    let profile = run_blocking(&state, move |s| {
        let user = s.db.transaction(|tx| {
            users::set_push_token(tx, &uid, token.as_deref())?;
            let user = users::user_by_id(tx, &uid)?
                .ok_or_else(|| ApiError::not_found("user not found"))?;
            Ok::<_, ApiError>(wakeup::with_current_streak(tx, user, Utc::now())?)
        })?;
        Ok(convert::profile(&user)?)
    })
    .await?;

    Ok(Json(profile))
}
