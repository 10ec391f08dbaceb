//! Friend-request state machine:
//! `none -> pending(outgoing | incoming) -> accepted (friends) | rejected (none)`.

use shame_types::models::FriendshipStatus;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestRejection {
    #[error("cannot send a friend request to yourself")]
    SelfRequest,
    #[error("already friends")]
    AlreadyFriends,
    #[error("friend request already sent")]
    AlreadyRequested,
    #[error("this user already sent you a friend request")]
    IncomingPending,
}

/// Undirected edges are stored once, smaller id first.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Derives the relationship from what the store knows about the pair.
pub fn status(is_friend: bool, outgoing_pending: bool, incoming_pending: bool) -> FriendshipStatus {
    if is_friend {
        FriendshipStatus::Friends
    } else if incoming_pending {
        FriendshipStatus::PendingIncoming
    } else if outgoing_pending {
        FriendshipStatus::PendingOutgoing
    } else {
        FriendshipStatus::None
    }
}

/// A request may only be sent from `None`.
pub fn check_can_request(
    requester: &str,
    target: &str,
    current: FriendshipStatus,
) -> Result<(), RequestRejection> {
    if requester == target {
        return Err(RequestRejection::SelfRequest);
    }
    match current {
        FriendshipStatus::None => Ok(()),
        FriendshipStatus::Friends => Err(RequestRejection::AlreadyFriends),
        FriendshipStatus::PendingOutgoing => Err(RequestRejection::AlreadyRequested),
        FriendshipStatus::PendingIncoming => Err(RequestRejection::IncomingPending),
    }
}
