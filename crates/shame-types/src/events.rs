use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed to clients over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, display_name: String },

    /// A friend logged their wake-up
    WakeUp {
        user_id: Uuid,
        display_name: String,
        time: String,
        feed_item_id: Uuid,
    },

    /// Someone shamed the recipient
    Shamed {
        from_user_id: Uuid,
        from_display_name: String,
        feed_item_id: Uuid,
    },

    /// A friend request addressed to the recipient
    FriendRequestReceived {
        request_id: Uuid,
        from_user_id: Uuid,
        from_display_name: String,
    },

    /// A request the recipient sent was accepted
    FriendRequestAccepted {
        request_id: Uuid,
        by_user_id: Uuid,
        by_display_name: String,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_tagged_layout() {
        let id = Uuid::nil();
        let json = serde_json::to_value(GatewayEvent::Shamed {
            from_user_id: id,
            from_display_name: "Alice".into(),
            feed_item_id: id,
        })
        .unwrap();

        assert_eq!(json["type"], "Shamed");
        assert_eq!(json["data"]["from_display_name"], "Alice");
    }

    #[test]
    fn identify_parses() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        let GatewayCommand::Identify { token } = cmd;
        assert_eq!(token, "abc");
    }
}
