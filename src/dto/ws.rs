use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
/// Messages accepted from viewer WebSocket clients.
#[serde(tag = "type")]
pub enum ViewerInboundMessage {
    /// Follow a single match (advisory grouping).
    #[serde(rename = "joinMatch")]
    JoinMatch {
        #[serde(rename = "matchId")]
        match_id: String,
    },
    /// Stop following a match.
    #[serde(rename = "leaveMatch")]
    LeaveMatch {
        #[serde(rename = "matchId")]
        match_id: String,
    },
    #[serde(rename = "ping")]
    Ping,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to viewer WebSocket clients.
#[serde(tag = "type")]
pub enum ViewerOutboundMessage {
    /// Sent once right after the upgrade.
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "viewerId")]
        viewer_id: String,
    },
    #[serde(rename = "joined")]
    Joined {
        #[serde(rename = "matchId")]
        match_id: String,
    },
    #[serde(rename = "left")]
    Left {
        #[serde(rename = "matchId")]
        match_id: String,
    },
    #[serde(rename = "pong")]
    Pong,
    /// Domain event relayed from the broadcast hub.
    #[serde(rename = "event")]
    Event {
        event: String,
        #[serde(rename = "matchId", skip_serializing_if = "Option::is_none")]
        match_id: Option<String>,
        #[schema(value_type = Object)]
        data: serde_json::Value,
    },
    #[serde(rename = "error")]
    Error { message: String },
}
