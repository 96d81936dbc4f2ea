use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::matches::{BallView, MatchView};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the WebSocket and SSE transports.
pub struct ServerEvent {
    /// Event name such as `ballUpdate`.
    pub event: String,
    /// Match the event belongs to, used for per-match filtering.
    pub match_id: Option<String>,
    pub data: serde_json::Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, match_id: Option<String>, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<String>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            match_id,
            data: serde_json::to_value(payload)?,
        })
    }

    /// Whether a viewer scoped to `match_id` should receive this event.
    pub fn concerns(&self, match_id: &str) -> bool {
        self.match_id.as_deref() == Some(match_id)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when the first innings closes and the other side starts batting.
pub struct InningsChangedEvent {
    pub match_id: String,
    #[serde(rename = "match")]
    pub game: MatchView,
    pub new_innings: u8,
    pub batting_team: String,
    pub target: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast after every recorded delivery.
pub struct BallUpdateEvent {
    pub match_id: String,
    #[serde(rename = "match")]
    pub game: MatchView,
    pub ball: BallView,
    pub commentary: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast once a result has been decided.
pub struct MatchEndedEvent {
    pub match_id: String,
    #[serde(rename = "match")]
    pub game: MatchView,
    pub winner: String,
    pub win_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast for direct edits of match details.
pub struct ScoreUpdateEvent {
    pub match_id: String,
    #[serde(rename = "match")]
    pub game: MatchView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a match has been removed.
pub struct MatchDeletedEvent {
    pub match_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// `all` or the identifier of the followed match.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
