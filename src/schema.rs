use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while talking to the game service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Server responded with status {status}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Reasons a submission is refused before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("Another move is still being submitted")]
    InFlight,
}

fn non_empty(field: &'static str, value: &str) -> Result<String, RequestError> {
    if value.trim().is_empty() {
        Err(RequestError::EmptyField(field))
    } else {
        Ok(value.to_string())
    }
}

/// Identifier of the game a page is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl AsRef<str>) -> Result<Self, RequestError> {
        non_empty("game_id", id.as_ref()).map(GameId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One move attempt, sent once to the game service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Source square, destination square and optional promotion piece
    pub move_uci: String,
    pub position_before: String,
    pub position_after: String,
}

impl MoveRequest {
    pub fn new(
        move_uci: &str,
        position_before: &str,
        position_after: &str,
    ) -> Result<Self, RequestError> {
        Ok(Self {
            move_uci: non_empty("move_uci", move_uci)?,
            position_before: non_empty("position_before", position_before)?,
            position_after: non_empty("position_after", position_after)?,
        })
    }

    /// `application/x-www-form-urlencoded` body
    pub fn to_form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("move_uci", &self.move_uci)
            .append_pair("position_before", &self.position_before)
            .append_pair("position_after", &self.position_after)
            .finish()
    }
}

/// Raw body of an accepted move. The submitter passes it through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackPayload(String);

impl FeedbackPayload {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<MoveFeedback, TransportError> {
        serde_json::from_str(&self.0).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Analysis the server returns for a user move
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveFeedback {
    pub status: Option<String>,
    #[serde(rename = "move")]
    pub move_played: Option<String>,
    pub feedback: Option<String>,
    pub improvement: Option<String>,
    pub classification: Option<String>,
    /// Engine evaluation in pawns, when the server reports one
    pub eval_score: Option<f64>,
}

impl MoveFeedback {
    /// Moves the server considers fine need no improvement hint.
    pub fn is_good(&self) -> bool {
        matches!(
            self.classification.as_deref(),
            Some("best") | Some("excellent") | Some("good")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiMove {
    pub status: Option<String>,
    #[serde(rename = "move")]
    pub move_san: Option<String>,
    pub move_uci: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub move_number: u32,
    pub move_san: String,
    pub player: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveHistory {
    pub status: Option<String>,
    pub moves: Vec<HistoryEntry>,
}
