use async_trait::async_trait;

use crate::schema::{AiMove, FeedbackPayload, GameId, MoveHistory, MoveRequest, TransportError};

/// Result type for game service calls
pub type ServiceResult<T> = Result<T, TransportError>;

/// Remote game service. Calls complete on the thread that issued them.
#[async_trait(?Send)]
pub trait GameService {
    /// Posts a user move for analysis
    async fn submit_move(&self, game_id: &GameId, request: &MoveRequest)
        -> ServiceResult<FeedbackPayload>;

    /// Asks the server for the opponent's reply
    async fn ai_move(&self, game_id: &GameId) -> ServiceResult<AiMove>;

    /// Moves recorded so far
    async fn move_history(&self, game_id: &GameId) -> ServiceResult<MoveHistory>;
}

/// Per-game endpoint paths, optionally rooted at a base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameEndpoints {
    base: String,
}

impl GameEndpoints {
    /// Paths relative to the page origin.
    pub fn same_origin() -> Self {
        Self::default()
    }

    pub fn with_base(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn submit_move(&self, game_id: &GameId) -> String {
        format!("{}/game/{}/move/", self.base, game_id)
    }

    pub fn ai_move(&self, game_id: &GameId) -> String {
        format!("{}/game/{}/ai_move/", self.base, game_id)
    }

    pub fn move_history(&self, game_id: &GameId) -> String {
        format!("{}/game/{}/move_history/", self.base, game_id)
    }
}
