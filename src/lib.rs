use std::str::FromStr;

pub mod csrf;
pub mod format;
pub mod scheduler;
pub mod schema;
pub mod service;
pub mod submitter;

#[cfg(not(target_arch = "wasm32"))]
pub mod http;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use schema::{
    AiMove, FeedbackPayload, GameId, HistoryEntry, MoveFeedback, MoveHistory, MoveRequest,
    RequestError, TransportError,
};
pub use submitter::{MoveSubmitter, SubmitOutcome};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Snapshot of the game a page is showing.
///
/// `chess::Board` only knows the placement, castling rights and en passant
/// square, so the two move counters of the position string are kept here.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub board: chess::Board,
    pub last_move: Option<String>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            board: chess::Board::default(),
            last_move: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Loads a position string; `"start"` is accepted as the initial position.
    /// Missing counters default to `0 1`.
    pub fn from_fen(fen: &str) -> Option<Self> {
        let fen = if fen.trim() == "start" { START_FEN } else { fen.trim() };
        let board = chess::Board::from_str(fen).ok()?;

        let mut counters = fen.split_whitespace().skip(4);
        let halfmove_clock = match counters.next() {
            Some(field) => field.parse().ok()?,
            None => 0,
        };
        let fullmove_number = match counters.next() {
            Some(field) => field.parse::<u32>().ok()?.max(1),
            None => 1,
        };

        Some(GameState {
            board,
            last_move: None,
            halfmove_clock,
            fullmove_number,
        })
    }

    pub fn fen(&self) -> String {
        let board = self.board.to_string();
        let fields: Vec<&str> = board.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            fields.join(" "),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn game_over(&self) -> bool {
        self.board.status() != chess::BoardStatus::Ongoing
    }

    /// Applies a UCI move if it is legal here and returns the new position.
    pub fn apply_uci(&mut self, move_uci: &str) -> Option<String> {
        let mv = chess::ChessMove::from_str(move_uci).ok()?;
        if !self.board.legal(mv) {
            return None;
        }

        // En passant is a pawn move, so the destination check covers every other capture.
        let pawn_move = self.board.piece_on(mv.get_source()) == Some(chess::Piece::Pawn);
        let capture = self.board.piece_on(mv.get_dest()).is_some();
        if pawn_move || capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if self.board.side_to_move() == chess::Color::Black {
            self.fullmove_number += 1;
        }

        self.board = self.board.make_move_new(mv);
        self.last_move = Some(mv.to_string());
        Some(self.fen())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
