use anyhow::{anyhow, Context, Result};
use clap::Parser;

use chess_trainer::{GameId, GameState, START_FEN};

/// Submit one move to a chess trainer game and follow the opponent's reply
#[derive(Parser, Debug)]
#[command(name = "chess_trainer", version)]
pub struct Args {
    /// Root URL of the trainer server
    #[arg(long, env = "CHESS_TRAINER_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Game to play the move in
    #[arg(long)]
    pub game: String,

    /// Move in UCI form, e.g. e2e4 or e7e8q
    #[arg(long = "move")]
    pub move_uci: String,

    /// Position before the move
    #[arg(long, default_value = START_FEN)]
    pub before: String,

    /// Position after the move, computed from --before and --move when omitted
    #[arg(long)]
    pub after: Option<String>,

    /// Value of the server's csrftoken cookie
    #[arg(long, env = "CHESS_TRAINER_CSRF_TOKEN")]
    pub csrf_token: Option<String>,

    /// Value of the server's sessionid cookie
    #[arg(long, env = "CHESS_TRAINER_SESSION")]
    pub session: Option<String>,
}

impl Args {
    pub fn game_id(&self) -> Result<GameId> {
        GameId::new(&self.game).context("Invalid --game")
    }

    /// The game as it stands after the move.
    pub fn game_after_move(&self) -> Result<GameState> {
        match &self.after {
            Some(after) => GameState::from_fen(after)
                .ok_or_else(|| anyhow!("Invalid --after position: {}", after)),
            None => {
                let mut game = GameState::from_fen(&self.before)
                    .ok_or_else(|| anyhow!("Invalid --before position: {}", self.before))?;
                game.apply_uci(&self.move_uci)
                    .ok_or_else(|| anyhow!("Illegal move {} in {}", self.move_uci, self.before))?;
                Ok(game)
            }
        }
    }
}
