use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use log::{debug, error, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use chess_trainer::format::{describe_fen, format_eval_score};
use chess_trainer::service::GameService;
use chess_trainer::submitter::{
    FeedbackArea, FeedbackRenderer, HistoryRenderer, OpponentMover, ERROR_ALERT_HTML,
    ERROR_MESSAGE,
};
use chess_trainer::{AiMove, FeedbackPayload, GameId, GameState, MoveFeedback, TransportError};

pub fn feedback_lines(feedback: &MoveFeedback) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(mv) = &feedback.move_played {
        let quality = feedback.classification.as_deref().unwrap_or("unrated");
        lines.push(format!("Move {}: {}", mv, quality));
    }
    if feedback.eval_score.is_some() {
        lines.push(format!("Evaluation: {}", format_eval_score(feedback.eval_score)));
    }
    if let Some(text) = feedback.feedback.as_deref().filter(|t| !t.is_empty()) {
        lines.push(text.to_string());
    }
    if !feedback.is_good() {
        if let Some(hint) = feedback.improvement.as_deref().filter(|t| !t.is_empty()) {
            lines.push(format!("Try instead: {}", hint));
        }
    }
    lines
}

pub struct ConsoleFeedback;

impl FeedbackRenderer for ConsoleFeedback {
    fn render(&self, payload: &FeedbackPayload) {
        match payload.parse() {
            Ok(feedback) => {
                for line in feedback_lines(&feedback) {
                    println!("{}", line);
                }
            }
            Err(_) => println!("{}", payload.as_str()),
        }
    }
}

pub struct ConsoleArea;

/// The terminal gets the plain failure message instead of the alert markup.
pub fn area_text(html: &str) -> &str {
    if html == ERROR_ALERT_HTML {
        ERROR_MESSAGE
    } else {
        html
    }
}

impl FeedbackArea for ConsoleArea {
    fn set_html(&self, html: &str) {
        eprintln!("{}", area_text(html));
    }
}

/// Requests the console collaborators start in the background.
/// Shutdown aborts whatever is still running.
#[derive(Clone, Default)]
pub struct Background(Rc<RefCell<JoinSet<()>>>);

impl Background {
    /// Must be called from inside a `LocalSet`.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        self.0.borrow_mut().spawn_local(task);
    }

    pub fn abort_all(&self) {
        let mut tasks = self.0.borrow_mut();
        if !tasks.is_empty() {
            debug!("Aborting {} background request(s)", tasks.len());
        }
        tasks.abort_all();
    }
}

pub struct ConsoleHistory {
    pub service: Rc<dyn GameService>,
    pub game_id: GameId,
    pub background: Background,
}

impl HistoryRenderer for ConsoleHistory {
    fn refresh(&self) {
        let service = self.service.clone();
        let game_id = self.game_id.clone();
        self.background.spawn(async move {
            match service.move_history(&game_id).await {
                Ok(history) => {
                    println!("Moves so far:");
                    for entry in history.moves {
                        println!("  {:>3}. {:<8} ({})", entry.move_number, entry.move_san, entry.player);
                    }
                }
                Err(e) => warn!("Could not load move history: {}", e),
            }
        });
    }
}

/// Fetches the reply and hands it to whoever waits on `replies`.
pub struct ConsoleOpponent {
    pub service: Rc<dyn GameService>,
    pub game_id: GameId,
    pub replies: UnboundedSender<Result<AiMove, TransportError>>,
    pub background: Background,
}

impl OpponentMover for ConsoleOpponent {
    fn request_move(&self) {
        let service = self.service.clone();
        let game_id = self.game_id.clone();
        let replies = self.replies.clone();
        self.background.spawn(async move {
            let reply = service.ai_move(&game_id).await;
            if replies.send(reply).is_err() {
                error!("Opponent move arrived after shutdown");
            }
        });
    }
}

pub fn print_reply(game: &mut GameState, reply: &AiMove) {
    let shown = reply
        .move_san
        .as_deref()
        .or(reply.move_uci.as_deref())
        .unwrap_or("?");
    println!("Opponent plays {}", shown);
    if let Some(feedback) = reply.feedback.as_deref().filter(|t| !t.is_empty()) {
        println!("{}", feedback);
    }
    if let Some(uci) = &reply.move_uci {
        match game.apply_uci(uci) {
            Some(fen) => println!("{} ({})", fen, describe_fen(&fen)),
            None => warn!("Opponent move {} does not fit the local position", uci),
        }
    }
}
