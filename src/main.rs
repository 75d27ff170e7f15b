use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use tokio::task::LocalSet;

use chess_trainer::csrf::CsrfToken;
use chess_trainer::format::describe_fen;
use chess_trainer::http::HttpGameService;
use chess_trainer::scheduler::TokioScheduler;
use chess_trainer::service::GameService;
use chess_trainer::submitter::{Collaborators, MoveSubmitter, SubmitOutcome};

mod cli;
mod console;

use cli::Args;
use console::{Background, ConsoleArea, ConsoleFeedback, ConsoleHistory, ConsoleOpponent};

async fn run(args: Args) -> Result<()> {
    let game_id = args.game_id()?;
    let mut game = args.game_after_move()?;
    let position_after = match &args.after {
        Some(after) => after.clone(),
        None => game.fen(),
    };

    let mut http = HttpGameService::new(&args.base_url)?;
    match args.csrf_token.as_deref().and_then(CsrfToken::new) {
        Some(token) => http = http.with_csrf_token(token),
        None => println!("Note: CHESS_TRAINER_CSRF_TOKEN not set, the server will likely refuse the move"),
    }
    if let Some(session) = &args.session {
        http = http.with_session(session.clone());
    }
    let service: Rc<dyn GameService> = Rc::new(http);

    let background = Background::default();
    let (replies_tx, mut replies_rx) = tokio::sync::mpsc::unbounded_channel();
    let submitter = MoveSubmitter::new(Collaborators {
        service: service.clone(),
        feedback: Rc::new(ConsoleFeedback),
        feedback_area: Rc::new(ConsoleArea),
        history: Rc::new(ConsoleHistory {
            service: service.clone(),
            game_id: game_id.clone(),
            background: background.clone(),
        }),
        opponent: Rc::new(ConsoleOpponent {
            service: service.clone(),
            game_id: game_id.clone(),
            replies: replies_tx,
            background: background.clone(),
        }),
        scheduler: Rc::new(TokioScheduler),
    });

    info!("Sending {} to {}", args.move_uci, args.base_url);
    let outcome = submitter
        .submit_move(&game_id, &args.move_uci, &args.before, &position_after, &game)
        .await;

    match outcome {
        SubmitOutcome::Accepted {
            opponent_scheduled: true,
        } => {
            println!("Waiting for the opponent. Press Ctrl+C to stop.");
            tokio::select! {
                reply = replies_rx.recv() => {
                    match reply.context("Opponent task ended without a reply")? {
                        Ok(ai_move) => console::print_reply(&mut game, &ai_move),
                        Err(e) => bail!("Could not get the opponent's move: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    // The timer may already have fired, so its request has to go too.
                    submitter.cancel_pending();
                    background.abort_all();
                    println!("\nShutting down gracefully...");
                }
            }
            Ok(())
        }
        SubmitOutcome::Accepted {
            opponent_scheduled: false,
        } => {
            println!("Game over ({})", describe_fen(&position_after));
            Ok(())
        }
        SubmitOutcome::Failed(e) => bail!("Move was not accepted: {}", e),
        SubmitOutcome::Rejected(e) => bail!("Move was not sent: {}", e),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let local = LocalSet::new();
    local.run_until(run(args)).await?;
    // Let the history refresh finish printing. Requests are bounded by the
    // client timeout and Ctrl+C aborts them, so this cannot wait forever.
    local.await;
    Ok(())
}
