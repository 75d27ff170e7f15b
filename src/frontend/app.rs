use std::rc::Rc;

use gloo::timers::callback::Timeout;
use log::{error, info, warn};
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;
use yew::html::Scope;
use yew::prelude::*;

use chess_trainer::browser::{BrowserGameService, TimeoutScheduler};
use chess_trainer::service::GameService;
use chess_trainer::submitter::{
    Collaborators, FeedbackArea, FeedbackRenderer, HistoryRenderer, MoveSubmitter, OpponentMover,
    SubmitOutcome,
};
use chess_trainer::{
    AiMove, FeedbackPayload, GameId, GameState, HistoryEntry, MoveHistory, RequestError,
    TransportError,
};

use crate::board::ChessBoard;
use crate::dom::{highlight, DEFAULT_HIGHLIGHT_MS};
use crate::game::{FeedbackView, GameControls};
use crate::toast::{Toast, ToastKind, ToastStack, TOAST_DELAY_MS};

pub enum Msg {
    MakeMove(String),
    Submitted(GameState, SubmitOutcome),
    ShowFeedback(FeedbackPayload),
    ShowHtml(String),
    RefreshHistory,
    HistoryLoaded(Result<MoveHistory, TransportError>),
    RequestOpponentMove,
    OpponentMoved(Result<AiMove, TransportError>),
    Flip,
    DismissToast(u32),
}

/// Routes submitter callbacks back into the component.
struct PageLink(Scope<App>);

impl FeedbackRenderer for PageLink {
    fn render(&self, payload: &FeedbackPayload) {
        self.0.send_message(Msg::ShowFeedback(payload.clone()));
    }
}

impl FeedbackArea for PageLink {
    fn set_html(&self, html: &str) {
        self.0.send_message(Msg::ShowHtml(html.to_string()));
    }
}

impl HistoryRenderer for PageLink {
    fn refresh(&self) {
        self.0.send_message(Msg::RefreshHistory);
    }
}

impl OpponentMover for PageLink {
    fn request_move(&self) {
        self.0.send_message(Msg::RequestOpponentMove);
    }
}

#[derive(Properties, PartialEq)]
pub struct Props {
    pub game_id: GameId,
    #[prop_or_else(|| "start".to_string())]
    pub start_fen: String,
}

pub struct App {
    game: GameState,
    service: Rc<BrowserGameService>,
    submitter: Rc<MoveSubmitter>,
    flipped: bool,
    waiting_for_opponent: bool,
    feedback: FeedbackView,
    feedback_ref: NodeRef,
    flash_feedback: bool,
    history: Vec<HistoryEntry>,
    toasts: Vec<Toast>,
    next_toast_id: u32,
}

impl App {
    fn show_notification(&mut self, ctx: &Context<Self>, message: String, kind: ToastKind) {
        let id = self.next_toast_id;
        self.next_toast_id += 1;
        self.toasts.push(Toast { id, message, kind });

        let link = ctx.link().clone();
        Timeout::new(TOAST_DELAY_MS, move || link.send_message(Msg::DismissToast(id))).forget();
    }
}

impl Component for App {
    type Message = Msg;
    type Properties = Props;

    fn create(ctx: &Context<Self>) -> Self {
        let game = GameState::from_fen(&ctx.props().start_fen).unwrap_or_else(|| {
            warn!("Unreadable start position, using the initial one");
            GameState::new()
        });

        let service = Rc::new(BrowserGameService::new());
        let page = Rc::new(PageLink(ctx.link().clone()));
        let submitter = Rc::new(MoveSubmitter::new(Collaborators {
            service: service.clone(),
            feedback: page.clone(),
            feedback_area: page.clone(),
            history: page.clone(),
            opponent: page,
            scheduler: Rc::new(TimeoutScheduler),
        }));

        ctx.link().send_message(Msg::RefreshHistory);
        Self {
            game,
            service,
            submitter,
            flipped: false,
            waiting_for_opponent: false,
            feedback: FeedbackView::Empty,
            feedback_ref: NodeRef::default(),
            flash_feedback: false,
            history: Vec::new(),
            toasts: Vec::new(),
            next_toast_id: 0,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::MakeMove(move_uci) => {
                if self.waiting_for_opponent || self.submitter.is_in_flight() {
                    self.show_notification(ctx, "Wait for the opponent's reply.".to_string(), ToastKind::Warning);
                    return true;
                }
                // The board only changes once the server has accepted the move.
                let position_before = self.game.fen();
                let mut next = self.game.clone();
                let Some(position_after) = next.apply_uci(&move_uci) else {
                    return false;
                };

                let submitter = self.submitter.clone();
                let game_id = ctx.props().game_id.clone();
                let link = ctx.link().clone();
                spawn_local(async move {
                    let outcome = submitter
                        .submit_move(&game_id, &move_uci, &position_before, &position_after, &next)
                        .await;
                    link.send_message(Msg::Submitted(next, outcome));
                });
                false
            }
            Msg::Submitted(next, outcome) => match outcome {
                SubmitOutcome::Accepted { opponent_scheduled } => {
                    self.game = next;
                    self.waiting_for_opponent = opponent_scheduled;
                    if self.game.game_over() {
                        self.show_notification(ctx, "Game over.".to_string(), ToastKind::Info);
                    }
                    true
                }
                SubmitOutcome::Failed(e) => {
                    info!("Move rejected by server: {}", e);
                    false
                }
                SubmitOutcome::Rejected(RequestError::InFlight) => {
                    self.show_notification(ctx, "Wait for the opponent's reply.".to_string(), ToastKind::Warning);
                    true
                }
                SubmitOutcome::Rejected(e) => {
                    error!("Move not sent: {}", e);
                    false
                }
            },
            Msg::ShowFeedback(payload) => {
                self.feedback = FeedbackView::Analysis(payload);
                self.flash_feedback = true;
                true
            }
            Msg::ShowHtml(markup) => {
                self.feedback = FeedbackView::Html(markup);
                true
            }
            Msg::RefreshHistory => {
                let service = self.service.clone();
                let game_id = ctx.props().game_id.clone();
                let link = ctx.link().clone();
                spawn_local(async move {
                    let history = service.move_history(&game_id).await;
                    link.send_message(Msg::HistoryLoaded(history));
                });
                false
            }
            Msg::HistoryLoaded(Ok(history)) => {
                self.history = history.moves;
                true
            }
            Msg::HistoryLoaded(Err(e)) => {
                warn!("Could not load move history: {}", e);
                false
            }
            Msg::RequestOpponentMove => {
                let service = self.service.clone();
                let game_id = ctx.props().game_id.clone();
                let link = ctx.link().clone();
                spawn_local(async move {
                    let reply = service.ai_move(&game_id).await;
                    link.send_message(Msg::OpponentMoved(reply));
                });
                false
            }
            Msg::OpponentMoved(Ok(reply)) => {
                self.waiting_for_opponent = false;
                let applied = match reply.move_uci.as_deref() {
                    Some(uci) => self.game.apply_uci(uci).is_some(),
                    None => false,
                };
                if applied {
                    ctx.link().send_message(Msg::RefreshHistory);
                    if let Some(text) = reply.feedback.filter(|t| !t.is_empty()) {
                        self.show_notification(ctx, text, ToastKind::Info);
                    }
                } else {
                    warn!("Unusable opponent move: {:?}", reply.move_uci);
                    self.show_notification(ctx, "The opponent could not move.".to_string(), ToastKind::Danger);
                }
                true
            }
            Msg::OpponentMoved(Err(e)) => {
                error!("Error getting opponent move: {}", e);
                self.waiting_for_opponent = false;
                self.show_notification(ctx, "Could not get the opponent's move.".to_string(), ToastKind::Danger);
                true
            }
            Msg::Flip => {
                self.flipped = !self.flipped;
                true
            }
            Msg::DismissToast(id) => {
                let before = self.toasts.len();
                self.toasts.retain(|toast| toast.id != id);
                self.toasts.len() != before
            }
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        if std::mem::take(&mut self.flash_feedback) {
            if let Some(element) = self.feedback_ref.cast::<Element>() {
                highlight(&element, DEFAULT_HIGHLIGHT_MS);
            }
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.submitter.cancel_pending();
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onmove = ctx.link().callback(Msg::MakeMove);
        let onflip = ctx.link().callback(|_| Msg::Flip);
        let ondismiss = ctx.link().callback(Msg::DismissToast);
        let fen = self.game.fen();

        html! {
            <div class="row g-4">
                <div class="col-md-7">
                    <ChessBoard
                        fen={fen.clone()}
                        flipped={self.flipped}
                        last_move={self.game.last_move.clone()}
                        onmove={onmove}
                    />
                </div>
                <div class="col-md-5">
                    <GameControls
                        fen={fen}
                        game_over={self.game.game_over()}
                        waiting={self.waiting_for_opponent}
                        feedback={self.feedback.clone()}
                        history={self.history.clone()}
                        feedback_ref={self.feedback_ref.clone()}
                        onflip={onflip}
                    />
                </div>
                <ToastStack toasts={self.toasts.clone()} ondismiss={ondismiss} />
            </div>
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct ChallengeProps {
    #[prop_or_else(|| "start".to_string())]
    pub fen: String,
}

/// Free-play board for puzzle pages. Moves stay local.
pub struct ChallengeBoard {
    game: GameState,
    flipped: bool,
}

pub enum ChallengeMsg {
    Move(String),
    Flip,
}

impl Component for ChallengeBoard {
    type Message = ChallengeMsg;
    type Properties = ChallengeProps;

    fn create(ctx: &Context<Self>) -> Self {
        Self {
            game: GameState::from_fen(&ctx.props().fen).unwrap_or_default(),
            flipped: false,
        }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            ChallengeMsg::Move(uci) => self.game.apply_uci(&uci).is_some(),
            ChallengeMsg::Flip => {
                self.flipped = !self.flipped;
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onmove = ctx.link().callback(ChallengeMsg::Move);
        let onflip = ctx.link().callback(|_| ChallengeMsg::Flip);

        html! {
            <div>
                <ChessBoard
                    fen={self.game.fen()}
                    flipped={self.flipped}
                    last_move={self.game.last_move.clone()}
                    onmove={onmove}
                />
                <button class="btn btn-outline-secondary btn-sm mt-2" onclick={onflip}>
                    {"Flip Board"}
                </button>
            </div>
        }
    }
}
