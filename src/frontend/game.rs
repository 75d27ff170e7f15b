use chess_trainer::format::{describe_fen, format_eval_score};
use chess_trainer::{FeedbackPayload, HistoryEntry};
use yew::prelude::*;

/// What the feedback area currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackView {
    Empty,
    Analysis(FeedbackPayload),
    Html(String),
}

#[derive(Properties, PartialEq)]
pub struct Props {
    pub fen: String,
    pub game_over: bool,
    pub waiting: bool,
    pub feedback: FeedbackView,
    pub history: Vec<HistoryEntry>,
    pub feedback_ref: NodeRef,
    pub onflip: Callback<()>,
}

pub struct GameControls;

impl Component for GameControls {
    type Message = ();
    type Properties = Props;

    fn create(_ctx: &Context<Self>) -> Self {
        Self
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let props = ctx.props();
        let onflip = props.onflip.clone();

        html! {
            <div class="card">
                <div class="card-body">
                    <h2 class="h5">{"Game Status"}</h2>

                    <div class="mb-3">
                        if props.game_over {
                            <div class="fw-semibold text-danger">{"Game Over"}</div>
                        } else if props.waiting {
                            <div class="fw-semibold text-secondary">{"Opponent is thinking..."}</div>
                        } else {
                            <div class="fw-semibold text-success">{ describe_fen(&props.fen) }</div>
                        }
                    </div>

                    <div id="feedback-container" class="mb-3" ref={props.feedback_ref.clone()}>
                        { view_feedback(&props.feedback) }
                    </div>

                    <h3 class="h6">{"Moves"}</h3>
                    <ol id="move-history" class="list-unstyled small">
                        { for props.history.iter().map(view_history_entry) }
                    </ol>

                    <button id="flip-board" class="btn btn-outline-secondary btn-sm"
                        onclick={move |_| onflip.emit(())}>
                        {"Flip Board"}
                    </button>
                </div>
            </div>
        }
    }
}

fn view_feedback(feedback: &FeedbackView) -> Html {
    match feedback {
        FeedbackView::Empty => html! {},
        FeedbackView::Html(markup) => Html::from_html_unchecked(AttrValue::from(markup.clone())),
        FeedbackView::Analysis(payload) => match payload.parse() {
            Ok(analysis) => {
                let quality = analysis.classification.clone().unwrap_or_default();
                html! {
                    <div class={classes!("alert", if analysis.is_good() { "alert-success" } else { "alert-warning" })}>
                        if let Some(mv) = &analysis.move_played {
                            <div class="fw-semibold">{ format!("{}: {}", mv, quality) }</div>
                        }
                        if analysis.eval_score.is_some() {
                            <div class="small">{ format!("Evaluation {}", format_eval_score(analysis.eval_score)) }</div>
                        }
                        if let Some(text) = &analysis.feedback {
                            <p class="mb-1">{ text }</p>
                        }
                        if !analysis.is_good() {
                            if let Some(hint) = analysis.improvement.as_ref().filter(|h| !h.is_empty()) {
                                <p class="mb-0 fst-italic">{ hint }</p>
                            }
                        }
                    </div>
                }
            }
            // Not JSON: the server sent markup meant for this area.
            Err(_) => Html::from_html_unchecked(AttrValue::from(payload.as_str().to_string())),
        },
    }
}

fn view_history_entry(entry: &HistoryEntry) -> Html {
    html! {
        <li key={entry.move_number.to_string()}>
            { format!("{}. {} ", entry.move_number, entry.move_san) }
            <span class="text-muted">{ format!("({})", entry.player) }</span>
        </li>
    }
}
