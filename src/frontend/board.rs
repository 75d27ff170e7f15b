use std::str::FromStr;

use chess::{Board, ChessMove, Piece, Square};
use web_sys::{HtmlElement, MouseEvent};
use yew::prelude::*;

const PIECE_THEME: &str = "/static/chess_app/img/chesspieces/wikipedia";

#[derive(Properties, PartialEq)]
pub struct Props {
    pub fen: String,
    #[prop_or_default]
    pub flipped: bool,
    #[prop_or_default]
    pub last_move: Option<String>,
    pub onmove: Callback<String>,
}

pub struct ChessBoard {
    selected_square: Option<Square>,
    board_ref: NodeRef,
}

pub enum Msg {
    SquareClick(Square),
}

/// Builds the UCI string for a click pair, promoting to a queen when needed.
pub fn legal_uci(board: &Board, from: Square, to: Square) -> Option<String> {
    [None, Some(Piece::Queen)]
        .into_iter()
        .map(|promotion| ChessMove::new(from, to, promotion))
        .find(|mv| board.legal(*mv))
        .map(|mv| mv.to_string())
}

fn square_at(file: usize, rank: usize) -> Option<Square> {
    let name = format!("{}{}", (b'a' + file as u8) as char, rank + 1);
    Square::from_str(&name).ok()
}

impl Component for ChessBoard {
    type Message = Msg;
    type Properties = Props;

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            selected_square: None,
            board_ref: NodeRef::default(),
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::SquareClick(square) => {
                let Ok(board) = Board::from_str(&ctx.props().fen) else {
                    return false;
                };
                let own_piece = board.color_on(square) == Some(board.side_to_move());

                match self.selected_square.take() {
                    Some(selected) if selected != square => {
                        if let Some(uci) = legal_uci(&board, selected, square) {
                            ctx.props().onmove.emit(uci);
                        } else if own_piece {
                            self.selected_square = Some(square);
                        }
                    }
                    Some(_) => {}
                    None if own_piece => self.selected_square = Some(square),
                    None => {}
                }
                true
            }
        }
    }

    fn changed(&mut self, _ctx: &Context<Self>, _old_props: &Self::Properties) -> bool {
        self.selected_square = None;
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let board_ref = self.board_ref.clone();
        let flipped = ctx.props().flipped;
        let onclick = ctx.link().batch_callback(move |e: MouseEvent| {
            let board = board_ref.cast::<HtmlElement>()?;
            let rect = board.get_bounding_client_rect();
            let square_size = rect.width() / 8.0;
            let x = (((e.client_x() as f64 - rect.left()) / square_size) as usize).min(7);
            let y = (((e.client_y() as f64 - rect.top()) / square_size) as usize).min(7);
            let (file, rank) = if flipped { (7 - x, y) } else { (x, 7 - y) };
            square_at(file, rank).map(Msg::SquareClick)
        });

        html! {
            <div class="chess-board" ref={self.board_ref.clone()}
                style="position: relative; width: 100%; aspect-ratio: 1 / 1;">
                <div onclick={onclick}
                    style="position: absolute; inset: 0; display: grid; grid-template-columns: repeat(8, 1fr); cursor: pointer;">
                    { self.render_squares(ctx) }
                </div>
                { self.render_pieces(&ctx.props().fen, flipped) }
            </div>
        }
    }
}

impl ChessBoard {
    fn render_squares(&self, ctx: &Context<Self>) -> Html {
        let flipped = ctx.props().flipped;
        let last_move = ctx.props().last_move.as_deref().unwrap_or("");
        let mut squares = Vec::with_capacity(64);

        for row in 0..8 {
            for col in 0..8 {
                let (file, rank) = if flipped { (7 - col, row) } else { (col, 7 - row) };
                let Some(square) = square_at(file, rank) else {
                    continue;
                };
                let name = square.to_string();
                let is_dark = (rank + file) % 2 == 0;
                let mut class = classes!("square", if is_dark { "square-dark" } else { "square-light" });
                if self.selected_square == Some(square) {
                    class.push("square-selected");
                }
                if last_move.len() >= 4 && (last_move[..2] == name || last_move[2..4] == name) {
                    class.push("square-last-move");
                }
                squares.push(html! { <div key={name.clone()} class={class} data-square={name}></div> });
            }
        }
        html! { <>{squares}</> }
    }

    fn render_pieces(&self, fen: &str, flipped: bool) -> Html {
        let mut pieces = Vec::new();
        let placement = fen.split(' ').next().unwrap_or("");

        for (rank_idx, rank) in placement.split('/').enumerate() {
            let mut file_idx = 0;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file_idx += skip as usize;
                    continue;
                }
                let color = if c.is_uppercase() { 'w' } else { 'b' };
                let piece = format!("{}{}", color, c.to_ascii_uppercase());
                let (col, row) = if flipped {
                    (7 - file_idx, 7 - rank_idx)
                } else {
                    (file_idx, rank_idx)
                };
                let left = format!("{}%", col as f32 * 12.5);
                let top = format!("{}%", row as f32 * 12.5);

                pieces.push(html! {
                    <img
                        src={format!("{}/{}.png", PIECE_THEME, piece)}
                        alt={piece}
                        style={format!("position: absolute; left: {}; top: {}; width: 12.5%; height: 12.5%; pointer-events: none;", left, top)}
                    />
                });
                file_idx += 1;
            }
        }
        html! { <>{pieces}</> }
    }
}
