#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod board;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod game;
#[cfg(target_arch = "wasm32")]
mod toast;

#[cfg(target_arch = "wasm32")]
fn main() {
    use chess_trainer::GameId;
    use log::error;

    use app::{App, ChallengeBoard, ChallengeProps, Props};

    wasm_logger::init(wasm_logger::Config::default());
    dom::activate_nav_links();

    if let Some(root) = dom::element_by_id("game-board") {
        match root.get_attribute("data-game-id").map(GameId::new) {
            Some(Ok(game_id)) => {
                let start_fen = root
                    .get_attribute("data-fen")
                    .unwrap_or_else(|| "start".to_string());
                yew::Renderer::<App>::with_root_and_props(root, Props { game_id, start_fen })
                    .render();
            }
            _ => error!("#game-board needs a data-game-id attribute"),
        }
    }

    if let Some(root) = dom::element_by_id("challenge-board") {
        let fen = root
            .get_attribute("data-fen")
            .unwrap_or_else(|| "start".to_string());
        yew::Renderer::<ChallengeBoard>::with_root_and_props(root, ChallengeProps { fen }).render();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!("chess_trainer_frontend runs in the browser. Build it with `trunk build` for wasm32.");
}
