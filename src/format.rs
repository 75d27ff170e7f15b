/// Engine evaluation in pawns, signed and fixed to two decimals.
pub fn format_eval_score(score: Option<f64>) -> String {
    match score {
        Some(score) if !score.is_nan() => {
            // Adding positive zero turns -0.0 into 0.0.
            let score = score + 0.0;
            if score > 0.0 {
                format!("+{:.2}", score)
            } else {
                format!("{:.2}", score)
            }
        }
        _ => "N/A".to_string(),
    }
}

/// Human readable side to move for a position string.
pub fn describe_fen(fen: &str) -> String {
    if fen.is_empty() {
        return String::new();
    }
    let turn = match fen.split(' ').nth(1) {
        Some("w") => "White",
        _ => "Black",
    };
    format!("{} to move", turn)
}
