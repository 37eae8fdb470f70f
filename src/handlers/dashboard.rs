//! Dashboard handler

use axum::{extract::State, response::Html};

use crate::AppState;

/// Serve the status board rendered from the current history snapshot.
/// No authentication; the board is read-only.
pub async fn view(State(state): State<AppState>) -> Html<String> {
    Html(crate::dashboard::render(&state.ledger.snapshot()))
}
