use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::{cards, proofs, rounds};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/rounds", post(rounds::create_round))
        .route("/api/rounds/{id}", get(rounds::get_round))
        .route("/api/rounds/{id}/matches", post(rounds::create_match))
        .route("/api/rounds/{id}/results", post(rounds::submit_results))
        .route("/api/rounds/{id}/ranking", get(rounds::round_ranking))
        .route("/api/rounds/{id}/pool", post(rounds::send_pool))
        .route("/api/teams", post(rounds::create_team))
        .route("/api/cards", post(cards::create_card).get(cards::list_cards))
        .route("/api/cards/search", get(cards::search_cards))
        .route(
            "/api/cards/{id}",
            get(cards::card_detail).delete(cards::delete_card),
        )
        .route("/api/proofs", post(proofs::upload_proof))
        .route("/api/account", get(proofs::active_account))
        .nest_service("/media", ServeDir::new(&state.config.upload.dir))
        .with_state(state)
}
