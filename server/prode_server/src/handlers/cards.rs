use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::CurrentUser;
use crate::closing;
use crate::db;
use crate::errors::{AppError, Result, ValidationError};
use crate::models::{card_display_name, Card, CardListEntry, Match, Pick, PredictionWithResult};
use crate::scoring::guess_hits;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CardPick {
    pub match_id: i64,
    pub pick: Pick,
    pub double_pick: Option<Pick>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCard {
    pub round_id: i64,
    pub picks: Vec<CardPick>,
}

/// Card invariants, checked fail-fast in a fixed order: every match of
/// the round carries exactly one primary pick, exactly one match carries
/// a double, and that double differs from its own primary. Picks for
/// unknown matches are ignored, as the form can only offer the round's
/// matches.
pub fn validate_picks(
    matches: &[Match],
    picks: &[CardPick],
) -> std::result::Result<(), ValidationError> {
    let mut by_match: HashMap<i64, Vec<&CardPick>> = HashMap::new();
    for pick in picks {
        by_match.entry(pick.match_id).or_default().push(pick);
    }

    for m in matches {
        match by_match.get(&m.id).map(Vec::as_slice) {
            Some([_single]) => {}
            _ => return Err(ValidationError::MissingPick { match_id: m.id }),
        }
    }

    let doubles: Vec<&CardPick> = matches
        .iter()
        .filter_map(|m| by_match.get(&m.id).and_then(|p| p.first().copied()))
        .filter(|p| p.double_pick.is_some())
        .collect();
    if doubles.len() != 1 {
        return Err(ValidationError::InvalidDoubleCount {
            count: doubles.len(),
        });
    }
    if doubles[0].double_pick == Some(doubles[0].pick) {
        return Err(ValidationError::DoubleEqualsPrimary);
    }

    Ok(())
}

pub async fn create_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCard>,
) -> Result<Json<Card>> {
    let round = db::get_round(&state.pool, payload.round_id)
        .await?
        .ok_or(AppError::NotFound("round"))?;

    let offset = state.config.rules.closing_offset();
    if closing::is_closed(&round, Utc::now(), offset) {
        return Err(ValidationError::RoundClosed.into());
    }

    let matches = db::matches_for_round(&state.pool, round.id).await?;
    validate_picks(&matches, &payload.picks)?;

    // card number by counting, backed by the unique index if two submits race
    let mut tx = state.pool.begin().await?;
    let existing = db::user_card_count(&mut tx, user.0.id, round.id).await?;
    let card = db::insert_card(&mut tx, user.0.id, round.id, existing as i32 + 1).await?;
    for pick in &payload.picks {
        if matches.iter().any(|m| m.id == pick.match_id) {
            db::insert_prediction(&mut tx, card.id, pick.match_id, pick.pick, pick.double_pick)
                .await?;
        }
    }
    tx.commit().await?;

    info!(
        "Card {} created for round {}",
        card_display_name(&user.0.username, card.card_number),
        round.number
    );
    Ok(Json(card))
}

/// All cards, the requesting user's first (newest round and highest
/// ordinal leading), then everyone else's.
pub async fn list_cards(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CardListEntry>>> {
    let mut cards = db::cards_of_user(&state.pool, user.0.id).await?;
    cards.extend(db::cards_of_others(&state.pool, user.0.id).await?);
    Ok(Json(cards))
}

#[derive(Debug, Serialize)]
pub struct PredictionDetail {
    #[serde(flatten)]
    pub prediction: PredictionWithResult,
    pub hit: bool,
}

#[derive(Debug, Serialize)]
pub struct CardDetail {
    pub card: Card,
    pub name: String,
    pub paid: bool,
    pub predictions: Vec<PredictionDetail>,
}

pub async fn card_detail(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CardDetail>> {
    let card = db::get_card(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("card"))?;
    let owner = db::get_user(&state.pool, card.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let paid = db::card_is_paid(&state.pool, card.id).await?;

    let predictions = db::predictions_with_results(&state.pool, card.id)
        .await?
        .into_iter()
        .map(|p| {
            let hit = p
                .result
                .is_some_and(|outcome| guess_hits(p.pick, p.double_pick, outcome));
            PredictionDetail { prediction: p, hit }
        })
        .collect();

    Ok(Json(CardDetail {
        name: card_display_name(&owner.username, card.card_number),
        card,
        paid,
        predictions,
    }))
}

pub async fn delete_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    user.require_admin()?;
    if !db::delete_card(&state.pool, id).await? {
        return Err(AppError::NotFound("card"));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

pub async fn search_cards(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<CardListEntry>>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let results = db::search_cards_by_name(&state.pool, query).await?;
    Ok(Json(results))
}
