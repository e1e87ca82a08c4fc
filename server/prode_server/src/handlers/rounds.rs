use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::CurrentUser;
use crate::closing;
use crate::db;
use crate::errors::{AppError, Result};
use crate::mailer::winner_email;
use crate::models::{Match, Pick, Round, Team};
use crate::ranking::{self, Standing};
use crate::scoring;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRound {
    pub number: i32,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub pool_total: Option<i64>,
}

pub async fn create_round(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRound>,
) -> Result<Json<Round>> {
    user.require_admin()?;
    let round = db::create_round(
        &state.pool,
        payload.number,
        payload.description.as_deref(),
        payload.starts_at,
        payload.closes_at,
        payload.pool_total,
    )
    .await?;
    Ok(Json(round))
}

#[derive(Debug, Serialize)]
pub struct RoundDetail {
    pub round: Round,
    pub matches: Vec<Match>,
    pub closes_at: Option<DateTime<Utc>>,
    pub closed: bool,
    pub time_remaining_secs: Option<i64>,
}

pub async fn get_round(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RoundDetail>> {
    let round = db::get_round(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("round"))?;
    let matches = db::matches_for_round(&state.pool, id).await?;

    let now = Utc::now();
    let offset = state.config.rules.closing_offset();
    Ok(Json(RoundDetail {
        closes_at: closing::resolve_closing(&round, offset),
        closed: closing::is_closed(&round, now, offset),
        time_remaining_secs: closing::time_remaining(&round, now, offset)
            .map(|d| d.num_seconds()),
        round,
        matches,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub crest_path: Option<String>,
}

pub async fn create_team(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTeam>,
) -> Result<Json<Team>> {
    user.require_admin()?;
    let team = db::create_team(&state.pool, &payload.name, payload.crest_path.as_deref()).await?;
    Ok(Json(team))
}

#[derive(Debug, Deserialize)]
pub struct CreateMatch {
    pub home_team_id: i64,
    pub away_team_id: i64,
}

pub async fn create_match(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
    Json(payload): Json<CreateMatch>,
) -> Result<Json<Match>> {
    user.require_admin()?;
    db::get_round(&state.pool, round_id)
        .await?
        .ok_or(AppError::NotFound("round"))?;
    let created = db::create_match(
        &state.pool,
        round_id,
        payload.home_team_id,
        payload.away_team_id,
    )
    .await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct MatchResult {
    pub match_id: i64,
    pub result: Pick,
}

#[derive(Debug, Deserialize)]
pub struct ResultsSubmission {
    pub results: Vec<MatchResult>,
}

/// Store the submitted outcomes and rescore every card of the round,
/// unpaid cards included (they go to zero).
pub async fn submit_results(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
    Json(payload): Json<ResultsSubmission>,
) -> Result<Json<HashMap<i64, i32>>> {
    user.require_admin()?;
    db::get_round(&state.pool, round_id)
        .await?
        .ok_or(AppError::NotFound("round"))?;

    let round_match_ids: HashSet<i64> = db::matches_for_round(&state.pool, round_id)
        .await?
        .iter()
        .map(|m| m.id)
        .collect();

    let mut tx = state.pool.begin().await?;
    for entry in &payload.results {
        if !round_match_ids.contains(&entry.match_id) {
            return Err(AppError::NotFound("match"));
        }
        db::set_match_result(&mut tx, entry.match_id, entry.result).await?;
    }
    tx.commit().await?;

    let totals = scoring::rescore_round(&state.pool, round_id).await?;
    Ok(Json(totals))
}

pub async fn round_ranking(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
) -> Result<Json<Vec<Standing>>> {
    db::get_round(&state.pool, round_id)
        .await?
        .ok_or(AppError::NotFound("round"))?;
    let paid = db::paid_cards_for_round(&state.pool, round_id).await?;
    Ok(Json(ranking::rank(&paid)))
}

#[derive(Debug, Serialize)]
pub struct PoolReport {
    pub round_id: i64,
    pub winners: Vec<Standing>,
    pub prize_per_winner: f64,
    pub emails_sent: usize,
    pub warnings: Vec<String>,
}

/// Split the round's pool among the winners and email each one. The
/// pool-sent flag commits before any email goes out; delivery problems
/// come back as warnings on an otherwise successful response.
pub async fn send_pool(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
) -> Result<Json<PoolReport>> {
    user.require_admin()?;
    let round = db::get_round(&state.pool, round_id)
        .await?
        .ok_or(AppError::NotFound("round"))?;
    if round.pool_sent {
        return Err(AppError::PoolAlreadySent);
    }
    let pool_total = round.pool_total.ok_or(AppError::NoPoolAmount)?;

    let paid = db::paid_cards_for_round(&state.pool, round_id).await?;
    let winners = ranking::winners(&paid);
    let prize = ranking::prize_per_winner(pool_total, winners.len())?;

    db::mark_pool_sent(&state.pool, round_id).await?;

    let mut emails_sent = 0;
    let mut warnings = Vec::new();
    for winner in &winners {
        let Some(email) = winner.email.clone() else {
            warnings.push(format!("{} has no email address", winner.display_name()));
            continue;
        };
        let (subject, body) = winner_email(
            &winner.username,
            &winner.display_name(),
            round.number,
            winner.points,
            prize,
        );
        match state.mailer.send(&subject, &body, &[email], None).await {
            Ok(()) => emails_sent += 1,
            Err(e) => {
                warn!("Prize email for {} failed: {}", winner.display_name(), e);
                warnings.push(format!("email to {} failed", winner.display_name()));
            }
        }
    }

    let winner_standings = winners
        .iter()
        .map(|w| Standing {
            rank: 1,
            card_id: w.card_id,
            name: w.display_name(),
            points: w.points,
        })
        .collect();

    Ok(Json(PoolReport {
        round_id,
        winners: winner_standings,
        prize_per_winner: prize,
        emails_sent,
        warnings,
    }))
}
