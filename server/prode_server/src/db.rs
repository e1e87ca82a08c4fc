use std::collections::HashSet;

use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::models::{
    Card, CardListEntry, Match, PaidCard, PaymentProof, Pick, Prediction, PredictionWithResult,
    Round, Team, User,
};

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ---- users ----

pub async fn get_user(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn active_users_with_email(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE is_active AND email IS NOT NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

// ---- rounds and matches ----

pub async fn create_round(
    pool: &PgPool,
    number: i32,
    description: Option<&str>,
    starts_at: Option<chrono::DateTime<chrono::Utc>>,
    closes_at: Option<chrono::DateTime<chrono::Utc>>,
    pool_total: Option<i64>,
) -> Result<Round, sqlx::Error> {
    sqlx::query_as::<_, Round>(
        r#"
        INSERT INTO rounds (number, description, starts_at, closes_at, pool_total)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(number)
    .bind(description)
    .bind(starts_at)
    .bind(closes_at)
    .bind(pool_total)
    .fetch_one(pool)
    .await
}

pub async fn get_round(pool: &PgPool, id: i64) -> Result<Option<Round>, sqlx::Error> {
    sqlx::query_as::<_, Round>("SELECT * FROM rounds WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn all_rounds(pool: &PgPool) -> Result<Vec<Round>, sqlx::Error> {
    sqlx::query_as::<_, Round>("SELECT * FROM rounds ORDER BY number")
        .fetch_all(pool)
        .await
}

pub async fn mark_pool_sent(pool: &PgPool, round_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE rounds SET pool_sent = TRUE WHERE id = $1")
        .bind(round_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_team(
    pool: &PgPool,
    name: &str,
    crest_path: Option<&str>,
) -> Result<Team, sqlx::Error> {
    sqlx::query_as::<_, Team>(
        "INSERT INTO teams (name, crest_path) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(crest_path)
    .fetch_one(pool)
    .await
}

pub async fn create_match(
    pool: &PgPool,
    round_id: i64,
    home_team_id: i64,
    away_team_id: i64,
) -> Result<Match, sqlx::Error> {
    sqlx::query_as::<_, Match>(
        r#"
        INSERT INTO matches (round_id, home_team_id, away_team_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(round_id)
    .bind(home_team_id)
    .bind(away_team_id)
    .fetch_one(pool)
    .await
}

pub async fn matches_for_round(pool: &PgPool, round_id: i64) -> Result<Vec<Match>, sqlx::Error> {
    sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE round_id = $1 ORDER BY id")
        .bind(round_id)
        .fetch_all(pool)
        .await
}

pub async fn set_match_result(
    tx: &mut Transaction<'_, Postgres>,
    match_id: i64,
    result: Pick,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE matches SET result = $1 WHERE id = $2")
        .bind(result)
        .bind(match_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// ---- cards and predictions ----

pub async fn get_card(pool: &PgPool, id: i64) -> Result<Option<Card>, sqlx::Error> {
    sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn user_card_count(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    round_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM cards WHERE user_id = $1 AND round_id = $2",
    )
    .bind(user_id)
    .bind(round_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_card(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    round_id: i64,
    card_number: i32,
) -> Result<Card, sqlx::Error> {
    sqlx::query_as::<_, Card>(
        r#"
        INSERT INTO cards (user_id, round_id, card_number)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(round_id)
    .bind(card_number)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_prediction(
    tx: &mut Transaction<'_, Postgres>,
    card_id: i64,
    match_id: i64,
    pick: Pick,
    double_pick: Option<Pick>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO predictions (card_id, match_id, pick, double_pick)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(card_id)
    .bind(match_id)
    .bind(pick)
    .bind(double_pick)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn delete_card(pool: &PgPool, card_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cards WHERE id = $1")
        .bind(card_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn cards_for_round(pool: &PgPool, round_id: i64) -> Result<Vec<Card>, sqlx::Error> {
    sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE round_id = $1 ORDER BY id")
        .bind(round_id)
        .fetch_all(pool)
        .await
}

pub async fn set_card_points(
    tx: &mut Transaction<'_, Postgres>,
    card_id: i64,
    points: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cards SET points = $1 WHERE id = $2")
        .bind(points)
        .bind(card_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn predictions_for_round(
    pool: &PgPool,
    round_id: i64,
) -> Result<Vec<Prediction>, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(
        r#"
        SELECT p.*
        FROM predictions p
        JOIN cards c ON c.id = p.card_id
        WHERE c.round_id = $1
        ORDER BY p.card_id, p.match_id
        "#,
    )
    .bind(round_id)
    .fetch_all(pool)
    .await
}

pub async fn predictions_with_results(
    pool: &PgPool,
    card_id: i64,
) -> Result<Vec<PredictionWithResult>, sqlx::Error> {
    sqlx::query_as::<_, PredictionWithResult>(
        r#"
        SELECT p.id, p.card_id, p.match_id, p.pick, p.double_pick, m.result
        FROM predictions p
        JOIN matches m ON m.id = p.match_id
        WHERE p.card_id = $1
        ORDER BY p.match_id
        "#,
    )
    .bind(card_id)
    .fetch_all(pool)
    .await
}

const CARD_LIST_SELECT: &str = r#"
    SELECT c.id, c.user_id, u.username, c.round_id, r.number AS round_number,
           c.card_number, c.points,
           EXISTS (
               SELECT 1 FROM payment_proofs p
               WHERE p.card_id = c.id AND p.processed
           ) AS paid
    FROM cards c
    JOIN users u ON u.id = c.user_id
    JOIN rounds r ON r.id = c.round_id
"#;

/// The current user's cards, newest round and highest ordinal first.
pub async fn cards_of_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<CardListEntry>, sqlx::Error> {
    let query = format!(
        "{} WHERE c.user_id = $1 ORDER BY r.number DESC, c.card_number DESC",
        CARD_LIST_SELECT
    );
    sqlx::query_as::<_, CardListEntry>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Everyone else's cards, same ordering.
pub async fn cards_of_others(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<CardListEntry>, sqlx::Error> {
    let query = format!(
        "{} WHERE c.user_id <> $1 ORDER BY r.number DESC, c.card_number DESC",
        CARD_LIST_SELECT
    );
    sqlx::query_as::<_, CardListEntry>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Exact, case-insensitive lookup by display name ("maria2").
pub async fn search_cards_by_name(
    pool: &PgPool,
    query: &str,
) -> Result<Vec<CardListEntry>, sqlx::Error> {
    let sql = format!(
        "{} WHERE LOWER(u.username || c.card_number::TEXT) = LOWER($1) \
         ORDER BY r.number DESC, c.card_number DESC",
        CARD_LIST_SELECT
    );
    sqlx::query_as::<_, CardListEntry>(&sql)
        .bind(query)
        .fetch_all(pool)
        .await
}

// ---- payment proofs ----

pub async fn card_is_paid(pool: &PgPool, card_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM payment_proofs WHERE card_id = $1 AND processed)",
    )
    .bind(card_id)
    .fetch_one(pool)
    .await
}

pub async fn paid_card_ids(pool: &PgPool, round_id: i64) -> Result<HashSet<i64>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT c.id
        FROM cards c
        WHERE c.round_id = $1
          AND EXISTS (
              SELECT 1 FROM payment_proofs p
              WHERE p.card_id = c.id AND p.processed
          )
        "#,
    )
    .bind(round_id)
    .fetch_all(pool)
    .await?;
    Ok(ids.into_iter().collect())
}

/// Paid cards of a round with their owners, pre-sorted for ranking.
pub async fn paid_cards_for_round(
    pool: &PgPool,
    round_id: i64,
) -> Result<Vec<PaidCard>, sqlx::Error> {
    sqlx::query_as::<_, PaidCard>(
        r#"
        SELECT c.id AS card_id, c.user_id, u.username, u.email, c.card_number, c.points
        FROM cards c
        JOIN users u ON u.id = c.user_id
        WHERE c.round_id = $1
          AND EXISTS (
              SELECT 1 FROM payment_proofs p
              WHERE p.card_id = c.id AND p.processed
          )
        ORDER BY c.points DESC, c.card_number ASC
        "#,
    )
    .bind(round_id)
    .fetch_all(pool)
    .await
}

/// All-time processed proof count, computed by query at call time so the
/// account rotator cannot drift from the persisted rows.
pub async fn processed_proof_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payment_proofs WHERE processed")
        .fetch_one(pool)
        .await
}

pub async fn insert_proof(
    tx: &mut Transaction<'_, Postgres>,
    card_id: i64,
    user_id: i64,
    file_path: &str,
    comment: Option<&str>,
) -> Result<PaymentProof, sqlx::Error> {
    sqlx::query_as::<_, PaymentProof>(
        r#"
        INSERT INTO payment_proofs (card_id, user_id, file_path, comment, processed)
        VALUES ($1, $2, $3, $4, TRUE)
        RETURNING *
        "#,
    )
    .bind(card_id)
    .bind(user_id)
    .bind(file_path)
    .bind(comment)
    .fetch_one(&mut **tx)
    .await
}
