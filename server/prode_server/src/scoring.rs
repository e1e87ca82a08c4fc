use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::errors::Result;
use crate::models::{Card, Match, Pick, Prediction};

/// Known outcomes of a round, keyed by match id. Matches without an
/// outcome simply do not appear.
pub fn results_map(matches: &[Match]) -> HashMap<i64, Pick> {
    matches
        .iter()
        .filter_map(|m| m.result.map(|r| (m.id, r)))
        .collect()
}

/// A guess hits when either the primary or the double pick equals the
/// known outcome.
pub fn guess_hits(pick: Pick, double_pick: Option<Pick>, outcome: Pick) -> bool {
    pick == outcome || double_pick == Some(outcome)
}

pub fn prediction_hits(prediction: &Prediction, outcome: Pick) -> bool {
    guess_hits(prediction.pick, prediction.double_pick, outcome)
}

pub fn score_card(predictions: &[Prediction], results: &HashMap<i64, Pick>) -> i32 {
    predictions
        .iter()
        .filter(|p| {
            results
                .get(&p.match_id)
                .is_some_and(|outcome| prediction_hits(p, *outcome))
        })
        .count() as i32
}

/// Totals for every card of a round. A card only earns its computed
/// score while a processed proof backs it; unpaid cards are forced to 0
/// rather than skipped, so a stale total cannot survive a rejected
/// proof.
pub fn round_totals(
    cards: &[Card],
    paid: &HashSet<i64>,
    predictions_by_card: &HashMap<i64, Vec<Prediction>>,
    results: &HashMap<i64, Pick>,
) -> HashMap<i64, i32> {
    cards
        .iter()
        .map(|card| {
            let points = if paid.contains(&card.id) {
                let predictions = predictions_by_card
                    .get(&card.id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                score_card(predictions, results)
            } else {
                0
            };
            (card.id, points)
        })
        .collect()
}

/// Recompute and persist every card total for a round. Overwrites
/// previous totals; rerunning on unchanged inputs writes the same
/// mapping.
pub async fn rescore_round(pool: &PgPool, round_id: i64) -> Result<HashMap<i64, i32>> {
    let matches = db::matches_for_round(pool, round_id).await?;
    let results = results_map(&matches);
    let cards = db::cards_for_round(pool, round_id).await?;
    let paid = db::paid_card_ids(pool, round_id).await?;

    let mut by_card: HashMap<i64, Vec<Prediction>> = HashMap::new();
    for prediction in db::predictions_for_round(pool, round_id).await? {
        by_card.entry(prediction.card_id).or_default().push(prediction);
    }

    let totals = round_totals(&cards, &paid, &by_card, &results);

    let mut tx = pool.begin().await?;
    for (card_id, points) in &totals {
        db::set_card_points(&mut tx, *card_id, *points).await?;
    }
    tx.commit().await?;

    info!(
        "Rescored round {}: {} cards, {} matches with results",
        round_id,
        totals.len(),
        results.len()
    );
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_match(id: i64, result: Option<Pick>) -> Match {
        Match {
            id,
            round_id: 1,
            home_team_id: 10,
            away_team_id: 20,
            result,
        }
    }

    fn mk_card(id: i64) -> Card {
        Card {
            id,
            user_id: id,
            round_id: 1,
            card_number: 1,
            points: 0,
        }
    }

    fn mk_prediction(match_id: i64, pick: Pick, double_pick: Option<Pick>) -> Prediction {
        Prediction {
            id: match_id,
            card_id: 1,
            match_id,
            pick,
            double_pick,
        }
    }

    #[test]
    fn test_exact_hits_score_one_point_each() {
        // picks [Home, Draw, Away] vs outcomes [Home, Draw, Home]
        let matches = vec![
            mk_match(1, Some(Pick::Home)),
            mk_match(2, Some(Pick::Draw)),
            mk_match(3, Some(Pick::Home)),
        ];
        let results = results_map(&matches);
        let predictions = vec![
            mk_prediction(1, Pick::Home, None),
            mk_prediction(2, Pick::Draw, None),
            mk_prediction(3, Pick::Away, None),
        ];
        assert_eq!(score_card(&predictions, &results), 2);
    }

    #[test]
    fn test_double_pick_also_counts() {
        let matches = vec![mk_match(1, Some(Pick::Draw))];
        let results = results_map(&matches);
        let miss = vec![mk_prediction(1, Pick::Home, None)];
        let hit_via_double = vec![mk_prediction(1, Pick::Home, Some(Pick::Draw))];
        assert_eq!(score_card(&miss, &results), 0);
        assert_eq!(score_card(&hit_via_double, &results), 1);
    }

    #[test]
    fn test_unset_outcomes_contribute_nothing() {
        let matches = vec![mk_match(1, Some(Pick::Home)), mk_match(2, None)];
        let results = results_map(&matches);
        assert_eq!(results.len(), 1);
        let predictions = vec![
            mk_prediction(1, Pick::Home, None),
            mk_prediction(2, Pick::Home, Some(Pick::Draw)),
        ];
        assert_eq!(score_card(&predictions, &results), 1);
    }

    #[test]
    fn test_unpaid_cards_are_forced_to_zero() {
        let matches = vec![mk_match(1, Some(Pick::Home))];
        let results = results_map(&matches);
        let cards = vec![mk_card(1), mk_card(2), mk_card(3)];

        // identical winning predictions on every card
        let mut predictions: HashMap<i64, Vec<Prediction>> = HashMap::new();
        for card_id in 1..=2 {
            predictions.insert(card_id, vec![mk_prediction(1, Pick::Home, None)]);
        }
        let paid: HashSet<i64> = [1, 3].into_iter().collect();

        let totals = round_totals(&cards, &paid, &predictions, &results);
        assert_eq!(totals[&1], 1);
        // same hits, no processed proof
        assert_eq!(totals[&2], 0);
        // paid but empty card scores zero without panicking
        assert_eq!(totals[&3], 0);
    }

    #[test]
    fn test_scoring_is_idempotent_over_unchanged_inputs() {
        let matches = vec![
            mk_match(1, Some(Pick::Away)),
            mk_match(2, Some(Pick::Draw)),
        ];
        let results = results_map(&matches);
        let predictions = vec![
            mk_prediction(1, Pick::Away, None),
            mk_prediction(2, Pick::Home, Some(Pick::Draw)),
        ];
        let first = score_card(&predictions, &results);
        let second = score_card(&predictions, &results);
        assert_eq!(first, second);
        assert_eq!(first, 2);
    }
}
