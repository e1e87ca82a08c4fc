use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use prode_server::accounts::{active_account, DepositAccount};
use prode_server::closing::{is_closed, time_remaining};
use prode_server::models::{Match, PaidCard, Pick, Prediction, Round};
use prode_server::ranking::{prize_per_winner, rank, winners};
use prode_server::scoring::{results_map, score_card};

fn round_starting_in(hours: i64) -> Round {
    Round {
        id: 1,
        number: 1,
        description: Some("Opening round".to_string()),
        starts_at: Some(now() + Duration::hours(hours)),
        closes_at: None,
        pool_sent: false,
        pool_total: Some(1000),
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 5, 12, 0, 0).unwrap()
}

fn mk_match(id: i64, result: Option<Pick>) -> Match {
    Match {
        id,
        round_id: 1,
        home_team_id: 1,
        away_team_id: 2,
        result,
    }
}

fn mk_prediction(card_id: i64, match_id: i64, pick: Pick, double_pick: Option<Pick>) -> Prediction {
    Prediction {
        id: match_id,
        card_id,
        match_id,
        pick,
        double_pick,
    }
}

fn paid_card(card_id: i64, username: &str, card_number: i32, points: i32) -> PaidCard {
    PaidCard {
        card_id,
        user_id: card_id,
        username: username.to_string(),
        email: Some(format!("{}@example.com", username)),
        card_number,
        points,
    }
}

#[test]
fn test_round_closes_two_hours_before_kickoff() {
    let round = round_starting_in(3);
    let offset = Duration::hours(2);

    let remaining = time_remaining(&round, now(), offset).unwrap();
    assert_eq!(remaining.num_seconds(), 3600);
    assert!(!is_closed(&round, now(), offset));

    let past_boundary = now() + Duration::hours(1) + Duration::seconds(1);
    assert!(is_closed(&round, past_boundary, offset));
}

#[test]
fn test_full_round_scoring_and_ranking() {
    let matches = vec![
        mk_match(1, Some(Pick::Home)),
        mk_match(2, Some(Pick::Draw)),
        mk_match(3, Some(Pick::Home)),
    ];
    let results = results_map(&matches);

    // two exact hits out of three
    let card_a = vec![
        mk_prediction(1, 1, Pick::Home, None),
        mk_prediction(1, 2, Pick::Draw, Some(Pick::Home)),
        mk_prediction(1, 3, Pick::Away, None),
    ];
    // full house, one via the double
    let card_b = vec![
        mk_prediction(2, 1, Pick::Home, None),
        mk_prediction(2, 2, Pick::Draw, None),
        mk_prediction(2, 3, Pick::Away, Some(Pick::Home)),
    ];
    assert_eq!(score_card(&card_a, &results), 2);
    assert_eq!(score_card(&card_b, &results), 3);

    let paid = vec![
        paid_card(1, "maria", 1, score_card(&card_a, &results)),
        paid_card(2, "jose", 1, score_card(&card_b, &results)),
    ];
    let standings = rank(&paid);
    assert_eq!(standings[0].name, "jose1");
    assert_eq!(standings[0].rank, 1);
    assert_eq!(standings[1].name, "maria1");
    assert_eq!(standings[1].rank, 2);
}

#[test]
fn test_rescoring_unchanged_inputs_is_stable() {
    let matches = vec![mk_match(1, Some(Pick::Away)), mk_match(2, None)];
    let results = results_map(&matches);
    let predictions = vec![
        mk_prediction(1, 1, Pick::Away, None),
        mk_prediction(1, 2, Pick::Home, Some(Pick::Draw)),
    ];

    let mut totals: HashMap<i64, i32> = HashMap::new();
    for _ in 0..3 {
        totals.insert(1, score_card(&predictions, &results));
    }
    assert_eq!(totals[&1], 1);
}

#[test]
fn test_dense_ranking_with_gaps() {
    let paid = vec![
        paid_card(1, "ana", 1, 10),
        paid_card(2, "bruno", 1, 8),
        paid_card(3, "carla", 2, 8),
        paid_card(4, "diego", 1, 5),
    ];
    let ranks: Vec<i32> = rank(&paid).iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![1, 2, 2, 4]);
}

#[test]
fn test_two_winners_split_the_pool_evenly() {
    let paid = vec![
        paid_card(1, "ana", 1, 7),
        paid_card(2, "bruno", 1, 7),
        paid_card(3, "carla", 1, 4),
    ];
    let w = winners(&paid);
    assert_eq!(w.len(), 2);
    let prize = prize_per_winner(1000, w.len()).unwrap();
    assert_eq!(prize, 500.0);
    assert_eq!(format!("${:.2}", prize), "$500.00");
}

#[test]
fn test_account_rotation_is_monotonic_and_clamped() {
    let accounts = DepositAccount::defaults();
    let last = accounts.len() - 1;

    let mut previous = 0;
    for count in 0..2000 {
        let chosen = active_account(&accounts, count, 300).unwrap();
        let index = accounts.iter().position(|a| a == chosen).unwrap();
        assert!(index >= previous);
        assert!(index <= last);
        previous = index;
    }
    // far past the end of the list it stays on the last account
    let chosen = active_account(&accounts, 1_000_000, 300).unwrap();
    assert_eq!(chosen, &accounts[last]);
}
