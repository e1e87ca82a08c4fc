use serde::Serialize;

use crate::errors::AppError;
use crate::models::PaidCard;

/// One row of a round's ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub rank: i32,
    pub card_id: i64,
    pub name: String,
    pub points: i32,
}

/// Competition ranking with gaps after ties over paid cards: sorted by
/// points descending with the card ordinal as tie-break, tied cards share
/// a rank, and the next distinct score takes rank = position + 1
/// (1,2,2,4 — not dense 1,2,2,3).
pub fn rank(cards: &[PaidCard]) -> Vec<Standing> {
    let mut sorted: Vec<&PaidCard> = cards.iter().collect();
    sorted.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(a.card_number.cmp(&b.card_number))
    });

    let mut standings = Vec::with_capacity(sorted.len());
    let mut current_rank = 0;
    let mut last_points = None;

    for (position, card) in sorted.iter().enumerate() {
        if last_points != Some(card.points) {
            current_rank = position as i32 + 1;
            last_points = Some(card.points);
        }
        standings.push(Standing {
            rank: current_rank,
            card_id: card.card_id,
            name: card.display_name(),
            points: card.points,
        });
    }

    standings
}

/// Every paid card sitting at the round's maximum point total.
pub fn winners(cards: &[PaidCard]) -> Vec<&PaidCard> {
    let Some(max) = cards.iter().map(|c| c.points).max() else {
        return Vec::new();
    };
    cards.iter().filter(|c| c.points == max).collect()
}

/// Split the pool equally. Refuses to divide by zero: no paid cards means
/// a reported no-winners condition, not a crash.
pub fn prize_per_winner(pool_total: i64, winner_count: usize) -> Result<f64, AppError> {
    if winner_count == 0 {
        return Err(AppError::NoEligibleWinners);
    }
    Ok(pool_total as f64 / winner_count as f64)
}
