use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome of a match and the value of a pick, stored as 1/2/3. Zero is
/// not a legal value, so an unset column can never read as an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum Pick {
    Home = 1,
    Draw = 2,
    Away = 3,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub phone: Option<String>,
    pub payout_alias: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub crest_path: Option<String>,
}

/// A round of play. `closes_at` is an explicit deadline override; the
/// effective deadline is always resolved through `closing::resolve_closing`,
/// never cached here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Round {
    pub id: i64,
    pub number: i32,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub pool_sent: bool,
    pub pool_total: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Match {
    pub id: i64,
    pub round_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub result: Option<Pick>,
}

/// One user entry in a round. `card_number` is the per-user ordinal
/// within the round, starting at 1; `points` is the last persisted total.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Card {
    pub id: i64,
    pub user_id: i64,
    pub round_id: i64,
    pub card_number: i32,
    pub points: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prediction {
    pub id: i64,
    pub card_id: i64,
    pub match_id: i64,
    pub pick: Pick,
    pub double_pick: Option<Pick>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentProof {
    pub id: i64,
    pub card_id: i64,
    pub user_id: i64,
    pub file_path: String,
    pub comment: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processed: bool,
}

/// A card backed by a processed proof, joined with its owner. The only
/// shape the ranking and prize logic ever see.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaidCard {
    pub card_id: i64,
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    pub card_number: i32,
    pub points: i32,
}

impl PaidCard {
    pub fn display_name(&self) -> String {
        card_display_name(&self.username, self.card_number)
    }
}

/// A card as shown in listings and search results.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CardListEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub round_id: i64,
    pub round_number: i32,
    pub card_number: i32,
    pub points: i32,
    pub paid: bool,
}

/// A prediction joined with the known outcome of its match.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PredictionWithResult {
    pub id: i64,
    pub card_id: i64,
    pub match_id: i64,
    pub pick: Pick,
    pub double_pick: Option<Pick>,
    pub result: Option<Pick>,
}

/// The public name of a card: the owner's username glued to the card
/// ordinal ("maria2").
pub fn card_display_name(username: &str, card_number: i32) -> String {
    format!("{}{}", username, card_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_concatenates_username_and_ordinal() {
        assert_eq!(card_display_name("maria", 2), "maria2");
        let card = PaidCard {
            card_id: 1,
            user_id: 1,
            username: "jose".to_string(),
            email: None,
            card_number: 1,
            points: 0,
        };
        assert_eq!(card.display_name(), "jose1");
    }

    #[test]
    fn test_pick_wire_values() {
        assert_eq!(Pick::Home as i32, 1);
        assert_eq!(Pick::Draw as i32, 2);
        assert_eq!(Pick::Away as i32, 3);
    }
}
