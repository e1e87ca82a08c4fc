use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::closing::resolve_closing;
use crate::config::Config;
use crate::db;
use crate::errors::Result;
use crate::mailer::{reminder_email, Mailer};
use crate::models::Round;

/// The reminder fires when roughly two hours remain. The five-minute
/// slack keeps a cron schedule from emailing the same round twice.
pub fn within_reminder_window(remaining: Duration) -> bool {
    remaining >= Duration::minutes(115) && remaining <= Duration::minutes(125)
}

/// Rounds whose deadline currently falls inside the reminder window,
/// paired with that deadline. Rounds without a resolvable deadline never
/// qualify.
pub fn due_rounds(
    rounds: Vec<Round>,
    offset: Duration,
    now: DateTime<Utc>,
) -> Vec<(Round, DateTime<Utc>)> {
    rounds
        .into_iter()
        .filter_map(|round| resolve_closing(&round, offset).map(|deadline| (round, deadline)))
        .filter(|(_, deadline)| within_reminder_window(*deadline - now))
        .collect()
}

/// One pass over every round: for each round whose deadline is about two
/// hours away, email every active user with an address. Intended to run
/// from cron via the `send-reminders` subcommand. Returns the number of
/// reminder emails sent.
pub async fn send_closing_reminders(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<usize> {
    let offset = config.rules.closing_offset();
    let due = due_rounds(db::all_rounds(pool).await?, offset, now);
    if due.is_empty() {
        info!("No rounds in the reminder window");
        return Ok(0);
    }

    let users = db::active_users_with_email(pool).await?;
    let mut sent = 0;

    for (round, deadline) in &due {
        for user in &users {
            let Some(email) = user.email.clone() else {
                continue;
            };
            let (subject, body) = reminder_email(&user.username, round.number, deadline);
            match mailer.send(&subject, &body, &[email.clone()], None).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("Reminder to {} failed: {}", email, e),
            }
        }
    }

    info!("Sent {} closing reminder(s)", sent);
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_edges() {
        assert!(within_reminder_window(Duration::minutes(120)));
        assert!(within_reminder_window(Duration::minutes(115)));
        assert!(within_reminder_window(Duration::minutes(125)));
        assert!(!within_reminder_window(Duration::minutes(114)));
        assert!(!within_reminder_window(Duration::minutes(126)));
        assert!(!within_reminder_window(Duration::minutes(-10)));
    }

    fn round(number: i32, closes_at: Option<DateTime<Utc>>) -> Round {
        Round {
            id: number as i64,
            number,
            description: None,
            starts_at: None,
            closes_at,
            pool_sent: false,
            pool_total: None,
        }
    }

    #[test]
    fn test_due_rounds_keeps_only_windowed_deadlines() {
        let now = Utc.with_ymd_and_hms(2026, 4, 5, 12, 0, 0).unwrap();
        let offset = Duration::hours(2);
        let rounds = vec![
            round(1, Some(now + Duration::minutes(120))),
            round(2, Some(now + Duration::minutes(300))),
            round(3, Some(now - Duration::minutes(5))),
            round(4, None),
        ];

        let due = due_rounds(rounds, offset, now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0.number, 1);
        assert_eq!(due[0].1, now + Duration::minutes(120));
    }

    #[test]
    fn test_due_rounds_derives_deadline_from_start_time() {
        let now = Utc.with_ymd_and_hms(2026, 4, 5, 12, 0, 0).unwrap();
        let offset = Duration::hours(2);
        // kickoff in 4h, so the derived deadline is 2h away
        let mut r = round(1, None);
        r.starts_at = Some(now + Duration::hours(4));

        let due = due_rounds(vec![r], offset, now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].1, now + Duration::hours(2));
    }
}
