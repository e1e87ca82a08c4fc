use chrono::{DateTime, Duration, Utc};

use crate::models::Round;

/// The single authoritative deadline for a round, if one can be derived.
/// An explicit override always wins; otherwise the start time minus the
/// configured offset; a round with neither has no deadline and never
/// closes. Pure function of round state, recomputed on every call rather
/// than cached at save time.
pub fn resolve_closing(round: &Round, offset: Duration) -> Option<DateTime<Utc>> {
    round
        .closes_at
        .or_else(|| round.starts_at.map(|start| start - offset))
}

pub fn is_closed(round: &Round, now: DateTime<Utc>, offset: Duration) -> bool {
    match resolve_closing(round, offset) {
        Some(deadline) => now >= deadline,
        None => false,
    }
}

/// Time until the deadline, `None` when no deadline resolves. Negative
/// once the round has closed.
pub fn time_remaining(round: &Round, now: DateTime<Utc>, offset: Duration) -> Option<Duration> {
    resolve_closing(round, offset).map(|deadline| deadline - now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn round(starts_at: Option<DateTime<Utc>>, closes_at: Option<DateTime<Utc>>) -> Round {
        Round {
            id: 1,
            number: 1,
            description: None,
            starts_at,
            closes_at,
            pool_sent: false,
            pool_total: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_override_wins_over_start_time() {
        let r = round(Some(at(20)), Some(at(12)));
        assert_eq!(resolve_closing(&r, Duration::hours(2)), Some(at(12)));
    }

    #[test]
    fn test_derives_from_start_time_minus_offset() {
        let r = round(Some(at(20)), None);
        assert_eq!(resolve_closing(&r, Duration::hours(2)), Some(at(18)));
        assert_eq!(resolve_closing(&r, Duration::hours(1)), Some(at(19)));
    }

    #[test]
    fn test_no_deadline_never_closes() {
        let r = round(None, None);
        assert_eq!(resolve_closing(&r, Duration::hours(2)), None);
        assert!(!is_closed(&r, at(23), Duration::hours(2)));
        assert_eq!(time_remaining(&r, at(23), Duration::hours(2)), None);
    }

    #[test]
    fn test_closed_at_and_after_deadline() {
        let r = round(Some(at(20)), None);
        let offset = Duration::hours(2);
        assert!(!is_closed(&r, at(17), offset));
        // deadline itself counts as closed
        assert!(is_closed(&r, at(18), offset));
        assert!(is_closed(&r, at(19), offset));
    }

    #[test]
    fn test_time_remaining_scenario() {
        // start = now + 3h, offset 2h: one hour of submission time left
        let now = at(10);
        let r = round(Some(now + Duration::hours(3)), None);
        let remaining = time_remaining(&r, now, Duration::hours(2)).unwrap();
        assert_eq!(remaining.num_seconds(), 3600);

        // past the boundary the round reports closed
        let later = now + Duration::hours(2);
        assert!(is_closed(&r, later, Duration::hours(2)));
    }
}
