//! Weekly draw calendar.
//!
//! Round 1 was drawn on Saturday 2002-12-07 at 20:35 KST and one draw has
//! been held every week since. Results usually appear a few minutes after the
//! draw time, so [`is_published`] is a lower bound, not a promise.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::domain::DrawNo;

/// 2002-12-07T20:35:00+09:00.
pub const FIRST_DRAW_TIMESTAMP: i64 = 1_039_260_900;

/// Upper bound on rounds probed by a single catch-up run.
pub const MAX_CATCH_UP_ROUNDS: u32 = 52;

pub fn first_draw_time() -> DateTime<Utc> {
    DateTime::from_timestamp(FIRST_DRAW_TIMESTAMP, 0).unwrap_or_default()
}

pub fn draw_time(round: DrawNo) -> Option<DateTime<Utc>> {
    let weeks = TimeDelta::try_weeks(i64::from(round.get()) - 1)?;
    first_draw_time().checked_add_signed(weeks)
}

/// Calendar date of `round` in Korea. The draw is at 11:35 UTC, so the UTC
/// date is the same day.
pub fn draw_date(round: DrawNo) -> Option<NaiveDate> {
    draw_time(round).map(|time| time.date_naive())
}

pub fn is_published(round: DrawNo, now: DateTime<Utc>) -> bool {
    draw_time(round).is_some_and(|time| now >= time)
}

/// Latest round whose draw time has passed at `now`; 0 before the first draw.
pub fn expected_latest_round(now: DateTime<Utc>) -> u32 {
    let first = first_draw_time();
    if now < first {
        return 0;
    }
    let weeks = (now - first).num_weeks();
    u32::try_from(weeks)
        .map(|weeks| weeks.saturating_add(1))
        .unwrap_or(u32::MAX)
}

/// How many rounds past `latest_known` should be out by `now`, capped.
pub fn overdue_rounds(latest_known: u32, now: DateTime<Utc>) -> u32 {
    expected_latest_round(now)
        .saturating_sub(latest_known)
        .min(MAX_CATCH_UP_ROUNDS)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn round(value: u32) -> DrawNo {
        DrawNo::new(value).unwrap()
    }

    #[test]
    fn first_round_date() {
        assert_eq!(draw_date(round(1)), NaiveDate::from_ymd_opt(2002, 12, 7));
    }

    #[test]
    fn known_round_date() {
        assert_eq!(draw_date(round(1101)), NaiveDate::from_ymd_opt(2024, 1, 6));
    }

    #[test]
    fn expected_round_before_and_after_draw_time() {
        let before = Utc.with_ymd_and_hms(2024, 1, 6, 11, 34, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 6, 11, 35, 0).unwrap();
        assert_eq!(expected_latest_round(before), 1100);
        assert_eq!(expected_latest_round(after), 1101);
        assert!(!is_published(round(1101), before));
        assert!(is_published(round(1101), after));
    }

    #[test]
    fn nothing_before_first_draw() {
        let early = Utc.with_ymd_and_hms(2002, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expected_latest_round(early), 0);
        assert_eq!(overdue_rounds(0, early), 0);
    }

    #[test]
    fn overdue_is_capped() {
        let now = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();
        assert_eq!(overdue_rounds(1100, now), 1);
        assert_eq!(overdue_rounds(1101, now), 0);
        assert_eq!(overdue_rounds(1200, now), 0);
        assert_eq!(overdue_rounds(0, now), MAX_CATCH_UP_ROUNDS);
    }
}
