use chrono::{Local, Months, NaiveDate, NaiveDateTime, NaiveTime};

/// Default plausibility horizon for expiry dates, in years.
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Picks the soonest candidate strictly inside `(now, now + 5 years)`.
pub fn most_likely_expiration_date(dates: &[NaiveDate]) -> Option<NaiveDate> {
    most_likely_expiration_date_at(dates, Local::now().naive_local(), DEFAULT_HORIZON_YEARS)
}

/// Picks the soonest candidate strictly inside `(now, now + horizon_years)`.
///
/// Candidates are compared at midnight, so a date equal to today is already
/// in the past. Dates outside the window are OCR artifacts and are ignored.
pub fn most_likely_expiration_date_at(
    dates: &[NaiveDate],
    now: NaiveDateTime,
    horizon_years: u32,
) -> Option<NaiveDate> {
    let horizon = now
        .checked_add_months(Months::new(horizon_years.saturating_mul(12)))
        .unwrap_or(NaiveDateTime::MAX);

    dates
        .iter()
        .copied()
        .filter(|date| {
            let at = date.and_time(NaiveTime::MIN);
            at > now && at < horizon
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn day(offset: i64) -> NaiveDate {
        now().date() + Duration::days(offset)
    }

    #[test]
    fn test_picks_nearest_future_date() {
        let dates = [day(-1), day(3), day(365 * 10)];
        assert_eq!(most_likely_expiration_date_at(&dates, now(), 5), Some(day(3)));
    }

    #[test]
    fn test_sorts_before_picking() {
        let dates = [day(40), day(2), day(10)];
        assert_eq!(most_likely_expiration_date_at(&dates, now(), 5), Some(day(2)));
    }

    #[test]
    fn test_empty_and_all_past() {
        assert_eq!(most_likely_expiration_date_at(&[], now(), 5), None);
        assert_eq!(
            most_likely_expiration_date_at(&[day(-30), day(-1), day(0)], now(), 5),
            None
        );
    }

    #[test]
    fn test_horizon_is_exclusive() {
        let limit = NaiveDate::from_ymd_opt(2031, 3, 15).unwrap();
        // Midnight of the same calendar day five years out is still inside
        assert_eq!(most_likely_expiration_date_at(&[limit], now(), 5), Some(limit));
        let beyond = NaiveDate::from_ymd_opt(2031, 3, 16).unwrap();
        assert_eq!(most_likely_expiration_date_at(&[beyond], now(), 5), None);

        let at_midnight = limit.and_time(NaiveTime::MIN) - Duration::days(5 * 365 + 1);
        assert_eq!(
            most_likely_expiration_date_at(&[limit], at_midnight, 5),
            None,
            "Exactly now + 5 years is excluded"
        );
    }

    #[test]
    fn test_tomorrow_is_plausible() {
        assert_eq!(most_likely_expiration_date_at(&[day(1)], now(), 5), Some(day(1)));
    }
}
