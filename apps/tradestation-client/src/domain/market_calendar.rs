//! US equity session calendar.
//!
//! Weekends are the only non-trading days modelled; exchange holidays are not.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
    Weekday,
};

use crate::error::ClientError;

/// Minutes in a regular session (09:30 to 16:00).
pub const REGULAR_SESSION_MINUTES: u64 = 390;

/// Largest number of bars the provider serves for one intraday request.
pub const MAX_INTRADAY_BARS: u64 = 57_600;

/// Regular session open, exchange-local.
pub const SESSION_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// Regular session close, exchange-local.
pub const SESSION_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

const EST_OFFSET_SECS: i32 = -5 * 3600;
const EDT_OFFSET_SECS: i32 = -4 * 3600;

/// Returns true for Monday through Friday.
#[must_use]
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count weekdays between `start` and `end`, inclusive of both ends.
///
/// Returns 0 when `end` precedes `start`.
#[must_use]
pub fn business_days(start: NaiveDate, end: NaiveDate) -> u64 {
    if end < start {
        return 0;
    }
    let total = (end - start).num_days() as u64 + 1;
    let full_weeks = total / 7;
    let mut count = full_weeks * 5;

    let mut day = start + Duration::days((full_weeks * 7) as i64);
    while day <= end {
        if is_business_day(day) {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

/// Bars needed to cover `start..=end` at `interval` minutes per bar.
///
/// Fails with `RangeTooLarge` if that exceeds [`MAX_INTRADAY_BARS`] and with
/// `InvalidArgument` for a zero interval.
pub fn check_intraday_capacity(
    start: NaiveDate,
    end: NaiveDate,
    interval: u32,
) -> Result<u64, ClientError> {
    if interval == 0 {
        return Err(ClientError::invalid_argument("interval must be positive"));
    }
    let minutes = business_days(start, end) * REGULAR_SESSION_MINUTES;
    let interval = u64::from(interval);
    let required = minutes.div_ceil(interval);
    if minutes > MAX_INTRADAY_BARS * interval {
        return Err(ClientError::RangeTooLarge {
            required,
            limit: MAX_INTRADAY_BARS,
        });
    }
    Ok(required)
}

/// Returns true during the regular session, Monday to Friday, both ends inclusive.
#[must_use]
pub fn is_market_open(now: DateTime<FixedOffset>) -> bool {
    let time = now.time();
    is_business_day(now.date_naive()) && time >= SESSION_OPEN && time <= SESSION_CLOSE
}

/// Session open on `date` in the given exchange offset, as UTC.
#[must_use]
pub fn session_open_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(SESSION_OPEN);
    offset
        .from_local_datetime(&local)
        .single()
        .map_or_else(|| local.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// US Eastern offset in effect at `instant`.
///
/// Daylight time runs from 02:00 local on the second Sunday of March to
/// 02:00 local on the first Sunday of November.
#[must_use]
pub fn us_eastern_offset(instant: DateTime<Utc>) -> FixedOffset {
    let year = instant.year();
    let dst_start = nth_sunday(year, 3, 2)
        .and_hms_opt(2, 0, 0)
        .map(|dt| dt.and_utc() - Duration::seconds(i64::from(EST_OFFSET_SECS)));
    let dst_end = nth_sunday(year, 11, 1)
        .and_hms_opt(2, 0, 0)
        .map(|dt| dt.and_utc() - Duration::seconds(i64::from(EDT_OFFSET_SECS)));

    let in_dst = match (dst_start, dst_end) {
        (Some(start), Some(end)) => instant >= start && instant < end,
        _ => false,
    };
    let secs = if in_dst { EDT_OFFSET_SECS } else { EST_OFFSET_SECS };
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

/// Current instant in US Eastern time.
#[must_use]
pub fn us_eastern_now() -> DateTime<FixedOffset> {
    let now = Utc::now();
    now.with_timezone(&us_eastern_offset(now))
}

fn nth_sunday(year: i32, month: u32, n: u8) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n)
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn eastern(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test_case(date(2024, 1, 15), date(2024, 1, 19), 5; "monday to friday")]
    #[test_case(date(2024, 1, 13), date(2024, 1, 14), 0; "weekend only")]
    #[test_case(date(2024, 1, 12), date(2024, 1, 15), 2; "friday to monday")]
    #[test_case(date(2024, 1, 1), date(2024, 1, 31), 23; "january 2024")]
    #[test_case(date(2024, 1, 19), date(2024, 1, 15), 0; "reversed")]
    #[test_case(date(2024, 1, 17), date(2024, 1, 17), 1; "single weekday")]
    fn counts_business_days(start: NaiveDate, end: NaiveDate, expected: u64) {
        assert_eq!(business_days(start, end), expected);
    }

    #[test]
    fn capacity_within_limit() {
        // 147 weekdays * 390 = 57_330 one-minute bars
        let start = date(2024, 1, 1);
        let end = date(2024, 7, 23);
        assert_eq!(business_days(start, end), 147);
        assert_eq!(check_intraday_capacity(start, end, 1).unwrap(), 57_330);
    }

    #[test]
    fn capacity_exceeded_at_one_minute() {
        let err = check_intraday_capacity(date(2024, 1, 1), date(2024, 12, 31), 1).unwrap_err();
        assert_eq!(
            err,
            ClientError::RangeTooLarge {
                required: 262 * 390,
                limit: MAX_INTRADAY_BARS,
            }
        );
    }

    #[test]
    fn wider_interval_fits_more_days() {
        assert!(check_intraday_capacity(date(2024, 1, 1), date(2024, 12, 31), 5).is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = check_intraday_capacity(date(2024, 1, 1), date(2024, 1, 2), 0).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test_case(eastern(2024, 7, 10, 9, 30), true; "open bell")]
    #[test_case(eastern(2024, 7, 10, 16, 0), true; "close bell")]
    #[test_case(eastern(2024, 7, 10, 9, 29), false; "pre market")]
    #[test_case(eastern(2024, 7, 10, 16, 1), false; "after hours")]
    #[test_case(eastern(2024, 7, 13, 12, 0), false; "saturday")]
    fn market_hours(now: DateTime<FixedOffset>, expected: bool) {
        assert_eq!(is_market_open(now), expected);
    }

    #[test]
    fn session_open_converts_to_utc() {
        let edt = FixedOffset::west_opt(4 * 3600).unwrap();
        let open = session_open_utc(date(2024, 7, 10), edt);
        assert_eq!(open.to_rfc3339(), "2024-07-10T13:30:00+00:00");
    }

    #[test]
    fn eastern_offset_follows_dst() {
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 15, 0, 0).unwrap();
        assert_eq!(us_eastern_offset(winter).local_minus_utc(), -5 * 3600);
        assert_eq!(us_eastern_offset(summer).local_minus_utc(), -4 * 3600);

        // 2024-03-10 02:00 EST is 07:00 UTC
        let before = Utc.with_ymd_and_hms(2024, 3, 10, 6, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(us_eastern_offset(before).local_minus_utc(), -5 * 3600);
        assert_eq!(us_eastern_offset(after).local_minus_utc(), -4 * 3600);
    }

    proptest! {
        #[test]
        fn business_days_match_naive_count(offset in 0i64..3_000, span in 0i64..400) {
            let start = date(2020, 1, 1) + Duration::days(offset);
            let end = start + Duration::days(span);
            let naive = (0..=span)
                .filter(|d| is_business_day(start + Duration::days(*d)))
                .count() as u64;
            prop_assert_eq!(business_days(start, end), naive);
        }

        #[test]
        fn business_days_never_exceed_calendar_days(offset in 0i64..3_000, span in 0i64..400) {
            let start = date(2020, 1, 1) + Duration::days(offset);
            let end = start + Duration::days(span);
            prop_assert!(business_days(start, end) <= (span + 1) as u64);
        }
    }
}
