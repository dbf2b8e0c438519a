//! OHLCV bar.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One open/high/low/close/volume aggregation over a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bar {
    /// Bar timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Date portion of `timestamp`.
    pub date: NaiveDate,
    /// Opening price.
    pub open: Decimal,
    /// Highest price.
    pub high: Decimal,
    /// Lowest price.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Total volume.
    pub volume: u64,
    /// Symbol the bar was requested for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl Bar {
    /// Returns true if high/low bracket open and close.
    ///
    /// Upstream data is expected to satisfy this but it is not enforced.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
    }

    /// Price range (high - low).
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        Bar {
            timestamp,
            date: timestamp.date_naive(),
            open,
            high,
            low,
            close,
            volume: 1_000,
            symbol: Some("AAPL".to_string()),
        }
    }

    #[test]
    fn well_formed_bar() {
        let b = bar(dec!(100.50), dec!(101.25), dec!(99.75), dec!(100.00));
        assert!(b.is_well_formed());
        assert_eq!(b.range(), dec!(1.50));
    }

    #[test]
    fn high_below_close_is_not_well_formed() {
        let b = bar(dec!(100), dec!(100.5), dec!(99), dec!(101));
        assert!(!b.is_well_formed());
    }

    #[test]
    fn low_above_open_is_not_well_formed() {
        let b = bar(dec!(100), dec!(102), dec!(100.5), dec!(101));
        assert!(!b.is_well_formed());
    }

    #[test]
    fn serializes_pascal_case_without_empty_symbol() {
        let mut b = bar(dec!(1), dec!(2), dec!(0.5), dec!(1.5));
        b.symbol = None;
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["Open"], "1");
        assert_eq!(json["Date"], "2024-01-15");
        assert!(json.get("Symbol").is_none());
    }
}
