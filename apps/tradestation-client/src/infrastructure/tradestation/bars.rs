//! Bar chart response parsing.
//!
//! Accepts either `{"Bars": [...]}` or a bare bar object. Any bad element
//! fails the whole response.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::domain::Bar;
use crate::domain::lenient::parse_utc_timestamp;
use crate::error::ClientError;

/// Parse a bar chart response, tagging each bar with `symbol` unless it is empty.
pub fn parse_bars(raw: &Value, symbol: &str) -> Result<Vec<Bar>, ClientError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ClientError::data_format("bar response is not a JSON object"))?;

    match object.get("Bars") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| ClientError::data_format("bar element is not a JSON object"))
                    .and_then(|bar| parse_bar(bar, symbol))
            })
            .collect(),
        Some(other) => Err(ClientError::data_format(format!(
            "Bars must be an array, got {}",
            type_name(other)
        ))),
        None => parse_bar(object, symbol).map(|bar| vec![bar]),
    }
}

/// Parse one bar object.
pub fn parse_bar(fields: &Map<String, Value>, symbol: &str) -> Result<Bar, ClientError> {
    let timestamp = parse_timestamp(require(fields, "TimeStamp")?)?;
    Ok(Bar {
        timestamp,
        date: timestamp.date_naive(),
        open: decimal_field(fields, "Open")?,
        high: decimal_field(fields, "High")?,
        low: decimal_field(fields, "Low")?,
        close: decimal_field(fields, "Close")?,
        volume: volume_field(fields, "TotalVolume")?,
        symbol: (!symbol.is_empty()).then(|| symbol.to_string()),
    })
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS` one as UTC.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, ClientError> {
    let text = value
        .as_str()
        .ok_or_else(|| ClientError::data_format("TimeStamp must be a string"))?;
    parse_utc_timestamp(text)
        .ok_or_else(|| ClientError::data_format(format!("invalid TimeStamp: {:?}", text.trim())))
}

fn require<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a Value, ClientError> {
    fields
        .get(key)
        .ok_or_else(|| ClientError::data_format(format!("missing field {key}")))
}

fn decimal_field(fields: &Map<String, Value>, key: &str) -> Result<Decimal, ClientError> {
    let parsed = match require(fields, key)? {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ClientError::data_format(format!("{key} is not a decimal")))
}

fn volume_field(fields: &Map<String, Value>, key: &str) -> Result<u64, ClientError> {
    let parsed = match require(fields, key)? {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.ok_or_else(|| ClientError::data_format(format!("{key} is not a non-negative integer")))
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn bar_json(ts: &str) -> Value {
        json!({
            "TimeStamp": ts,
            "Open": "187.15",
            "High": "187.60",
            "Low": "186.90",
            "Close": "187.42",
            "TotalVolume": "1045200"
        })
    }

    #[test]
    fn parses_bars_array() {
        let raw = json!({"Bars": [bar_json("2024-03-04T14:35:00Z"), bar_json("2024-03-04T14:40:00Z")]});
        let bars = parse_bars(&raw, "AAPL").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, dec!(187.15));
        assert_eq!(bars[0].volume, 1_045_200);
        assert_eq!(bars[1].symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn parses_bare_object() {
        let bars = parse_bars(&bar_json("2024-03-04T14:35:00Z"), "").unwrap();
        assert_eq!(bars.len(), 1);
        assert!(bars[0].symbol.is_none());
    }

    #[test]
    fn numeric_fields_may_be_numbers() {
        let raw = json!({
            "TimeStamp": "2024-03-04T14:35:00-05:00",
            "Open": 10.5, "High": 11, "Low": 10.25, "Close": "10.75", "TotalVolume": 900
        });
        let bar = &parse_bars(&raw, "X").unwrap()[0];
        assert_eq!(bar.high, dec!(11));
        assert_eq!(bar.low, dec!(10.25));
        assert_eq!(bar.timestamp.to_rfc3339(), "2024-03-04T19:35:00+00:00");
    }

    #[test]
    fn naive_timestamp_is_utc() {
        let bar = &parse_bars(&bar_json("2024-03-04T23:59:00"), "X").unwrap()[0];
        assert_eq!(bar.date.to_string(), "2024-03-04");
    }

    #[test]
    fn decimals_are_exact() {
        let mut raw = bar_json("2024-03-04T14:35:00Z");
        raw["Close"] = json!("187.4200");
        raw["Open"] = json!(0.1);
        let bar = &parse_bars(&raw, "X").unwrap()[0];
        assert_eq!(bar.close.to_string(), "187.4200");
        assert_eq!(bar.open.to_string(), "0.1");
    }

    #[test]
    fn one_bad_element_fails_whole_response() {
        let mut bad = bar_json("2024-03-04T14:40:00Z");
        bad["High"] = json!("n/a");
        let raw = json!({"Bars": [bar_json("2024-03-04T14:35:00Z"), bad]});
        assert!(matches!(parse_bars(&raw, "X"), Err(ClientError::DataFormat(_))));
    }

    #[test]
    fn missing_field_and_bad_timestamp() {
        let mut raw = bar_json("2024-03-04T14:35:00Z");
        raw.as_object_mut().unwrap().remove("TotalVolume");
        assert!(parse_bars(&raw, "X").is_err());

        assert!(parse_bars(&bar_json("yesterday"), "X").is_err());
        assert!(parse_bars(&json!({"Bars": {}}), "X").is_err());
        assert!(parse_bars(&json!([]), "X").is_err());
    }

    #[test]
    fn empty_bars_array() {
        assert!(parse_bars(&json!({"Bars": []}), "X").unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn length_and_dates_match(
            seconds in proptest::collection::vec(0i64..4_000_000_000, 0..20),
            wrap in any::<bool>(),
        ) {
            let items: Vec<Value> = seconds
                .iter()
                .map(|s| {
                    let ts = DateTime::from_timestamp(*s, 0).unwrap();
                    bar_json(&ts.to_rfc3339())
                })
                .collect();

            let (raw, expected_len) = if wrap || items.len() != 1 {
                let n = items.len();
                (json!({ "Bars": items }), n)
            } else {
                (items[0].clone(), 1)
            };

            let bars = parse_bars(&raw, "SYM").unwrap();
            prop_assert_eq!(bars.len(), expected_len);
            for bar in &bars {
                prop_assert_eq!(bar.date, bar.timestamp.date_naive());
            }
        }
    }
}
