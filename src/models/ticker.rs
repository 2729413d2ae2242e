//! Market ticker models

use std::convert::TryFrom;

use crate::api::binance::{ApiError, Ticker24hResponse};

/// Parsed 24h rolling statistics for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub last_price: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub trade_count: u64,
    /// Bid/ask are shown verbatim in the packet log
    pub bid_price: String,
    pub ask_price: String,
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64, ApiError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::DeserializationError(format!("{} is not a number: '{}'", field, raw)))?;
    if !value.is_finite() {
        return Err(ApiError::DeserializationError(format!("{} is not finite: '{}'", field, raw)));
    }
    Ok(value)
}

impl TryFrom<Ticker24hResponse> for TickerSnapshot {
    type Error = ApiError;

    fn try_from(raw: Ticker24hResponse) -> Result<Self, Self::Error> {
        Ok(TickerSnapshot {
            last_price: parse_decimal("lastPrice", &raw.last_price)?,
            change_percent: parse_decimal("priceChangePercent", &raw.price_change_percent)?,
            volume: parse_decimal("volume", &raw.volume)?,
            high_price: parse_decimal("highPrice", &raw.high_price)?,
            low_price: parse_decimal("lowPrice", &raw.low_price)?,
            trade_count: raw.count,
            bid_price: raw.bid_price,
            ask_price: raw.ask_price,
            symbol: raw.symbol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "symbol": "BTCUSDT",
        "priceChange": "-94.99999800",
        "priceChangePercent": "-0.215",
        "weightedAvgPrice": "43812.11",
        "prevClosePrice": "43987.00",
        "lastPrice": "43892.01000000",
        "lastQty": "0.00100000",
        "bidPrice": "43892.00000000",
        "bidQty": "3.10000000",
        "askPrice": "43892.01000000",
        "askQty": "1.90000000",
        "openPrice": "43987.00000000",
        "highPrice": "44210.50000000",
        "lowPrice": "43501.17000000",
        "volume": "21874.55100000",
        "quoteVolume": "958374220.12",
        "openTime": 1700000000000,
        "closeTime": 1700086399999,
        "firstId": 28385,
        "lastId": 28460,
        "count": 76
    }"#;

    #[test]
    fn test_parse_fixture() {
        let raw: Ticker24hResponse = serde_json::from_str(FIXTURE).expect("fixture parses");
        let snapshot = TickerSnapshot::try_from(raw).expect("snapshot converts");

        assert_eq!(snapshot.symbol, "BTCUSDT");
        assert_eq!(snapshot.last_price, 43892.01);
        assert_eq!(snapshot.change_percent, -0.215);
        assert_eq!(snapshot.high_price, 44210.5);
        assert_eq!(snapshot.low_price, 43501.17);
        assert_eq!(snapshot.trade_count, 76);
        assert_eq!(snapshot.bid_price, "43892.00000000");
    }

    #[test]
    fn test_rejects_garbage_price() {
        let mut raw: Ticker24hResponse = serde_json::from_str(FIXTURE).expect("fixture parses");
        raw.last_price = "NaN".to_string();
        assert!(matches!(
            TickerSnapshot::try_from(raw.clone()),
            Err(ApiError::DeserializationError(_))
        ));

        raw.last_price = "abc".to_string();
        assert!(TickerSnapshot::try_from(raw).is_err());
    }
}
