//! Typed public market data

use serde::Deserialize;
use serde_json::Value;

use crate::helpers::{de_f64, de_opt_f64, value_to_f64};

/// Last traded price and 24h stats for one symbol
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    /// Last traded price
    #[serde(rename = "lastPrice", alias = "price", deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(
        default,
        rename = "price24hPcnt",
        alias = "priceChangePercent",
        deserialize_with = "de_opt_f64"
    )]
    pub change_24h_percent: Option<f64>,
    #[serde(
        default,
        rename = "volume24h",
        alias = "volume",
        deserialize_with = "de_opt_f64"
    )]
    pub volume_24h: Option<f64>,
    #[serde(default, rename = "highPrice24h", deserialize_with = "de_opt_f64")]
    pub high_24h: Option<f64>,
    #[serde(default, rename = "lowPrice24h", deserialize_with = "de_opt_f64")]
    pub low_24h: Option<f64>,
}

/// One price level of the book. Arrives as `["price", "size"]` or
/// `{"price": .., "size": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawLevel")]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Pair(Value, Value),
    Object { price: Value, size: Value },
}

impl TryFrom<RawLevel> for BookLevel {
    type Error = String;

    fn try_from(raw: RawLevel) -> Result<Self, Self::Error> {
        let (price, size) = match raw {
            RawLevel::Pair(p, s) => (p, s),
            RawLevel::Object { price, size } => (price, size),
        };
        match (value_to_f64(&price), value_to_f64(&size)) {
            (Some(price), Some(size)) => Ok(BookLevel { price, size }),
            _ => Err(format!("invalid book level [{price}, {size}]")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderBook {
    #[serde(default, alias = "s")]
    pub symbol: String,
    /// Best (highest) bid first
    #[serde(default, alias = "b")]
    pub bids: Vec<BookLevel>,
    /// Best (lowest) ask first
    #[serde(default, alias = "a")]
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Sort both sides best-first and cut them to `depth` levels
    pub(crate) fn normalize(&mut self, depth: usize) {
        self.bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<f64> {
        Some((self.best_ask()? + self.best_bid()?) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_quote_from_ticker() {
        let quote: PriceQuote = serde_json::from_value(json!({
            "symbol": "BTCUSDT",
            "lastPrice": "64000.5",
            "price24hPcnt": "0.012",
            "volume24h": "1520.3",
            "highPrice24h": "65000",
            "lowPrice24h": "63000",
            "fundingRate": "0.0001"
        }))
        .unwrap();

        assert_eq!(quote.symbol, "BTCUSDT");
        assert_eq!(quote.price, 64000.5);
        assert_eq!(quote.change_24h_percent, Some(0.012));
        assert_eq!(quote.volume_24h, Some(1520.3));
        assert_eq!(quote.high_24h, Some(65000.0));
        assert_eq!(quote.low_24h, Some(63000.0));
    }

    #[test]
    fn test_order_book_shapes() {
        let compact: OrderBook = serde_json::from_value(json!({
            "s": "BTCUSDT",
            "b": [["99.5", "2"], ["100", "1"]],
            "a": [["101", "3"], ["100.5", "0.5"]]
        }))
        .unwrap();
        assert_eq!(compact.symbol, "BTCUSDT");
        assert_eq!(compact.bids.len(), 2);

        let verbose: OrderBook = serde_json::from_value(json!({
            "bids": [{"price": 100, "size": "1"}],
            "asks": [{"price": "100.5", "size": 0.5}]
        }))
        .unwrap();
        assert_eq!(verbose.best_bid(), Some(100.0));
        assert_eq!(verbose.best_ask(), Some(100.5));
        assert_eq!(verbose.spread(), Some(0.5));
        assert_eq!(verbose.mid_price(), Some(100.25));

        assert!(serde_json::from_value::<OrderBook>(json!({"b": [["x", "1"]]})).is_err());
    }

    #[test]
    fn test_normalize_orders_best_first() {
        let mut book: OrderBook = serde_json::from_value(json!({
            "b": [["99", "1"], ["100", "1"], ["98", "1"]],
            "a": [["103", "1"], ["101", "1"], ["102", "1"]]
        }))
        .unwrap();
        book.normalize(2);

        assert_eq!(book.bids.iter().map(|l| l.price).collect::<Vec<_>>(), vec![100.0, 99.0]);
        assert_eq!(book.asks.iter().map(|l| l.price).collect::<Vec<_>>(), vec![101.0, 102.0]);
        assert_eq!(book.spread(), Some(1.0));
    }

    #[test]
    fn test_empty_book_has_no_spread() {
        let book: OrderBook = serde_json::from_value(json!({})).unwrap();
        assert_eq!(book.spread(), None);
        assert_eq!(book.best_bid(), None);
    }
}
