//! Read-only market data accessors
//!
//! Every call hits the exchange; nothing is cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::client::ApexClient;
use crate::helpers::{decode, unwrap_data, value_to_f64};
use crate::prelude::*;

use super::types::{OrderBook, PriceQuote};
use super::watch::PriceWatch;

#[derive(Clone)]
pub struct MarketData {
    client: Arc<ApexClient>,
}

impl MarketData {
    pub fn new(client: Arc<ApexClient>) -> Self {
        Self { client }
    }

    /// Exchange server time in milliseconds
    pub async fn get_server_time(&self) -> Result<u64> {
        let value = unwrap_data(self.client.get_time().await?);
        let time = match &value {
            Value::Object(map) => map.get("time").and_then(value_to_f64),
            other => value_to_f64(other),
        };
        time.map(|t| t as u64)
            .ok_or_else(|| Error::JsonParse(format!("no server time in {value}")))
    }

    pub async fn get_price(&self, symbol: &str) -> Result<PriceQuote> {
        if symbol.trim().is_empty() {
            return Err(Error::Validation("symbol cannot be empty".into()));
        }

        let tickers = match unwrap_data(self.client.get_ticker(Some(symbol)).await?) {
            Value::Array(list) => list,
            Value::Null => Vec::new(),
            single => vec![single],
        };

        let mut quotes = tickers
            .into_iter()
            .map(serde_json::from_value::<PriceQuote>)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if quotes.is_empty() {
            return Err(Error::Validation(format!("no ticker returned for {}", symbol)));
        }
        // A symbol filter should return one entry; prefer the exact match if not
        let index = quotes.iter().position(|q| q.symbol == symbol).unwrap_or(0);
        let quote = quotes.swap_remove(index);

        if !quote.price.is_finite() || quote.price <= 0.0 {
            return Err(Error::Validation(format!(
                "ticker for {} has no usable price: {}",
                symbol, quote.price
            )));
        }
        Ok(quote)
    }

    pub async fn get_order_book(&self, symbol: &str, depth: u32) -> Result<OrderBook> {
        if symbol.trim().is_empty() {
            return Err(Error::Validation("symbol cannot be empty".into()));
        }
        if depth == 0 {
            return Err(Error::Validation("depth must be at least 1".into()));
        }

        let mut book: OrderBook = decode(self.client.get_depth(symbol, depth).await?)?;
        if book.symbol.is_empty() {
            book.symbol = symbol.to_string();
        }
        book.normalize(depth as usize);
        Ok(book)
    }

    /// Latest quote for every listed symbol, keyed by symbol
    pub async fn get_all_prices(&self) -> Result<HashMap<String, PriceQuote>> {
        let tickers = match unwrap_data(self.client.get_ticker(None).await?) {
            Value::Array(list) => list,
            Value::Null => Vec::new(),
            other => {
                return Err(Error::JsonParse(format!(
                    "expected a ticker list, got {other}"
                )))
            }
        };

        let mut prices = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            match serde_json::from_value::<PriceQuote>(ticker) {
                Ok(quote) => {
                    prices.insert(quote.symbol.clone(), quote);
                }
                // Unlisted or pre-launch symbols may carry an empty last price
                Err(e) => debug!("Skipping unparseable ticker: {}", e),
            }
        }
        Ok(prices)
    }

    /// How much of `symbol` `quote_amount` buys at the current price
    pub async fn calculate_position_size(&self, symbol: &str, quote_amount: f64) -> Result<f64> {
        if !quote_amount.is_finite() || quote_amount <= 0.0 {
            return Err(Error::Validation(format!(
                "quote amount must be positive, got {}",
                quote_amount
            )));
        }
        let quote = self.get_price(symbol).await?;
        Ok(quote_amount / quote.price)
    }

    /// Poll `get_price` every `every` on a background task, first fetch
    /// immediately. Must be called inside a tokio runtime.
    pub fn watch_price(&self, symbol: &str, every: Duration) -> Result<PriceWatch> {
        if symbol.trim().is_empty() {
            return Err(Error::Validation("symbol cannot be empty".into()));
        }
        if every.is_zero() {
            return Err(Error::Validation("watch interval must be non-zero".into()));
        }
        Ok(PriceWatch::spawn(self.clone(), symbol.to_string(), every))
    }
}
