//! Grid bot configuration

use serde::{Deserialize, Serialize};

use crate::helpers::round_to_decimals;
use crate::orders::OrderSide;

use super::errors::{GridError, GridResult};

/// Grid bot configuration
///
/// The ladder is symmetric around the reference price: `levels` buys below
/// and `levels` sells above, each `spacing_percent` further out than the last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Market symbol (e.g. "BTC-USDT")
    pub symbol: String,

    /// Orders per side
    pub levels: u32,

    /// Distance between levels, in percent of the reference price
    pub spacing_percent: f64,

    /// Base-asset size of every grid order
    pub order_size: f64,

    /// Round computed prices to this many decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_decimals: Option<u32>,

    /// Round order sizes to this many decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_decimals: Option<u32>,
}

impl GridConfig {
    pub fn new(symbol: impl Into<String>, levels: u32, spacing_percent: f64, order_size: f64) -> Self {
        Self {
            symbol: symbol.into(),
            levels,
            spacing_percent,
            order_size,
            price_decimals: None,
            size_decimals: None,
        }
    }

    /// Builder: round prices to `decimals`
    pub fn with_price_decimals(mut self, decimals: u32) -> Self {
        self.price_decimals = Some(decimals);
        self
    }

    /// Builder: round sizes to `decimals`
    pub fn with_size_decimals(mut self, decimals: u32) -> Self {
        self.size_decimals = Some(decimals);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> GridResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(GridError::InvalidConfig("symbol cannot be empty".into()));
        }

        if self.levels == 0 {
            return Err(GridError::InvalidConfig("levels must be at least 1".into()));
        }

        if !self.spacing_percent.is_finite() || self.spacing_percent <= 0.0 {
            return Err(GridError::InvalidConfig(
                "spacing_percent must be positive".into(),
            ));
        }

        if !self.order_size.is_finite() || self.order_size <= 0.0 {
            return Err(GridError::InvalidConfig("order_size must be positive".into()));
        }

        // The deepest buy sits at p * (1 - spacing * levels / 100)
        if self.spacing_percent * self.levels as f64 >= 100.0 {
            return Err(GridError::InvalidConfig(format!(
                "spacing_percent * levels must stay below 100 (got {} * {})",
                self.spacing_percent, self.levels
            )));
        }

        if let Some(size) = self.size_decimals {
            if self.round_size(self.order_size) <= 0.0 {
                return Err(GridError::InvalidConfig(format!(
                    "order_size {} rounds to zero at {} decimals",
                    self.order_size, size
                )));
            }
        }

        Ok(())
    }

    fn spacing(&self) -> f64 {
        self.spacing_percent / 100.0
    }

    /// Price of buy level `index` (1-based) below `reference`
    pub fn buy_price(&self, reference: f64, index: u32) -> f64 {
        self.round_price(reference * (1.0 - self.spacing() * index as f64))
    }

    /// Price of sell level `index` (1-based) above `reference`
    pub fn sell_price(&self, reference: f64, index: u32) -> f64 {
        self.round_price(reference * (1.0 + self.spacing() * index as f64))
    }

    /// Side and price of the order that replaces a fill of `filled_side` at
    /// `filled_price`: one spacing step away, on the other side.
    pub fn replacement(&self, filled_side: OrderSide, filled_price: f64) -> (OrderSide, f64) {
        match filled_side {
            OrderSide::Buy => (OrderSide::Sell, self.round_price(filled_price * (1.0 + self.spacing()))),
            OrderSide::Sell => (OrderSide::Buy, self.round_price(filled_price * (1.0 - self.spacing()))),
        }
    }

    pub fn round_price(&self, price: f64) -> f64 {
        match self.price_decimals {
            Some(decimals) => round_to_decimals(price, decimals),
            None => price,
        }
    }

    pub fn round_size(&self, size: f64) -> f64 {
        match self.size_decimals {
            Some(decimals) => round_to_decimals(size, decimals),
            None => size,
        }
    }

    /// Size sent with every order, after rounding
    pub fn effective_order_size(&self) -> f64 {
        self.round_size(self.order_size)
    }

    /// Load config from JSON file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> GridResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
