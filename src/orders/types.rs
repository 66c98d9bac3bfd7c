//! Order, fill and cancel types

use serde::{Deserialize, Serialize};

use crate::helpers::{de_f64, de_opt_f64, de_opt_string, de_opt_u64, de_string};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY", alias = "buy", alias = "Buy")]
    Buy,
    #[serde(rename = "SELL", alias = "sell", alias = "Sell")]
    Sell,
}

impl OrderSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Exchange side string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeInForce {
    #[default]
    GoodTilCancel,
    ImmediateOrCancel,
    FillOrKill,
    PostOnly,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GoodTilCancel => "GOOD_TIL_CANCEL",
            TimeInForce::ImmediateOrCancel => "IMMEDIATE_OR_CANCEL",
            TimeInForce::FillOrKill => "FILL_OR_KILL",
            TimeInForce::PostOnly => "POST_ONLY",
        }
    }
}

/// Optional knobs for a limit order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitOrderOptions {
    pub time_in_force: TimeInForce,
    /// Generated (UUID v4) when not set
    pub client_order_id: Option<String>,
    pub reduce_only: bool,
}

impl LimitOrderOptions {
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }
}

/// An order as reported by the exchange
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    #[serde(rename = "id", alias = "orderId", deserialize_with = "de_string")]
    pub order_id: String,
    #[serde(
        default,
        rename = "clientOrderId",
        alias = "clientId",
        deserialize_with = "de_opt_string"
    )]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub symbol: String,
    pub side: OrderSide,
    #[serde(deserialize_with = "de_f64")]
    pub size: f64,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(
        default,
        rename = "cumSuccessFillSize",
        alias = "filledSize",
        deserialize_with = "de_opt_f64"
    )]
    pub filled_size: Option<f64>,
}

/// An execution reported by the fills endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fill {
    #[serde(default, rename = "id", deserialize_with = "de_opt_string")]
    pub fill_id: Option<String>,
    #[serde(rename = "orderId", deserialize_with = "de_string")]
    pub order_id: String,
    #[serde(default)]
    pub symbol: String,
    pub side: OrderSide,
    #[serde(deserialize_with = "de_f64")]
    pub size: f64,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub fee: Option<f64>,
    /// Milliseconds since epoch
    #[serde(default, rename = "createdAt", deserialize_with = "de_opt_u64")]
    pub created_at: Option<u64>,
}

impl Fill {
    pub fn value(&self) -> f64 {
        self.size * self.price
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAck {
    pub order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelAllResult {
    pub cancelled_count: u32,
}
