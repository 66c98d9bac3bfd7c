//! Core data types for grid trading

use serde::{Deserialize, Serialize};

pub use crate::orders::OrderSide;

/// Lifecycle of a grid bot. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotRunState {
    /// Created, nothing placed yet
    Idle,
    /// Grid is live and being polled
    Running,
    /// Cancelling orders
    Stopping,
    /// Fully stopped
    Stopped,
}

impl BotRunState {
    /// Check if the bot is in an active trading state
    pub fn is_active(&self) -> bool {
        matches!(self, BotRunState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BotRunState::Idle => "idle",
            BotRunState::Running => "running",
            BotRunState::Stopping => "stopping",
            BotRunState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for BotRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an order was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRole {
    /// Initial buy below the reference price
    GridBuy,
    /// Initial sell above the reference price
    GridSell,
    /// Opposite-side order placed after a fill
    GridReplace,
}

/// An order the bot placed and is still watching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub price: f64,
    pub role: OrderRole,
}

/// Outcome of starting the grid
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StartReport {
    pub reference_price: f64,
    /// Orders removed by the startup cleanup
    pub cancelled: u32,
    pub placed: u32,
    pub failed: u32,
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    /// Tracked orders no longer open
    pub fills: u32,
    pub replacements_placed: u32,
    pub replacements_failed: u32,
    /// Tracked orders after the cycle
    pub tracked: usize,
    /// Orders the exchange listed as open for the symbol
    pub open_orders: usize,
}
