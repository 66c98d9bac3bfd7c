//! Grid Trading Module for Apex Omni
//!
//! A symmetric limit-order ladder around the current price. Fills are not
//! streamed; the bot polls the open orders and treats every tracked order
//! that disappeared as filled, replacing it with an opposite-side order one
//! spacing step away.
//!
//! # Architecture
//!
//! - [`config`] - Grid configuration and validation
//! - [`types`] - Run state, tracked orders, cycle reports
//! - [`errors`] - Grid-specific error types
//! - [`executor`] - Exchange abstraction (mockable for testing)
//! - [`manager`] - The state machine: start, poll, stop
//! - [`runner`] - Interval loop with cooperative shutdown
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use apex_omni_sdk::grid::{ApexExchange, GridConfig, GridRunner, RunnerConfig};
//!
//! // 3 buys and 3 sells, 0.5% apart
//! let config = GridConfig::new("BTC-USDT", 3, 0.5, 0.0001);
//! let exchange = Arc::new(ApexExchange::new(client));
//!
//! let mut runner = GridRunner::new(config, exchange, RunnerConfig::default())?;
//! let summary = runner.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```
//!
//! # Testing
//!
//! [`executor::mock::MockExchange`] keeps orders in memory; call
//! `fill(order_id)` to make one disappear from the open set.

pub mod config;
pub mod errors;
pub mod executor;
pub mod manager;
pub mod runner;
pub mod types;

// Re-export commonly used types
pub use config::GridConfig;
pub use errors::{GridError, GridResult};
pub use executor::{ApexExchange, GridExchange};
pub use manager::GridStateMachine;
pub use runner::{GridRunner, RunSummary, RunnerConfig};
pub use types::{BotRunState, OrderRole, OrderSide, PollReport, StartReport, TrackedOrder};
