//! Public market data
//!
//! Typed wrappers over the unauthenticated ticker, depth and time endpoints.
//! The exchange sends most numbers as strings; everything here is normalized
//! to `f64`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use apex_omni_sdk::{ApexClient, BaseUrl, market::MarketData};
//!
//! let client = Arc::new(ApexClient::public(BaseUrl::Mainnet)?);
//! let market = MarketData::new(client);
//!
//! let quote = market.get_price("BTC-USDT").await?;
//! let book = market.get_order_book("BTC-USDT", 5).await?;
//! println!("{} last={} spread={:?}", quote.symbol, quote.price, book.spread());
//!
//! let mut watch = market.watch_price("ETH-USDT", Duration::from_secs(3))?;
//! while let Some(update) = watch.recv().await {
//!     println!("ETH {}", update?.price);
//! }
//! ```

mod market_data;
mod types;
mod watch;

pub use market_data::MarketData;
pub use types::{BookLevel, OrderBook, PriceQuote};
pub use watch::PriceWatch;
