#![deny(unreachable_pub)]
mod account;
mod client;
pub mod config;
mod consts;
mod credentials;
mod errors;
pub mod grid;
mod helpers;
pub mod market;
pub mod orders;
mod prelude;
pub mod req;
mod signature;
pub use account::{Account, AccountBalance, AccountSummary, Position};
pub use client::ApexClient;
pub use consts::{API_PREFIX, LOCAL_API_URL, MAINNET_API_URL, TESTNET_API_URL};
pub use credentials::Credentials;
pub use errors::Error;
pub use helpers::{float_to_string, now_millis, round_to_decimals, BaseUrl};
pub use market::{MarketData, OrderBook, PriceQuote, PriceWatch};
pub use orders::{LimitOrderOptions, Order, OrderGateway, OrderSide};
pub use req::{HttpMethod, RequestParams};
pub use signature::{canonicalize, sign, signing_params, SignedRequest};
