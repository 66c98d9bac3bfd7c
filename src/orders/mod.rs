//! Order placement and order queries

mod gateway;
mod types;

pub use gateway::OrderGateway;
pub use types::{CancelAck, CancelAllResult, Fill, LimitOrderOptions, Order, OrderSide, TimeInForce};
