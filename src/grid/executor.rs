//! Exchange abstraction for grid trading - enables mocking for tests

use std::sync::Arc;

use async_trait::async_trait;

use crate::account::Account;
use crate::client::ApexClient;
use crate::market::MarketData;
use crate::orders::{LimitOrderOptions, Order, OrderGateway};

use super::errors::GridResult;
use super::types::OrderSide;

/// The exchange operations the grid needs
#[async_trait]
pub trait GridExchange: Send + Sync {
    /// Current reference price for `symbol`
    async fn get_price(&self, symbol: &str) -> GridResult<f64>;

    /// Place a GTC limit order
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
        price: f64,
    ) -> GridResult<Order>;

    /// Bulk cancel every open order for `symbol`
    async fn cancel_all_orders(&self, symbol: &str) -> GridResult<u32>;

    /// Open orders for `symbol`
    async fn list_open_orders(&self, symbol: &str) -> GridResult<Vec<Order>>;

    /// Free balance, for status reporting
    async fn available_balance(&self) -> GridResult<f64>;
}

// ============================================================================
// Apex Omni Implementation
// ============================================================================

pub struct ApexExchange {
    market: MarketData,
    orders: OrderGateway,
    account: Account,
}

impl ApexExchange {
    pub fn new(client: Arc<ApexClient>) -> Self {
        Self {
            market: MarketData::new(client.clone()),
            orders: OrderGateway::new(client.clone()),
            account: Account::new(client),
        }
    }
}

#[async_trait]
impl GridExchange for ApexExchange {
    async fn get_price(&self, symbol: &str) -> GridResult<f64> {
        Ok(self.market.get_price(symbol).await?.price)
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
        price: f64,
    ) -> GridResult<Order> {
        Ok(self
            .orders
            .place_limit_order(symbol, side, size, price, LimitOrderOptions::default())
            .await?)
    }

    async fn cancel_all_orders(&self, symbol: &str) -> GridResult<u32> {
        Ok(self.orders.cancel_all_orders(Some(symbol)).await?.cancelled_count)
    }

    async fn list_open_orders(&self, symbol: &str) -> GridResult<Vec<Order>> {
        let orders = self.orders.list_open_orders().await?;
        // Orders without a symbol can't be attributed; keep them so they are
        // not mistaken for fills
        Ok(orders
            .into_iter()
            .filter(|o| o.symbol.is_empty() || o.symbol == symbol)
            .collect())
    }

    async fn available_balance(&self) -> GridResult<f64> {
        Ok(self.account.get_balance().await?.available)
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use std::time::Duration;

    use tokio::sync::Mutex;

    use crate::grid::errors::GridError;

    fn mock_failure(what: &str) -> GridError {
        GridError::Request(crate::Error::Transport(format!("mock {} failure", what)))
    }

    /// In-memory exchange. Placed orders rest until [`MockExchange::fill`]
    /// removes them or a bulk cancel clears them.
    pub struct MockExchange {
        price: Mutex<f64>,
        open: Mutex<BTreeMap<String, Order>>,
        placed: Mutex<Vec<Order>>,
        failing_placements: Mutex<HashSet<u32>>,
        fail_price: Mutex<bool>,
        fail_cancel: Mutex<bool>,
        fail_list: Mutex<bool>,
        available: Mutex<f64>,
        latency: Mutex<Duration>,
        next_oid: AtomicU64,
        place_calls: AtomicU32,
        cancel_all_calls: AtomicU32,
        list_calls: AtomicU32,
        balance_calls: AtomicU32,
    }

    impl MockExchange {
        pub fn new(price: f64) -> Self {
            Self {
                price: Mutex::new(price),
                open: Mutex::new(BTreeMap::new()),
                placed: Mutex::new(Vec::new()),
                failing_placements: Mutex::new(HashSet::new()),
                fail_price: Mutex::new(false),
                fail_cancel: Mutex::new(false),
                fail_list: Mutex::new(false),
                available: Mutex::new(1000.0),
                latency: Mutex::new(Duration::ZERO),
                next_oid: AtomicU64::new(1),
                place_calls: AtomicU32::new(0),
                cancel_all_calls: AtomicU32::new(0),
                list_calls: AtomicU32::new(0),
                balance_calls: AtomicU32::new(0),
            }
        }

        pub async fn set_price(&self, price: f64) {
            *self.price.lock().await = price;
        }

        /// Fail the `n`th placement call (0-based, counted over the mock's lifetime)
        pub async fn fail_placement(&self, n: u32) {
            self.failing_placements.lock().await.insert(n);
        }

        pub async fn set_fail_price(&self, fail: bool) {
            *self.fail_price.lock().await = fail;
        }

        pub async fn set_fail_cancel(&self, fail: bool) {
            *self.fail_cancel.lock().await = fail;
        }

        pub async fn set_fail_list(&self, fail: bool) {
            *self.fail_list.lock().await = fail;
        }

        pub async fn set_available_balance(&self, available: f64) {
            *self.available.lock().await = available;
        }

        /// Delay every placement by `latency`
        pub async fn set_latency(&self, latency: Duration) {
            *self.latency.lock().await = latency;
        }

        /// Seed an order that was open before the bot started
        pub async fn add_open_order(&self, order: Order) {
            self.open.lock().await.insert(order.order_id.clone(), order);
        }

        /// Simulate a fill: the order disappears from the open set
        pub async fn fill(&self, order_id: &str) -> Option<Order> {
            self.open.lock().await.remove(order_id)
        }

        pub async fn open_orders(&self) -> Vec<Order> {
            self.open.lock().await.values().cloned().collect()
        }

        /// Every successful placement, in order
        pub async fn placed_orders(&self) -> Vec<Order> {
            self.placed.lock().await.clone()
        }

        pub fn place_calls(&self) -> u32 {
            self.place_calls.load(Ordering::SeqCst)
        }

        pub fn cancel_all_calls(&self) -> u32 {
            self.cancel_all_calls.load(Ordering::SeqCst)
        }

        pub fn list_calls(&self) -> u32 {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn balance_calls(&self) -> u32 {
            self.balance_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GridExchange for MockExchange {
        async fn get_price(&self, _symbol: &str) -> GridResult<f64> {
            if *self.fail_price.lock().await {
                return Err(mock_failure("price"));
            }
            Ok(*self.price.lock().await)
        }

        async fn place_limit_order(
            &self,
            symbol: &str,
            side: OrderSide,
            size: f64,
            price: f64,
        ) -> GridResult<Order> {
            let call = self.place_calls.fetch_add(1, Ordering::SeqCst);
            let latency = *self.latency.lock().await;
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if self.failing_placements.lock().await.contains(&call) {
                return Err(mock_failure("placement"));
            }

            let oid = self.next_oid.fetch_add(1, Ordering::SeqCst);
            let order = Order {
                order_id: oid.to_string(),
                client_order_id: None,
                symbol: symbol.to_string(),
                side,
                size,
                price,
                status: Some("OPEN".into()),
                filled_size: None,
            };
            self.open.lock().await.insert(order.order_id.clone(), order.clone());
            self.placed.lock().await.push(order.clone());
            Ok(order)
        }

        async fn cancel_all_orders(&self, symbol: &str) -> GridResult<u32> {
            self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_cancel.lock().await {
                return Err(mock_failure("cancel"));
            }
            let mut open = self.open.lock().await;
            let before = open.len();
            open.retain(|_, o| o.symbol != symbol);
            Ok((before - open.len()) as u32)
        }

        async fn list_open_orders(&self, symbol: &str) -> GridResult<Vec<Order>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_list.lock().await {
                return Err(mock_failure("open orders"));
            }
            Ok(self
                .open
                .lock()
                .await
                .values()
                .filter(|o| o.symbol == symbol)
                .cloned()
                .collect())
        }

        async fn available_balance(&self) -> GridResult<f64> {
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            Ok(*self.available.lock().await)
        }
    }
}
