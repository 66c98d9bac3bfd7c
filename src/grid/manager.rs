//! Grid state machine
//!
//! Owns the set of orders the bot placed. `start` lays out the ladder,
//! `poll` treats every tracked order that left the open-order list as filled
//! and puts one opposite-side order one spacing step away, `stop` bulk
//! cancels. All commands take `&mut self`, so cycles can never overlap.

use std::collections::{BTreeMap, HashSet};

use log::{debug, error, info, warn};

use super::config::GridConfig;
use super::errors::{GridError, GridResult};
use super::executor::GridExchange;
use super::types::{BotRunState, OrderRole, OrderSide, PollReport, StartReport, TrackedOrder};

pub struct GridStateMachine {
    config: GridConfig,
    state: BotRunState,
    /// Keyed by exchange order id
    tracked: BTreeMap<String, TrackedOrder>,
}

impl GridStateMachine {
    /// Create an idle state machine. Fails if `config` does not validate.
    pub fn new(config: GridConfig) -> GridResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: BotRunState::Idle,
            tracked: BTreeMap::new(),
        })
    }

    pub fn state(&self) -> BotRunState {
        self.state
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Snapshot of the tracked orders, ordered by id
    pub fn tracked_orders(&self) -> Vec<TrackedOrder> {
        self.tracked.values().cloned().collect()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Lay out the grid around the current price. Only valid from `Idle`.
    ///
    /// A failed price fetch or startup cleanup leaves the machine idle. A
    /// failed level is logged and skipped.
    pub async fn start<E: GridExchange + ?Sized>(&mut self, exchange: &E) -> GridResult<StartReport> {
        if self.state != BotRunState::Idle {
            return Err(GridError::InvalidState {
                current_state: self.state.to_string(),
            });
        }

        let symbol = self.config.symbol.clone();
        let reference_price = exchange.get_price(&symbol).await?;
        if !reference_price.is_finite() || reference_price <= 0.0 {
            return Err(GridError::Request(crate::Error::Validation(format!(
                "reference price for {} is not positive: {}",
                symbol, reference_price
            ))));
        }
        info!("Starting grid on {} at reference price {}", symbol, reference_price);

        let cancelled = exchange.cancel_all_orders(&symbol).await?;
        if cancelled > 0 {
            info!("Cancelled {} leftover orders on {}", cancelled, symbol);
        }

        self.state = BotRunState::Running;

        let mut report = StartReport {
            reference_price,
            cancelled,
            ..StartReport::default()
        };

        let levels = self.config.levels;
        let buys = (1..=levels).map(|i| (OrderSide::Buy, self.config.buy_price(reference_price, i), OrderRole::GridBuy));
        let sells = (1..=levels).map(|i| (OrderSide::Sell, self.config.sell_price(reference_price, i), OrderRole::GridSell));
        let ladder: Vec<_> = buys.chain(sells).collect();

        for (side, price, role) in ladder {
            // Skip and continue: one rejected level must not abort the others
            match self.place(exchange, side, price, role).await {
                Ok(_) => report.placed += 1,
                Err(e) => {
                    warn!("Failed to place {} level at {}: {}", side, price, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Grid started: {} orders placed, {} failed",
            report.placed, report.failed
        );
        Ok(report)
    }

    /// One fill-detection cycle. Outside `Running` this does nothing.
    ///
    /// If the open-order fetch fails the error is returned and nothing is
    /// assumed filled.
    pub async fn poll<E: GridExchange + ?Sized>(&mut self, exchange: &E) -> GridResult<PollReport> {
        if self.state != BotRunState::Running {
            debug!("Poll skipped in state {}", self.state);
            return Ok(PollReport {
                tracked: self.tracked.len(),
                ..PollReport::default()
            });
        }

        let open = exchange.list_open_orders(&self.config.symbol).await?;
        let open_ids: HashSet<&str> = open.iter().map(|o| o.order_id.as_str()).collect();

        let filled_ids: Vec<String> = self
            .tracked
            .keys()
            .filter(|id| !open_ids.contains(id.as_str()))
            .cloned()
            .collect();

        let mut report = PollReport {
            open_orders: open.len(),
            ..PollReport::default()
        };
        for id in filled_ids {
            let Some(filled) = self.tracked.remove(&id) else {
                continue;
            };
            report.fills += 1;
            info!("Order {} filled: {} {} @ {}", filled.order_id, filled.side, filled.size, filled.price);

            let (side, price) = self.config.replacement(filled.side, filled.price);
            // Skip and continue: the level is dropped, never retried
            match self.place(exchange, side, price, OrderRole::GridReplace).await {
                Ok(order_id) => {
                    info!("Replaced {} with {} @ {} (id {})", filled.order_id, side, price, order_id);
                    report.replacements_placed += 1;
                }
                Err(e) => {
                    error!("Failed to replace filled order {}: {}", filled.order_id, e);
                    report.replacements_failed += 1;
                }
            }
        }

        report.tracked = self.tracked.len();
        Ok(report)
    }

    /// Cancel everything on the symbol and stop for good.
    ///
    /// Returns the number of orders the exchange cancelled. The machine ends
    /// in `Stopped` even when the cancel fails; the error is still returned.
    pub async fn stop<E: GridExchange + ?Sized>(&mut self, exchange: &E) -> GridResult<u32> {
        match self.state {
            BotRunState::Stopped => Ok(0),
            BotRunState::Idle => {
                self.state = BotRunState::Stopped;
                info!("Grid stopped before it was started");
                Ok(0)
            }
            BotRunState::Running | BotRunState::Stopping => {
                self.state = BotRunState::Stopping;
                info!("Stopping grid on {}", self.config.symbol);

                let result = exchange.cancel_all_orders(&self.config.symbol).await;
                self.state = BotRunState::Stopped;

                match result {
                    Ok(cancelled) => {
                        self.tracked.clear();
                        info!("Grid stopped, {} orders cancelled", cancelled);
                        Ok(cancelled)
                    }
                    Err(e) => {
                        // Orders may still rest on the book; keep them visible
                        error!("Failed to cancel orders on stop: {}", e);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Place one order and track it on success. Returns the new order id.
    async fn place<E: GridExchange + ?Sized>(
        &mut self,
        exchange: &E,
        side: OrderSide,
        price: f64,
        role: OrderRole,
    ) -> GridResult<String> {
        let size = self.config.effective_order_size();
        debug!("Placing {:?} {} {} @ {}", role, side, size, price);

        let order = exchange
            .place_limit_order(&self.config.symbol, side, size, price)
            .await?;

        let tracked = TrackedOrder {
            order_id: order.order_id.clone(),
            symbol: self.config.symbol.clone(),
            side,
            size,
            price,
            role,
        };
        self.tracked.insert(order.order_id.clone(), tracked);
        Ok(order.order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::executor::mock::MockExchange;
    use crate::orders::Order;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn config() -> GridConfig {
        GridConfig::new("BTC-USDT", 2, 0.5, 0.0001)
    }

    fn tracked(id: &str, side: OrderSide, price: f64) -> TrackedOrder {
        TrackedOrder {
            order_id: id.into(),
            symbol: "BTC-USDT".into(),
            side,
            size: 0.0001,
            price,
            role: OrderRole::GridBuy,
        }
    }

    fn open_order(id: &str, side: OrderSide, price: f64) -> Order {
        Order {
            order_id: id.into(),
            client_order_id: None,
            symbol: "BTC-USDT".into(),
            side,
            size: 0.0001,
            price,
            status: Some("OPEN".into()),
            filled_size: None,
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = GridStateMachine::new(GridConfig::new("BTC-USDT", 0, 0.5, 0.0001));
        assert!(matches!(result, Err(GridError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_start_lays_out_ladder() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();

        let report = machine.start(&exchange).await.unwrap();
        assert_eq!(report.placed, 4);
        assert_eq!(report.failed, 0);
        assert_eq!(machine.state(), BotRunState::Running);
        assert_eq!(exchange.cancel_all_calls(), 1);

        let placed = exchange.placed_orders().await;
        let prices: Vec<(OrderSide, f64)> = placed.iter().map(|o| (o.side, o.price)).collect();
        let expected = [
            (OrderSide::Buy, 99.5),
            (OrderSide::Buy, 99.0),
            (OrderSide::Sell, 100.5),
            (OrderSide::Sell, 101.0),
        ];
        for ((side, price), (want_side, want_price)) in prices.iter().zip(expected) {
            assert_eq!(*side, want_side);
            assert!(approx(*price, want_price));
        }
        assert!(placed.iter().all(|o| o.size == 0.0001 && o.symbol == "BTC-USDT"));

        let roles: Vec<OrderRole> = machine.tracked_orders().iter().map(|o| o.role).collect();
        assert_eq!(roles.iter().filter(|r| **r == OrderRole::GridBuy).count(), 2);
        assert_eq!(roles.iter().filter(|r| **r == OrderRole::GridSell).count(), 2);
    }

    #[tokio::test]
    async fn test_start_cancels_leftovers_first() {
        let exchange = MockExchange::new(100.0);
        exchange.add_open_order(open_order("old-1", OrderSide::Buy, 90.0)).await;
        let mut machine = GridStateMachine::new(config()).unwrap();

        let report = machine.start(&exchange).await.unwrap();
        assert_eq!(report.cancelled, 1);
        assert!(exchange.open_orders().await.iter().all(|o| o.order_id != "old-1"));
        assert_eq!(machine.tracked_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_level_does_not_stop_later_levels() {
        let exchange = MockExchange::new(100.0);
        exchange.fail_placement(0).await;
        let mut machine = GridStateMachine::new(config()).unwrap();

        let report = machine.start(&exchange).await.unwrap();
        assert_eq!(exchange.place_calls(), 4);
        assert_eq!(report.placed, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(machine.tracked_count(), 3);
        assert!(machine
            .tracked_orders()
            .iter()
            .all(|o| !(o.side == OrderSide::Buy && approx(o.price, 99.5))));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_machine_idle() {
        let exchange = MockExchange::new(100.0);
        exchange.set_fail_price(true).await;
        let mut machine = GridStateMachine::new(config()).unwrap();

        assert!(machine.start(&exchange).await.is_err());
        assert_eq!(machine.state(), BotRunState::Idle);
        assert_eq!(exchange.cancel_all_calls(), 0);

        exchange.set_fail_price(false).await;
        exchange.set_fail_cancel(true).await;
        assert!(machine.start(&exchange).await.is_err());
        assert_eq!(machine.state(), BotRunState::Idle);
        assert_eq!(machine.tracked_count(), 0);
        assert_eq!(exchange.place_calls(), 0);
    }

    #[tokio::test]
    async fn test_start_rejects_zero_price() {
        let exchange = MockExchange::new(0.0);
        let mut machine = GridStateMachine::new(config()).unwrap();

        assert!(matches!(
            machine.start(&exchange).await,
            Err(GridError::Request(crate::Error::Validation(_)))
        ));
        assert_eq!(machine.state(), BotRunState::Idle);
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.start(&exchange).await.unwrap();

        let err = machine.start(&exchange).await.unwrap_err();
        assert_eq!(
            err,
            GridError::InvalidState {
                current_state: "running".into()
            }
        );
        assert_eq!(exchange.place_calls(), 4);
    }

    #[tokio::test]
    async fn test_poll_replaces_only_vanished_orders() {
        let exchange = MockExchange::new(105.0);
        exchange.add_open_order(open_order("id2", OrderSide::Sell, 110.0)).await;

        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.state = BotRunState::Running;
        machine.tracked.insert("id1".into(), tracked("id1", OrderSide::Buy, 100.0));
        machine.tracked.insert("id2".into(), tracked("id2", OrderSide::Sell, 110.0));

        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(report.fills, 1);
        assert_eq!(report.replacements_placed, 1);
        assert_eq!(report.tracked, 2);

        let placed = exchange.placed_orders().await;
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, OrderSide::Sell);
        assert!(approx(placed[0].price, 100.5));

        let orders = machine.tracked_orders();
        assert!(orders.iter().all(|o| o.order_id != "id1"));
        let kept = orders.iter().find(|o| o.order_id == "id2").unwrap();
        assert_eq!(*kept, tracked("id2", OrderSide::Sell, 110.0));
        let replacement = orders.iter().find(|o| o.order_id == placed[0].order_id).unwrap();
        assert_eq!(replacement.role, OrderRole::GridReplace);
    }

    #[tokio::test]
    async fn test_sell_fill_replaced_with_lower_buy() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.state = BotRunState::Running;
        machine.tracked.insert("s1".into(), tracked("s1", OrderSide::Sell, 101.0));

        machine.poll(&exchange).await.unwrap();

        let placed = exchange.placed_orders().await;
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, OrderSide::Buy);
        assert!(approx(placed[0].price, 100.495));
    }

    #[tokio::test]
    async fn test_poll_fetch_failure_keeps_tracked_set() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.start(&exchange).await.unwrap();
        let before = machine.tracked_orders();

        exchange.set_fail_list(true).await;
        assert!(machine.poll(&exchange).await.is_err());
        assert_eq!(machine.tracked_orders(), before);
        assert_eq!(exchange.place_calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_replacement_drops_level() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.start(&exchange).await.unwrap();

        let first = exchange.placed_orders().await[0].order_id.clone();
        exchange.fill(&first).await;
        exchange.fail_placement(4).await;

        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(report.fills, 1);
        assert_eq!(report.replacements_failed, 1);
        assert_eq!(machine.tracked_count(), 3);

        // no retry on the next cycle
        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(
            report,
            PollReport {
                tracked: 3,
                open_orders: 3,
                ..PollReport::default()
            }
        );
        assert_eq!(exchange.place_calls(), 5);
    }

    #[tokio::test]
    async fn test_poll_is_noop_unless_running() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();

        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(report, PollReport::default());
        assert_eq!(exchange.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_issues_one_bulk_cancel() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(GridConfig::new("BTC-USDT", 5, 0.5, 0.0001)).unwrap();
        machine.start(&exchange).await.unwrap();
        assert_eq!(machine.tracked_count(), 10);

        let cancelled = machine.stop(&exchange).await.unwrap();
        assert_eq!(cancelled, 10);
        assert_eq!(machine.state(), BotRunState::Stopped);
        assert_eq!(machine.tracked_count(), 0);
        // one at start, one at stop
        assert_eq!(exchange.cancel_all_calls(), 2);

        // terminal: further commands do nothing
        assert_eq!(machine.stop(&exchange).await.unwrap(), 0);
        machine.poll(&exchange).await.unwrap();
        assert_eq!(exchange.cancel_all_calls(), 2);
        assert_eq!(exchange.list_calls(), 0);
        assert!(matches!(machine.start(&exchange).await, Err(GridError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_stop_from_idle_sends_nothing() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();

        assert_eq!(machine.stop(&exchange).await.unwrap(), 0);
        assert_eq!(machine.state(), BotRunState::Stopped);
        assert_eq!(exchange.cancel_all_calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_failure_still_stops() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.start(&exchange).await.unwrap();

        exchange.set_fail_cancel(true).await;
        assert!(machine.stop(&exchange).await.is_err());
        assert_eq!(machine.state(), BotRunState::Stopped);
        assert_eq!(exchange.cancel_all_calls(), 2);
    }

    #[tokio::test]
    async fn test_end_to_end_fill_and_replace() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.start(&exchange).await.unwrap();

        let buy = exchange
            .placed_orders()
            .await
            .into_iter()
            .find(|o| o.side == OrderSide::Buy && approx(o.price, 99.5))
            .unwrap();
        exchange.fill(&buy.order_id).await;

        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(report.fills, 1);
        assert_eq!(report.replacements_placed, 1);

        let replacement = exchange.placed_orders().await.pop().unwrap();
        assert_eq!(replacement.side, OrderSide::Sell);
        assert!(approx(replacement.price, 99.5 * 1.005));
        assert!(approx(replacement.price, 99.9975));

        let tracked = machine.tracked_orders();
        assert_eq!(tracked.len(), 4);
        assert!(tracked.iter().all(|o| o.order_id != buy.order_id));

        // nothing else moved, nothing else replaced
        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(report.fills, 0);
        assert_eq!(exchange.place_calls(), 5);
    }

    #[tokio::test]
    async fn test_replacement_fill_is_replaced_again() {
        let exchange = MockExchange::new(100.0);
        let mut machine = GridStateMachine::new(config()).unwrap();
        machine.start(&exchange).await.unwrap();

        let buy = exchange.placed_orders().await[0].clone();
        exchange.fill(&buy.order_id).await;
        machine.poll(&exchange).await.unwrap();

        let sell = exchange.placed_orders().await.pop().unwrap();
        assert_eq!(sell.side, OrderSide::Sell);
        let tracked_sell = machine
            .tracked_orders()
            .into_iter()
            .find(|o| o.order_id == sell.order_id)
            .unwrap();
        assert_eq!(tracked_sell.role, OrderRole::GridReplace);

        exchange.fill(&sell.order_id).await;
        let report = machine.poll(&exchange).await.unwrap();
        assert_eq!(report.fills, 1);
        assert_eq!(report.replacements_placed, 1);

        let buy_again = exchange.placed_orders().await.pop().unwrap();
        assert_eq!(buy_again.side, OrderSide::Buy);
        assert!(approx(buy_again.price, 99.5 * 1.005 * 0.995));
        assert_eq!(exchange.place_calls(), 6);

        let tracked = machine.tracked_orders();
        assert_eq!(tracked.len(), 4);
        assert!(tracked.iter().all(|o| o.order_id != sell.order_id));
        let tracked_buy = tracked.iter().find(|o| o.order_id == buy_again.order_id).unwrap();
        assert_eq!(tracked_buy.role, OrderRole::GridReplace);
    }
}
