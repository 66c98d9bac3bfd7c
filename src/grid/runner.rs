//! Grid bot runner - main execution loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::Deserialize;
use tokio::time::{interval, MissedTickBehavior};

use super::config::GridConfig;
use super::errors::GridResult;
use super::executor::GridExchange;
use super::manager::GridStateMachine;

/// Grid bot runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl RunnerConfig {
    pub fn poll_interval(&self) -> Duration {
        // interval() panics on a zero period
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Totals over one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub cycles: u32,
    pub fills: u32,
    pub replacements: u32,
    /// Orders cancelled by the final stop
    pub cancelled_on_stop: u32,
}

/// Drives a [`GridStateMachine`]: start, poll on a fixed interval, stop on
/// shutdown.
pub struct GridRunner<E: GridExchange + ?Sized> {
    machine: GridStateMachine,
    exchange: Arc<E>,
    runner_config: RunnerConfig,
}

impl<E: GridExchange + ?Sized> GridRunner<E> {
    pub fn new(config: GridConfig, exchange: Arc<E>, runner_config: RunnerConfig) -> GridResult<Self> {
        Ok(Self {
            machine: GridStateMachine::new(config)?,
            exchange,
            runner_config,
        })
    }

    pub fn machine(&self) -> &GridStateMachine {
        &self.machine
    }

    /// Run until `shutdown` resolves, then cancel everything.
    ///
    /// `shutdown` is watched from the moment this is called. If it fires
    /// while the grid is being placed, placement finishes and the grid is
    /// stopped without polling. Afterwards shutdown is observed between
    /// cycles only; a poll in flight always completes first. Ticks missed
    /// during a slow cycle are delayed, not bursted.
    pub async fn run_until<S>(&mut self, shutdown: S) -> GridResult<RunSummary>
    where
        S: Future<Output = ()>,
    {
        let exchange = self.exchange.clone();
        let mut summary = RunSummary::default();

        tokio::pin!(shutdown);
        let mut shutdown_requested = false;

        {
            let start = self.machine.start(exchange.as_ref());
            tokio::pin!(start);
            tokio::select! {
                biased;
                result = &mut start => result?,
                _ = &mut shutdown => {
                    info!("Shutdown requested while placing the grid, stopping once placement ends");
                    shutdown_requested = true;
                    start.await?
                }
            };
        }

        if !shutdown_requested {
            let mut poll_timer = interval(self.runner_config.poll_interval());
            poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately; the grid was just placed
            poll_timer.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        info!("Shutdown requested");
                        break;
                    }
                    _ = poll_timer.tick() => {
                        summary.cycles += 1;
                        self.run_cycle(exchange.as_ref(), &mut summary).await;
                    }
                }
            }
        }

        summary.cancelled_on_stop = self.machine.stop(exchange.as_ref()).await?;
        info!(
            "Runner finished after {} cycles: {} fills, {} replacements",
            summary.cycles, summary.fills, summary.replacements
        );
        Ok(summary)
    }

    /// One poll plus the status line. Errors are logged; the next cycle sees
    /// the same orders.
    async fn run_cycle(&mut self, exchange: &E, summary: &mut RunSummary) {
        let report = match self.machine.poll(exchange).await {
            Ok(report) => report,
            Err(e) => {
                error!("Cycle {} failed: {}", summary.cycles, e);
                return;
            }
        };

        summary.fills += report.fills;
        summary.replacements += report.replacements_placed;
        info!(
            "Cycle {}: {} tracked, {} fills, {} replaced, {} failed",
            summary.cycles,
            report.tracked,
            report.fills,
            report.replacements_placed,
            report.replacements_failed
        );

        match exchange.available_balance().await {
            Ok(available) => info!(
                "Balance: {:.2} available | Open orders: {}",
                available, report.open_orders
            ),
            Err(e) => warn!("Could not fetch balance for status: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::executor::mock::MockExchange;
    use crate::grid::types::BotRunState;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::oneshot;

    fn runner(exchange: Arc<MockExchange>) -> GridRunner<MockExchange> {
        GridRunner::new(
            GridConfig::new("BTC-USDT", 2, 0.5, 0.0001),
            exchange,
            RunnerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_runner_config_default() {
        let config = RunnerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(RunnerConfig { poll_interval_secs: 0 }.poll_interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_until_shutdown() {
        let exchange = Arc::new(MockExchange::new(100.0));
        let mut runner = runner(exchange.clone());

        let summary = runner
            .run_until(tokio::time::sleep(Duration::from_secs(35)))
            .await
            .unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(exchange.list_calls(), 3);
        // one status balance per successful cycle
        assert_eq!(exchange.balance_calls(), 3);
        assert_eq!(summary.cancelled_on_stop, 4);
        assert_eq!(exchange.cancel_all_calls(), 2);
        assert_eq!(runner.machine().state(), BotRunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_poll_after_shutdown() {
        let exchange = Arc::new(MockExchange::new(100.0));
        let mut runner = runner(exchange.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let shutdown = async move {
            let _ = rx.await;
        };

        let observer = exchange.clone();
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            let polls = observer.list_calls();
            let _ = tx.send(());
            polls
        });

        let summary = runner.run_until(shutdown).await.unwrap();
        let polls_at_shutdown = trigger.await.unwrap();

        assert_eq!(polls_at_shutdown, 1);
        assert_eq!(summary.cycles, 1);
        assert_eq!(exchange.list_calls(), 1);
        assert_eq!(exchange.cancel_all_calls(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(exchange.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_shutdown_still_stops() {
        let exchange = Arc::new(MockExchange::new(100.0));
        let mut runner = runner(exchange.clone());

        let summary = runner.run_until(std::future::ready(())).await.unwrap();
        assert_eq!(summary.cycles, 0);
        assert_eq!(exchange.list_calls(), 0);
        assert_eq!(exchange.cancel_all_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_errors_do_not_end_the_run() {
        let exchange = Arc::new(MockExchange::new(100.0));
        exchange.set_fail_list(true).await;
        let mut runner = runner(exchange.clone());

        let summary = runner
            .run_until(tokio::time::sleep(Duration::from_secs(25)))
            .await
            .unwrap();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.fills, 0);
        assert_eq!(exchange.balance_calls(), 0);
        assert_eq!(runner.machine().tracked_count(), 0);
        assert_eq!(runner.machine().state(), BotRunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fills_are_replaced_during_run() {
        let exchange = Arc::new(MockExchange::new(100.0));
        let mut runner = runner(exchange.clone());

        let filler = exchange.clone();
        let shutdown = async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let first = filler.placed_orders().await[0].order_id.clone();
            filler.fill(&first).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        };

        let summary = runner.run_until(shutdown).await.unwrap();
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.fills, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(exchange.place_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_is_returned() {
        let exchange = Arc::new(MockExchange::new(100.0));
        exchange.set_fail_price(true).await;
        let mut runner = runner(exchange.clone());

        assert!(runner.run_until(std::future::pending::<()>()).await.is_err());
        assert_eq!(runner.machine().state(), BotRunState::Idle);
        assert_eq!(exchange.list_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_start_cancels_placed_grid() {
        let exchange = Arc::new(MockExchange::new(100.0));
        exchange.set_latency(Duration::from_secs(1)).await;
        let mut runner = runner(exchange.clone());

        let observer = exchange.clone();
        let placed_at_signal = Arc::new(AtomicU32::new(u32::MAX));
        let seen = placed_at_signal.clone();
        let shutdown = async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            seen.store(observer.place_calls(), Ordering::SeqCst);
        };

        let summary = runner.run_until(shutdown).await.unwrap();

        assert!(placed_at_signal.load(Ordering::SeqCst) < 4);
        assert_eq!(exchange.place_calls(), 4);
        assert_eq!(summary.cycles, 0);
        assert_eq!(exchange.list_calls(), 0);
        assert_eq!(summary.cancelled_on_stop, 4);
        assert!(exchange.open_orders().await.is_empty());
        assert_eq!(runner.machine().state(), BotRunState::Stopped);
    }
}
