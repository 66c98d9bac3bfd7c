//! Polling price watcher

use std::time::Duration;

use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::prelude::*;

use super::market_data::MarketData;
use super::types::PriceQuote;

const UPDATE_BUFFER: usize = 16;

/// Handle to a background task that fetches a quote on a fixed interval.
///
/// Dropping the handle also ends the task once its current request returns.
pub struct PriceWatch {
    updates: mpsc::Receiver<Result<PriceQuote>>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PriceWatch {
    pub(super) fn spawn(market: MarketData, symbol: String, every: Duration) -> Self {
        let (tx, updates) = mpsc::channel(UPDATE_BUFFER);
        let (stop, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                let update = market.get_price(&symbol).await;
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    sent = tx.send(update) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Price watch for {} ended", symbol);
        });

        Self {
            updates,
            stop: Some(stop),
            task,
        }
    }

    /// Next update, or `None` once the watch has ended.
    ///
    /// Fetch errors are delivered as `Some(Err(_))`; the watch keeps going.
    pub async fn recv(&mut self) -> Option<Result<PriceQuote>> {
        self.updates.recv().await
    }

    /// Stop polling. No request is sent after this returns.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}
