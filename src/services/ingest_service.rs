use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::api::binance::{ApiError, BinanceClient};
use crate::models::{PriceSample, TickerSnapshot};
use crate::services::frame_service::StopHandle;
use crate::services::readout_service::SharedReadouts;
use crate::services::series_service::SharedSeries;
use crate::utils::errors::DashboardError;

/// Anything that can produce the latest ticker snapshot
#[allow(async_fn_in_trait)]
pub trait TickerSource {
    async fn fetch(&self) -> Result<TickerSnapshot, ApiError>;
}

/// Binance 24h ticker for one symbol
pub struct BinanceTicker {
    client: BinanceClient,
    symbol: String,
}

impl BinanceTicker {
    pub fn new(client: BinanceClient, symbol: String) -> Self {
        BinanceTicker { client, symbol }
    }
}

impl TickerSource for BinanceTicker {
    async fn fetch(&self) -> Result<TickerSnapshot, ApiError> {
        self.client.ticker_24h(&self.symbol).await
    }
}

/// Polls a ticker source, feeds the price series and updates the readouts
pub struct IngestLoop<S> {
    source: S,
    series: SharedSeries,
    readouts: SharedReadouts,
    period: Duration,
    stop: watch::Receiver<bool>,
    polls: u64,
    failures: u64,
}

impl<S: TickerSource> IngestLoop<S> {
    pub fn new(
        source: S,
        series: SharedSeries,
        readouts: SharedReadouts,
        period: Duration,
        stop: &StopHandle,
    ) -> Self {
        IngestLoop {
            source,
            series,
            readouts,
            period,
            stop: stop.subscribe(),
            polls: 0,
            failures: 0,
        }
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Fetch once and apply the result. Nothing is touched when the fetch fails.
    pub async fn poll_once(&mut self) -> Result<TickerSnapshot, DashboardError> {
        self.polls += 1;
        let ticker = self.source.fetch().await?;
        let sample = PriceSample::new(ticker.last_price)?;

        let len = {
            let mut series = self.series.borrow_mut();
            series.append(sample);
            series.len()
        };
        debug!(
            "{} @ {} ({} samples buffered)",
            ticker.symbol, ticker.last_price, len
        );

        let mut readouts = self.readouts.borrow_mut();
        readouts.apply_ticker(&ticker);
        debug!("Readouts:\n{}", readouts.render_table());

        Ok(ticker)
    }

    /// Poll immediately, then once per period, until stopped
    pub async fn run(mut self) -> Self {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("ingest loop started ({:?} period)", self.period);

        let mut stop = self.stop.clone();
        if *stop.borrow() {
            return self;
        }

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // A fetch in flight is abandoned when the stop signal fires
                    tokio::select! {
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                debug!("ingest stopped with a fetch in flight");
                                break;
                            }
                        }
                        result = self.poll_once() => {
                            if let Err(e) = result {
                                self.failures += 1;
                                error!("Ticker update failed: {}", e);
                            }
                        }
                    }
                }
            }
        }

        info!(
            "ingest loop stopped after {} polls ({} failed)",
            self.polls, self.failures
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadoutField;
    use crate::services::readout_service::tests::{recording_board, ticker};
    use crate::services::series_service::PriceSeriesBuffer;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tokio::task::LocalSet;

    /// Replays queued results, then keeps failing
    struct ScriptedSource {
        script: RefCell<VecDeque<Result<TickerSnapshot, ApiError>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TickerSnapshot, ApiError>>) -> Self {
            ScriptedSource {
                script: RefCell::new(script.into()),
            }
        }

        fn prices(prices: &[f64]) -> Self {
            Self::new(prices.iter().map(|&p| Ok(ticker(p, 0.5))).collect())
        }
    }

    impl TickerSource for ScriptedSource {
        async fn fetch(&self) -> Result<TickerSnapshot, ApiError> {
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::RequestError("script exhausted".to_string())))
        }
    }

    fn build_ingest(source: ScriptedSource, capacity: usize, stop: &StopHandle) -> (IngestLoop<ScriptedSource>, SharedSeries, SharedReadouts) {
        let series = PriceSeriesBuffer::shared(capacity).unwrap();
        let (board, _) = recording_board(0);
        let readouts = board.shared();
        let ingest = IngestLoop::new(
            source,
            series.clone(),
            readouts.clone(),
            Duration::from_millis(1500),
            stop,
        );
        (ingest, series, readouts)
    }

    #[tokio::test]
    async fn test_poll_appends_and_updates_readouts() {
        let stop = StopHandle::new();
        let (mut ingest, series, readouts) = build_ingest(ScriptedSource::prices(&[100.0, 101.0]), 5, &stop);

        ingest.poll_once().await.unwrap();
        ingest.poll_once().await.unwrap();

        let prices: Vec<f64> = series.borrow().prices().collect();
        assert_eq!(prices, vec![100.0, 101.0]);
        assert_eq!(readouts.borrow().field(ReadoutField::MainPrice), Some("$101.00"));
        assert_eq!(ingest.polls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_alone() {
        let stop = StopHandle::new();
        let source = ScriptedSource::new(vec![
            Ok(ticker(100.0, 0.0)),
            Err(ApiError::ServerError(502, "bad gateway".to_string())),
        ]);
        let (mut ingest, series, readouts) = build_ingest(source, 5, &stop);

        ingest.poll_once().await.unwrap();
        let err = ingest.poll_once().await.unwrap_err();

        assert!(matches!(err, DashboardError::Api(ApiError::ServerError(502, _))));
        assert_eq!(series.borrow().len(), 1);
        assert_eq!(readouts.borrow().field(ReadoutField::MainPrice), Some("$100.00"));
    }

    #[tokio::test]
    async fn test_capacity_holds_across_polls() {
        let stop = StopHandle::new();
        let source = ScriptedSource::prices(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let (mut ingest, series, _) = build_ingest(source, 5, &stop);

        for _ in 0..6 {
            ingest.poll_once().await.unwrap();
            assert!(series.borrow().len() <= 5);
        }
        let prices: Vec<f64> = series.borrow().prices().collect();
        assert_eq!(prices, vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    /// A fetch that never completes
    struct StalledSource;

    impl TickerSource for StalledSource {
        async fn fetch(&self) -> Result<TickerSnapshot, ApiError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_a_stalled_fetch() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let stop = StopHandle::new();
                let series = PriceSeriesBuffer::shared(5).unwrap();
                let (board, _) = recording_board(0);
                let ingest = IngestLoop::new(
                    StalledSource,
                    series.clone(),
                    board.shared(),
                    Duration::from_millis(1500),
                    &stop,
                );
                let handle = tokio::task::spawn_local(ingest.run());

                tokio::time::sleep(Duration::from_millis(100)).await;
                stop.stop();
                let ingest = tokio::time::timeout(Duration::from_secs(5), handle)
                    .await
                    .expect("ingest exits promptly once stopped")
                    .unwrap();

                assert_eq!(ingest.polls(), 1);
                assert_eq!(ingest.failures(), 0);
                assert!(series.borrow().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_on_cadence_until_stopped() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let stop = StopHandle::new();
                let source = ScriptedSource::prices(&[10.0, 11.0]);
                let (ingest, series, _) = build_ingest(source, 5, &stop);
                let handle = tokio::task::spawn_local(ingest.run());

                // polls at 0 ms, 1500 ms and 3000 ms; the third one finds the script empty
                tokio::time::sleep(Duration::from_millis(3100)).await;
                stop.stop();
                let ingest = handle.await.unwrap();

                assert_eq!(ingest.polls(), 3);
                assert_eq!(ingest.failures(), 1);
                assert_eq!(series.borrow().len(), 2);
            })
            .await;
    }
}
