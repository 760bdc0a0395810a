//! Fixed-interval poll loop.
//!
//! Drives the fetch/aggregate/evaluate cycle on a steady cadence until one
//! of the exit conditions fires. Cycles are strictly sequential; a slow
//! cycle delays the next tick rather than overlapping it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{BrokerPort, QuoteResolver};
use crate::display;
use crate::engine::aggregator::PnlAggregator;
use crate::engine::liquidation::{LiquidationExecutor, LiquidationOutcome};
use crate::engine::state_machine::{EngineState, StopLossStateMachine, Verdict};

/// Poll loop bounds.
#[derive(Debug, Clone)]
pub struct PollLoopConfig {
    /// Delay between cycle starts.
    pub interval: Duration,
    /// Hard iteration ceiling.
    pub max_iterations: u64,
    /// Hard wall-clock ceiling for the run.
    pub max_duration: Duration,
    /// Local time of day after which no new cycle starts. `None` disables
    /// the cutoff.
    pub session_cutoff: Option<NaiveTime>,
    /// Delay between order submissions during liquidation.
    pub order_pacing: Duration,
}

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The stop loss fired and the liquidation batch completed.
    StopLossExecuted,
    /// Consecutive fetch failures reached the circuit ceiling.
    CircuitOpen,
    /// The local session cutoff time passed.
    SessionCutoff,
    /// The iteration ceiling was reached.
    IterationsExhausted,
    /// The wall-clock ceiling was reached.
    DurationElapsed,
    /// Shutdown was requested from outside.
    Interrupted,
}

/// Final accounting for a monitoring run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Completed cycle count.
    pub iterations: u64,
    /// Total run time.
    pub elapsed: Duration,
    /// Why the run ended.
    pub exit: ExitReason,
    /// Whether the one-shot latch was armed during the run.
    pub stop_loss_fired: bool,
    /// Liquidation tally, when a batch ran.
    pub liquidation: Option<LiquidationOutcome>,
}

/// Owns one monitoring run end to end.
pub struct PollLoopDriver<B, R: QuoteResolver> {
    broker: Arc<B>,
    aggregator: PnlAggregator<R>,
    executor: LiquidationExecutor<B, R>,
    machine: StopLossStateMachine,
    config: PollLoopConfig,
}

impl<B, R> PollLoopDriver<B, R>
where
    B: BrokerPort,
    R: QuoteResolver,
{
    /// Wire up a driver over the broker and quote ports.
    #[must_use]
    pub fn new(
        broker: Arc<B>,
        quotes: Arc<R>,
        machine: StopLossStateMachine,
        config: PollLoopConfig,
    ) -> Self {
        let aggregator = PnlAggregator::new(Arc::clone(&quotes));
        let executor = LiquidationExecutor::new(Arc::clone(&broker), quotes, config.order_pacing);
        Self {
            broker,
            aggregator,
            executor,
            machine,
            config,
        }
    }

    /// Run cycles until an exit condition fires.
    ///
    /// A fetch failure is recoverable: the cycle is skipped and the failure
    /// counts toward the circuit ceiling. Everything after a successful
    /// fetch is infallible by construction.
    pub async fn run(&self, shutdown: CancellationToken) -> RunSummary {
        let started = Instant::now();
        let mut state = EngineState::new();
        let mut iterations: u64 = 0;
        let mut liquidation: Option<LiquidationOutcome> = None;

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            threshold = %self.machine.threshold(),
            auto_liquidation = self.machine.auto_liquidation(),
            max_iterations = self.config.max_iterations,
            "stop-loss monitoring started"
        );

        let exit = loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    break ExitReason::Interrupted;
                }
                _ = ticker.tick() => {}
            }

            if let Some(cutoff) = self.config.session_cutoff {
                if Local::now().time() >= cutoff {
                    tracing::info!(cutoff = %cutoff, "session cutoff reached");
                    break ExitReason::SessionCutoff;
                }
            }

            iterations += 1;

            match self.broker.get_holdings().await {
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        consecutive_failures = state.consecutive_failures + 1,
                        "holdings fetch failed; cycle skipped"
                    );
                    if self.machine.record_failure(&mut state) {
                        break ExitReason::CircuitOpen;
                    }
                }
                Ok(snapshot) => {
                    self.machine.record_success(&mut state);

                    let funds = match self.broker.get_available_funds().await {
                        Ok(funds) => Some(funds),
                        Err(e) => {
                            tracing::debug!(error = %e, "funds fetch failed; omitted from report");
                            None
                        }
                    };

                    let report = self.aggregator.aggregate(&snapshot).await;
                    tracing::info!(
                        "\n{}",
                        display::cycle_report(
                            iterations,
                            self.config.max_iterations,
                            &report,
                            funds,
                            self.machine.threshold(),
                        )
                    );

                    match self.machine.evaluate(&mut state, report.pnl.net_pnl_percent) {
                        Verdict::Hold => {}
                        Verdict::Alert { net_pnl_percent } => {
                            tracing::warn!(
                                net_pnl_percent = %net_pnl_percent,
                                threshold = %self.machine.threshold(),
                                "stop-loss threshold breached; auto-liquidation disabled"
                            );
                        }
                        Verdict::Liquidate { net_pnl_percent } => {
                            tracing::warn!(
                                net_pnl_percent = %net_pnl_percent,
                                threshold = %self.machine.threshold(),
                                "stop-loss threshold breached; liquidating all positions"
                            );
                            // Latch first: a partial or failed batch still
                            // counts as this run's single attempt.
                            self.machine.arm_latch(&mut state);
                            let outcome = self.executor.liquidate(&snapshot.positions).await;
                            tracing::warn!("\n{}", display::liquidation_summary(&outcome));
                            liquidation = Some(outcome);
                            break ExitReason::StopLossExecuted;
                        }
                    }
                }
            }

            if iterations >= self.config.max_iterations {
                break ExitReason::IterationsExhausted;
            }
            if started.elapsed() >= self.config.max_duration {
                break ExitReason::DurationElapsed;
            }
        };

        let summary = RunSummary {
            iterations,
            elapsed: started.elapsed(),
            exit,
            stop_loss_fired: state.triggered,
            liquidation,
        };

        tracing::info!(
            iterations = summary.iterations,
            elapsed_secs = summary.elapsed.as_secs(),
            exit = ?summary.exit,
            stop_loss_fired = summary.stop_loss_fired,
            "monitoring run complete"
        );

        summary
    }
}
