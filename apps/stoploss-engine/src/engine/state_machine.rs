//! Stop-loss state machine.
//!
//! Owns the monitoring/trigger transitions and the single-execution latch.
//!
//! ```text
//! MONITORING -> BREACH_DETECTED   net% <= threshold, invested > 0, latch unset
//! BREACH_DETECTED -> LIQUIDATING  auto-liquidation enabled
//! BREACH_DETECTED -> MONITORING   alert-only mode, latch stays unset
//! LIQUIDATING -> DONE             always, once the executor returns
//! any -> CIRCUIT_OPEN             consecutive failures reach the ceiling
//! ```
//!
//! The latch is armed before the liquidation attempt begins, so a partial
//! or failed batch still counts as the run's one attempt.

use rust_decimal::Decimal;

/// Run-scoped mutable engine state.
///
/// Created at loop start, mutated only through the state machine, and
/// discarded at process exit. Never touched by the aggregator or executor.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    /// One-way liquidation latch. Once true, no further liquidation is
    /// attempted this run regardless of deeper breaches.
    pub triggered: bool,
    /// Consecutive snapshot-fetch failures feeding the circuit breaker.
    pub consecutive_failures: u32,
    /// Whether the current breach episode has already been alerted
    /// (alert-only mode with alert_once).
    breach_alerted: bool,
}

impl EngineState {
    /// Fresh state for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of feeding one cycle's aggregate P&L through the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep monitoring; nothing to do.
    Hold,
    /// Threshold breached but auto-liquidation is disabled: alert the
    /// operator and keep monitoring with the latch unset.
    Alert {
        /// The breaching net P&L percentage.
        net_pnl_percent: Decimal,
    },
    /// Threshold breached with auto-liquidation enabled: liquidate.
    Liquidate {
        /// The breaching net P&L percentage.
        net_pnl_percent: Decimal,
    },
}

/// The stop-loss decision rules, configured once per run.
#[derive(Debug, Clone)]
pub struct StopLossStateMachine {
    threshold: Decimal,
    auto_liquidation: bool,
    alert_once: bool,
    failure_ceiling: u32,
}

impl StopLossStateMachine {
    /// Create the machine.
    ///
    /// `threshold` is a negative percentage (e.g. `-6.5`); `failure_ceiling`
    /// is the consecutive-failure count that opens the circuit.
    #[must_use]
    pub const fn new(
        threshold: Decimal,
        auto_liquidation: bool,
        alert_once: bool,
        failure_ceiling: u32,
    ) -> Self {
        Self {
            threshold,
            auto_liquidation,
            alert_once,
            failure_ceiling,
        }
    }

    /// The configured breach threshold.
    #[must_use]
    pub const fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Whether breaches execute automatically.
    #[must_use]
    pub const fn auto_liquidation(&self) -> bool {
        self.auto_liquidation
    }

    /// Evaluate one cycle's aggregate against the threshold.
    ///
    /// No decision is made when nothing was invested this cycle or when the
    /// latch is already set.
    pub fn evaluate(&self, state: &mut EngineState, net_pnl_percent: Option<Decimal>) -> Verdict {
        if state.triggered {
            // Latched: monitoring continues for visibility only.
            return Verdict::Hold;
        }

        let Some(pct) = net_pnl_percent else {
            return Verdict::Hold;
        };

        if pct > self.threshold {
            // Breach cleared (or never happened): a later breach episode
            // alerts again even in alert-once mode.
            state.breach_alerted = false;
            return Verdict::Hold;
        }

        if self.auto_liquidation {
            return Verdict::Liquidate {
                net_pnl_percent: pct,
            };
        }

        if self.alert_once && state.breach_alerted {
            return Verdict::Hold;
        }

        state.breach_alerted = true;
        Verdict::Alert {
            net_pnl_percent: pct,
        }
    }

    /// Arm the one-shot latch. Called before the liquidation attempt begins
    /// so a crash mid-batch cannot cause a retry storm.
    pub fn arm_latch(&self, state: &mut EngineState) {
        if !state.triggered {
            state.triggered = true;
            tracing::warn!("liquidation latch armed; no further attempts this run");
        }
    }

    /// Record a recoverable cycle failure. Returns true when the circuit
    /// opens (ceiling reached).
    pub fn record_failure(&self, state: &mut EngineState) -> bool {
        state.consecutive_failures += 1;
        let open = state.consecutive_failures >= self.failure_ceiling;
        if open {
            tracing::error!(
                consecutive_failures = state.consecutive_failures,
                ceiling = self.failure_ceiling,
                "circuit open after consecutive failures"
            );
        }
        open
    }

    /// Record a successful cycle, resetting the failure counter.
    pub fn record_success(&self, state: &mut EngineState) {
        state.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;

    fn machine(auto: bool) -> StopLossStateMachine {
        StopLossStateMachine::new(dec!(-6.5), auto, false, 5)
    }

    #[test_case(dec!(-5.0), false; "above threshold holds")]
    #[test_case(dec!(-6.4), false; "just above threshold holds")]
    #[test_case(dec!(-6.5), true; "at threshold breaches")]
    #[test_case(dec!(-20.0), true; "below threshold breaches")]
    fn threshold_boundary(pct: Decimal, breaches: bool) {
        let machine = machine(true);
        let mut state = EngineState::new();
        let verdict = machine.evaluate(&mut state, Some(pct));
        assert_eq!(matches!(verdict, Verdict::Liquidate { .. }), breaches);
    }

    #[test]
    fn no_investment_means_no_decision() {
        let machine = machine(true);
        let mut state = EngineState::new();
        assert_eq!(machine.evaluate(&mut state, None), Verdict::Hold);
    }

    #[test]
    fn latch_suppresses_further_liquidation() {
        let machine = machine(true);
        let mut state = EngineState::new();

        assert!(matches!(
            machine.evaluate(&mut state, Some(dec!(-10))),
            Verdict::Liquidate { .. }
        ));
        machine.arm_latch(&mut state);

        // A deeper breach on a later cycle changes nothing.
        assert_eq!(machine.evaluate(&mut state, Some(dec!(-30))), Verdict::Hold);
    }

    #[test]
    fn alert_only_mode_leaves_latch_unset_and_realerts() {
        let machine = machine(false);
        let mut state = EngineState::new();

        assert!(matches!(
            machine.evaluate(&mut state, Some(dec!(-8))),
            Verdict::Alert { .. }
        ));
        assert!(!state.triggered);

        // Breach persists: alert again next cycle.
        assert!(matches!(
            machine.evaluate(&mut state, Some(dec!(-9))),
            Verdict::Alert { .. }
        ));
        assert!(!state.triggered);
    }

    #[test]
    fn alert_once_suppresses_repeat_alerts_within_episode() {
        let machine = StopLossStateMachine::new(dec!(-6.5), false, true, 5);
        let mut state = EngineState::new();

        assert!(matches!(
            machine.evaluate(&mut state, Some(dec!(-8))),
            Verdict::Alert { .. }
        ));
        assert_eq!(machine.evaluate(&mut state, Some(dec!(-9))), Verdict::Hold);

        // Breach clears, then returns: a fresh episode alerts again.
        assert_eq!(machine.evaluate(&mut state, Some(dec!(-1))), Verdict::Hold);
        assert!(matches!(
            machine.evaluate(&mut state, Some(dec!(-7))),
            Verdict::Alert { .. }
        ));
    }

    #[test]
    fn circuit_opens_at_ceiling() {
        let machine = machine(true);
        let mut state = EngineState::new();

        for _ in 0..4 {
            assert!(!machine.record_failure(&mut state));
        }
        assert!(machine.record_failure(&mut state));
    }

    #[test]
    fn success_resets_failure_counter() {
        let machine = machine(true);
        let mut state = EngineState::new();

        machine.record_failure(&mut state);
        machine.record_failure(&mut state);
        machine.record_success(&mut state);
        assert_eq!(state.consecutive_failures, 0);

        for _ in 0..4 {
            assert!(!machine.record_failure(&mut state));
        }
        assert!(machine.record_failure(&mut state));
    }

    #[test]
    fn arm_latch_is_idempotent() {
        let machine = machine(true);
        let mut state = EngineState::new();
        machine.arm_latch(&mut state);
        machine.arm_latch(&mut state);
        assert!(state.triggered);
    }
}
