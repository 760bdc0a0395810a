//! Engine core.
//!
//! The stop-loss state machine, the per-cycle P&L aggregator, the
//! liquidation executor, and the poll loop that drives them.

pub mod aggregator;
pub mod driver;
pub mod liquidation;
pub mod state_machine;
