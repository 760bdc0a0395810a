// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value
    )
)]

//! Stop-Loss Engine - Core Library
//!
//! Unattended stop-loss sentinel for a single brokerage account. The engine
//! polls the account's open holdings on a fixed interval, values them against
//! live quotes, and - when the aggregate loss breaches a configured negative
//! threshold - performs a one-time, best-effort market liquidation of every
//! position.
//!
//! # Architecture
//!
//! - **Domain**: pure types and P&L math with no I/O
//!   - `domain`: `Symbol`, `Position`, `PortfolioSnapshot`, valuation fold
//! - **Application**: port definitions (seams for the outside world)
//!   - `application::ports`: `BrokerPort`, `QuoteProviderPort`, `QuoteResolver`
//! - **Engine**: the monitoring/trigger/liquidation core
//!   - `engine::state_machine`: breach detection, one-shot latch, circuit ceiling
//!   - `engine::aggregator`: snapshot x quotes -> portfolio report
//!   - `engine::liquidation`: market sell batch with partial-failure tally
//!   - `engine::driver`: fixed-interval poll loop and exit conditions
//! - **Infrastructure**: adapters
//!   - `infrastructure::broker::dhan`: Dhan REST adapter
//!   - `infrastructure::quotes`: quote provider chain, Yahoo Finance provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Application layer - port definitions.
pub mod application;

/// Configuration surface parsed from the environment.
pub mod config;

/// Operator-facing report formatting.
pub mod display;

/// Domain layer - pure types and P&L math.
pub mod domain;

/// Engine core - state machine, aggregator, executor, poll loop.
pub mod engine;

/// Infrastructure layer - broker and quote adapters.
pub mod infrastructure;

// Re-exports for the binary and integration tests
pub use application::ports::{
    BrokerError, BrokerPort, OrderAck, QuoteError, QuoteProviderPort, QuoteResolver, QuoteSource,
    ResolvedQuote, SellOrder,
};
pub use config::{ConfigError, EngineConfig};
pub use domain::{PortfolioPnL, PortfolioSnapshot, Position, PositionResult, Symbol, Valuation};
pub use engine::aggregator::{PnlAggregator, PortfolioReport};
pub use engine::driver::{ExitReason, PollLoopConfig, PollLoopDriver, RunSummary};
pub use engine::liquidation::{
    LiquidationExecutor, LiquidationOutcome, OrderAttempt, OrderAttemptStatus,
};
pub use engine::state_machine::{EngineState, StopLossStateMachine, Verdict};
pub use infrastructure::broker::dhan::{DhanBrokerAdapter, DhanConfig, DhanError};
pub use infrastructure::quotes::{QuoteChain, YahooFinanceProvider};
