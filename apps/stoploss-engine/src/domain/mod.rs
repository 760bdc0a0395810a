//! Shared Domain Types
//!
//! Pure value objects and P&L math. Nothing in this module performs I/O.

pub mod pnl;
pub mod position;
pub mod symbol;

pub use pnl::{PortfolioPnL, PositionResult, Valuation};
pub use position::{PortfolioSnapshot, Position};
pub use symbol::{DomainError, Symbol};
