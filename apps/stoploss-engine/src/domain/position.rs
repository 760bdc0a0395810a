//! Held positions as reported by the brokerage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// One held instrument from the brokerage holdings snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Exchange trading symbol.
    pub symbol: Symbol,
    /// Opaque broker identifier required for order placement.
    pub security_id: String,
    /// Held quantity. Zero-quantity positions are excluded from all
    /// calculations.
    pub quantity: u64,
    /// Per-unit acquisition cost. Must be positive to contribute to sums.
    pub average_cost: Decimal,
    /// Last price as reported by the brokerage snapshot. May be zero or
    /// stale; used only as the final quote fallback.
    pub last_price: Decimal,
}

impl Position {
    /// Whether this position participates in valuation and liquidation.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.quantity > 0
    }
}

/// Immutable snapshot of the account's holdings.
///
/// A fresh snapshot is fetched every cycle; nothing is cached across cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Positions in broker-reported order.
    pub positions: Vec<Position>,
    /// Capture timestamp.
    pub captured_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// Create a snapshot captured now.
    #[must_use]
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            positions,
            captured_at: Utc::now(),
        }
    }

    /// Positions with a non-zero quantity, in snapshot order.
    pub fn eligible_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_eligible())
    }

    /// Whether the snapshot holds anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
