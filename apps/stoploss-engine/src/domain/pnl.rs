//! Per-position and portfolio-level P&L.
//!
//! The fold applies the safety lock: a position contributes to the aggregate
//! sums only when both its cost basis and its resolved price are strictly
//! positive. Anything else is reported but excluded, so a stale zero price
//! can never depress or inflate the computed loss percentage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::QuoteSource;

use super::symbol::Symbol;

/// Valuation of a single position at a resolved price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    /// `average_cost * quantity`.
    pub invested: Decimal,
    /// `resolved_price * quantity`.
    pub current_value: Decimal,
    /// `current_value - invested`.
    pub pnl: Decimal,
    /// `pnl / invested * 100`.
    pub pnl_percent: Decimal,
}

impl Valuation {
    /// Compute a valuation, or `None` when the safety lock excludes the
    /// position (non-positive cost basis or price).
    #[must_use]
    pub fn compute(average_cost: Decimal, price: Decimal, quantity: u64) -> Option<Self> {
        if average_cost <= Decimal::ZERO || price <= Decimal::ZERO || quantity == 0 {
            return None;
        }

        let quantity = Decimal::from(quantity);
        let invested = average_cost * quantity;
        let current_value = price * quantity;
        let pnl = current_value - invested;

        Some(Self {
            invested,
            current_value,
            pnl,
            pnl_percent: pnl / invested * Decimal::ONE_HUNDRED,
        })
    }
}

/// Outcome of valuing one position for a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionResult {
    /// Trading symbol.
    pub symbol: Symbol,
    /// Held quantity.
    pub quantity: u64,
    /// Per-unit acquisition cost as reported.
    pub average_cost: Decimal,
    /// Price used for valuation, when one was usable.
    pub resolved_price: Option<Decimal>,
    /// Where the resolved price came from.
    pub source: QuoteSource,
    /// Valuation, or `None` when the position is awaiting a usable price
    /// or cost basis and is excluded from the aggregate.
    pub valuation: Option<Valuation>,
}

impl PositionResult {
    /// Whether this position contributes to the aggregate sums.
    #[must_use]
    pub fn contributes(&self) -> bool {
        self.valuation.is_some()
    }
}

/// Aggregate P&L over valid positions only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioPnL {
    /// Sum of invested amounts across contributing positions.
    pub total_invested: Decimal,
    /// Sum of current values across contributing positions.
    pub total_current: Decimal,
    /// `total_current - total_invested`.
    pub net_pnl: Decimal,
    /// Net P&L percentage; `None` when nothing was invested, in which case
    /// no stop-loss evaluation happens this cycle.
    pub net_pnl_percent: Option<Decimal>,
}

impl PortfolioPnL {
    /// Fold per-position results into the aggregate.
    #[must_use]
    pub fn fold(results: &[PositionResult]) -> Self {
        let mut total_invested = Decimal::ZERO;
        let mut total_current = Decimal::ZERO;

        for valuation in results.iter().filter_map(|r| r.valuation.as_ref()) {
            total_invested += valuation.invested;
            total_current += valuation.current_value;
        }

        let net_pnl = total_current - total_invested;
        let net_pnl_percent = if total_invested > Decimal::ZERO {
            Some(net_pnl / total_invested * Decimal::ONE_HUNDRED)
        } else {
            None
        };

        Self {
            total_invested,
            total_current,
            net_pnl,
            net_pnl_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn result(
        symbol: &str,
        quantity: u64,
        average_cost: Decimal,
        price: Option<Decimal>,
    ) -> PositionResult {
        let valuation = price.and_then(|p| Valuation::compute(average_cost, p, quantity));
        PositionResult {
            symbol: Symbol::new(symbol),
            quantity,
            average_cost,
            resolved_price: price,
            source: QuoteSource::BrokerFallback,
            valuation,
        }
    }

    #[test]
    fn valuation_basic_loss() {
        let v = Valuation::compute(dec!(100), dec!(95), 10).unwrap();
        assert_eq!(v.invested, dec!(1000));
        assert_eq!(v.current_value, dec!(950));
        assert_eq!(v.pnl, dec!(-50));
        assert_eq!(v.pnl_percent, dec!(-5));
    }

    #[test]
    fn valuation_locked_on_zero_price() {
        assert!(Valuation::compute(dec!(100), Decimal::ZERO, 10).is_none());
    }

    #[test]
    fn valuation_locked_on_zero_cost() {
        assert!(Valuation::compute(Decimal::ZERO, dec!(95), 10).is_none());
    }

    #[test]
    fn valuation_locked_on_zero_quantity() {
        assert!(Valuation::compute(dec!(100), dec!(95), 0).is_none());
    }

    #[test]
    fn fold_two_valid_positions() {
        // Scenario from the design: A (qty 10, cost 100, quote 95) and
        // B (qty 5, cost 200, fallback price 190) -> -5.0%, no breach at -6.5
        let results = vec![
            result("A", 10, dec!(100), Some(dec!(95))),
            result("B", 5, dec!(200), Some(dec!(190))),
        ];

        let pnl = PortfolioPnL::fold(&results);
        assert_eq!(pnl.total_invested, dec!(2000));
        assert_eq!(pnl.total_current, dec!(1900));
        assert_eq!(pnl.net_pnl, dec!(-100));
        assert_eq!(pnl.net_pnl_percent, Some(dec!(-5)));
    }

    #[test]
    fn fold_excludes_invalid_position_entirely() {
        // B has no usable price at all: totals come from A alone.
        let results = vec![
            result("A", 10, dec!(100), Some(dec!(80))),
            result("B", 5, dec!(200), None),
        ];

        let pnl = PortfolioPnL::fold(&results);
        assert_eq!(pnl.total_invested, dec!(1000));
        assert_eq!(pnl.total_current, dec!(800));
        assert_eq!(pnl.net_pnl_percent, Some(dec!(-20)));
    }

    #[test]
    fn fold_with_nothing_invested_has_no_percentage() {
        let results = vec![result("A", 10, dec!(100), None)];
        let pnl = PortfolioPnL::fold(&results);
        assert_eq!(pnl.total_invested, Decimal::ZERO);
        assert!(pnl.net_pnl_percent.is_none());
    }

    #[test]
    fn fold_empty_results() {
        let pnl = PortfolioPnL::fold(&[]);
        assert_eq!(pnl, PortfolioPnL::default());
        assert!(pnl.net_pnl_percent.is_none());
    }
}
