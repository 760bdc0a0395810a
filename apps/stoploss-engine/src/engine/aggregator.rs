//! Per-cycle P&L aggregation.
//!
//! Combines a holdings snapshot with freshly resolved quotes into
//! per-position results and the portfolio aggregate. Quote failures degrade
//! a position to excluded-from-sums; they never fail the cycle.

use std::sync::Arc;

use crate::application::ports::QuoteResolver;
use crate::domain::{PortfolioPnL, PortfolioSnapshot, PositionResult, Valuation};

/// One cycle's valuation output.
#[derive(Debug, Clone)]
pub struct PortfolioReport {
    /// Aggregate over contributing positions.
    pub pnl: PortfolioPnL,
    /// Every eligible position, contributing or awaiting a usable price.
    pub positions: Vec<PositionResult>,
}

impl PortfolioReport {
    /// Number of positions excluded from the sums this cycle.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.positions.iter().filter(|p| !p.contributes()).count()
    }
}

/// Values a snapshot against the quote chain.
pub struct PnlAggregator<R: QuoteResolver> {
    quotes: Arc<R>,
}

impl<R: QuoteResolver> PnlAggregator<R> {
    /// Create an aggregator over a quote resolver.
    #[must_use]
    pub fn new(quotes: Arc<R>) -> Self {
        Self { quotes }
    }

    /// Value every eligible position and fold the aggregate.
    ///
    /// Positions with quantity 0 are skipped outright. A position missing a
    /// usable price or cost basis is emitted with `valuation: None` and
    /// excluded from the sums.
    pub async fn aggregate(&self, snapshot: &PortfolioSnapshot) -> PortfolioReport {
        let mut positions = Vec::new();

        for position in snapshot.eligible_positions() {
            let fallback =
                (position.last_price > rust_decimal::Decimal::ZERO).then_some(position.last_price);
            let quote = self.quotes.resolve(&position.symbol, fallback).await;

            let valuation = quote
                .price
                .and_then(|price| Valuation::compute(position.average_cost, price, position.quantity));

            if valuation.is_none() {
                tracing::debug!(
                    symbol = %position.symbol,
                    average_cost = %position.average_cost,
                    source = %quote.source,
                    "position awaiting usable price; excluded from sums"
                );
            }

            positions.push(PositionResult {
                symbol: position.symbol.clone(),
                quantity: position.quantity,
                average_cost: position.average_cost,
                resolved_price: quote.price,
                source: quote.source,
                valuation,
            });
        }

        PortfolioReport {
            pnl: PortfolioPnL::fold(&positions),
            positions,
        }
    }
}
