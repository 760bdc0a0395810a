//! Liquidation executor.
//!
//! Converts a breach decision into one market sell per eligible position.
//! The central reliability contract: a failed or unpriceable order never
//! aborts the batch - every remaining position still gets its attempt.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{BrokerPort, QuoteResolver, SellOrder};
use crate::domain::{Position, Symbol};

/// Terminal status of one order attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum OrderAttemptStatus {
    /// Order accepted by the broker.
    Sold {
        /// Broker-assigned order ID.
        order_id: String,
    },
    /// No usable price could be resolved; position left untouched. Not a
    /// hard failure.
    SkippedNoPrice,
    /// Order placement failed or was rejected.
    Failed {
        /// Error detail for the operator.
        reason: String,
    },
}

/// One position's liquidation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAttempt {
    /// Trading symbol.
    pub symbol: Symbol,
    /// Quantity submitted (the full held quantity).
    pub quantity: u64,
    /// Reporting price used for the sold-value tally, when one resolved.
    pub price: Option<Decimal>,
    /// Outcome.
    pub status: OrderAttemptStatus,
}

/// Tally of a liquidation batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Orders accepted by the broker.
    pub success_count: usize,
    /// Orders that failed or were rejected.
    pub failed_count: usize,
    /// Positions skipped for lack of a usable price.
    pub skipped_count: usize,
    /// Estimated value of the sold positions at the reporting price.
    pub total_sold_value: Decimal,
    /// One entry per eligible position, in submission order.
    pub attempts: Vec<OrderAttempt>,
}

impl LiquidationOutcome {
    /// Total attempts recorded.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.attempts.len()
    }
}

/// Places market sell orders for every eligible position.
pub struct LiquidationExecutor<B, R> {
    broker: Arc<B>,
    quotes: Arc<R>,
    pacing: Duration,
}

impl<B, R> LiquidationExecutor<B, R>
where
    B: BrokerPort,
    R: QuoteResolver,
{
    /// Create an executor.
    ///
    /// `pacing` is the delay between order submissions, respecting broker
    /// rate limits. It is not a correctness requirement.
    #[must_use]
    pub fn new(broker: Arc<B>, quotes: Arc<R>, pacing: Duration) -> Self {
        Self {
            broker,
            quotes,
            pacing,
        }
    }

    /// Sell every position with quantity > 0 at market.
    ///
    /// The price resolved here is for reporting only; market orders carry
    /// the zero-price sentinel. Order attempts are independent: an error on
    /// one is recorded and the batch continues.
    pub async fn liquidate(&self, positions: &[Position]) -> LiquidationOutcome {
        let mut outcome = LiquidationOutcome::default();

        let eligible: Vec<&Position> = positions.iter().filter(|p| p.is_eligible()).collect();
        tracing::warn!(
            positions = eligible.len(),
            "executing stop loss: selling all positions at market"
        );

        for (index, position) in eligible.iter().enumerate() {
            let fallback = (position.last_price > Decimal::ZERO).then_some(position.last_price);
            let quote = self.quotes.resolve(&position.symbol, fallback).await;

            let Some(price) = quote.price.filter(|p| *p > Decimal::ZERO) else {
                tracing::warn!(
                    symbol = %position.symbol,
                    quantity = position.quantity,
                    "skipping sell: no usable price"
                );
                outcome.skipped_count += 1;
                outcome.attempts.push(OrderAttempt {
                    symbol: position.symbol.clone(),
                    quantity: position.quantity,
                    price: None,
                    status: OrderAttemptStatus::SkippedNoPrice,
                });
                continue;
            };

            let order = SellOrder {
                security_id: position.security_id.clone(),
                symbol: position.symbol.clone(),
                quantity: position.quantity,
            };

            match self.broker.place_market_sell(&order).await {
                Ok(ack) => {
                    let sold_value = price * Decimal::from(position.quantity);
                    outcome.success_count += 1;
                    outcome.total_sold_value += sold_value;

                    tracing::info!(
                        symbol = %position.symbol,
                        quantity = position.quantity,
                        price = %price,
                        order_id = %ack.order_id,
                        "market sell accepted"
                    );
                    outcome.attempts.push(OrderAttempt {
                        symbol: position.symbol.clone(),
                        quantity: position.quantity,
                        price: Some(price),
                        status: OrderAttemptStatus::Sold {
                            order_id: ack.order_id,
                        },
                    });
                }
                Err(e) => {
                    outcome.failed_count += 1;
                    tracing::error!(
                        symbol = %position.symbol,
                        quantity = position.quantity,
                        error = %e,
                        "market sell failed; continuing batch"
                    );
                    outcome.attempts.push(OrderAttempt {
                        symbol: position.symbol.clone(),
                        quantity: position.quantity,
                        price: Some(price),
                        status: OrderAttemptStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
            }

            if index + 1 < eligible.len() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        tracing::info!(
            sold = outcome.success_count,
            failed = outcome.failed_count,
            skipped = outcome.skipped_count,
            total_sold_value = %outcome.total_sold_value,
            "liquidation batch complete"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::application::ports::{
        BrokerError, MockBrokerPort, MockQuoteResolver, OrderAck, QuoteSource, ResolvedQuote,
    };

    use super::*;

    fn position(symbol: &str, quantity: u64, last_price: Decimal) -> Position {
        Position {
            symbol: Symbol::new(symbol),
            security_id: format!("sec-{symbol}"),
            quantity,
            average_cost: dec!(100),
            last_price,
        }
    }

    fn resolver_with_price(price: Option<Decimal>) -> MockQuoteResolver {
        let mut resolver = MockQuoteResolver::new();
        resolver.expect_resolve().returning(move |symbol, _| {
            price.map_or_else(
                || ResolvedQuote {
                    symbol: symbol.clone(),
                    price: None,
                    source: QuoteSource::None,
                },
                |p| ResolvedQuote {
                    symbol: symbol.clone(),
                    price: Some(p),
                    source: QuoteSource::BrokerFallback,
                },
            )
        });
        resolver
    }

    #[tokio::test]
    async fn failed_order_does_not_stop_the_batch() {
        // Three positions; the second order errors. Both other sells go out
        // and the tally is 2 sold / 1 failed.
        let mut broker = MockBrokerPort::new();
        broker
            .expect_place_market_sell()
            .times(3)
            .returning(|order| {
                if order.symbol.as_str() == "B" {
                    Err(BrokerError::Connection {
                        message: "timed out".to_string(),
                    })
                } else {
                    Ok(OrderAck {
                        order_id: format!("ord-{}", order.symbol),
                        status: "TRANSIT".to_string(),
                    })
                }
            });

        let executor = LiquidationExecutor::new(
            Arc::new(broker),
            Arc::new(resolver_with_price(Some(dec!(50)))),
            Duration::ZERO,
        );

        let positions = vec![
            position("A", 10, dec!(50)),
            position("B", 5, dec!(50)),
            position("C", 2, dec!(50)),
        ];
        let outcome = executor.liquidate(&positions).await;

        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.skipped_count, 0);
        assert_eq!(outcome.attempted(), 3);

        let sold: Vec<&str> = outcome
            .attempts
            .iter()
            .filter(|a| matches!(a.status, OrderAttemptStatus::Sold { .. }))
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(sold, vec!["A", "C"]);
        // 10 * 50 + 2 * 50
        assert_eq!(outcome.total_sold_value, dec!(600));
    }

    #[tokio::test]
    async fn unpriceable_position_is_skipped_not_failed() {
        let mut broker = MockBrokerPort::new();
        broker.expect_place_market_sell().never();

        let executor = LiquidationExecutor::new(
            Arc::new(broker),
            Arc::new(resolver_with_price(None)),
            Duration::ZERO,
        );

        let outcome = executor
            .liquidate(&[position("A", 10, Decimal::ZERO)])
            .await;

        assert_eq!(outcome.success_count, 0);
        assert_eq!(outcome.failed_count, 0);
        assert_eq!(outcome.skipped_count, 1);
        assert!(matches!(
            outcome.attempts[0].status,
            OrderAttemptStatus::SkippedNoPrice
        ));
    }

    #[tokio::test]
    async fn zero_quantity_positions_are_not_attempted() {
        let mut broker = MockBrokerPort::new();
        broker.expect_place_market_sell().never();

        let executor = LiquidationExecutor::new(
            Arc::new(broker),
            Arc::new(MockQuoteResolver::new()),
            Duration::ZERO,
        );

        let outcome = executor.liquidate(&[position("A", 0, dec!(50))]).await;
        assert_eq!(outcome.attempted(), 0);
    }

    #[tokio::test]
    async fn tally_partitions_every_eligible_position() {
        // sold + failed + skipped == eligible count
        let mut broker = MockBrokerPort::new();
        broker.expect_place_market_sell().returning(|order| {
            if order.symbol.as_str() == "FAIL" {
                Err(BrokerError::RequestRejected {
                    remarks: "rejected".to_string(),
                })
            } else {
                Ok(OrderAck {
                    order_id: "ord-1".to_string(),
                    status: "TRANSIT".to_string(),
                })
            }
        });

        let mut resolver = MockQuoteResolver::new();
        resolver.expect_resolve().returning(|symbol, fallback| {
            if symbol.as_str() == "NOPRICE" {
                ResolvedQuote {
                    symbol: symbol.clone(),
                    price: None,
                    source: QuoteSource::None,
                }
            } else {
                ResolvedQuote {
                    symbol: symbol.clone(),
                    price: fallback,
                    source: QuoteSource::BrokerFallback,
                }
            }
        });

        let executor =
            LiquidationExecutor::new(Arc::new(broker), Arc::new(resolver), Duration::ZERO);

        let positions = vec![
            position("OK", 1, dec!(10)),
            position("FAIL", 1, dec!(10)),
            position("NOPRICE", 1, Decimal::ZERO),
            position("ZERO", 0, dec!(10)),
        ];
        let outcome = executor.liquidate(&positions).await;

        assert_eq!(
            outcome.success_count + outcome.failed_count + outcome.skipped_count,
            3
        );
    }
}
