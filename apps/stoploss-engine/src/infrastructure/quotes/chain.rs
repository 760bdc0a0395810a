//! Ordered quote provider chain.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::ports::{
    QuoteProviderPort, QuoteResolver, QuoteSource, ResolvedQuote,
};
use crate::domain::Symbol;

/// Tries providers in registration order; the first positive price wins.
///
/// Provider errors and non-positive prices are logged and swallowed. When
/// the whole chain comes up empty the broker-reported fallback is used if
/// positive; otherwise the quote resolves to nothing and the caller's
/// safety lock excludes the position.
pub struct QuoteChain {
    providers: Vec<Arc<dyn QuoteProviderPort>>,
}

impl QuoteChain {
    /// Build a chain from providers in priority order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn QuoteProviderPort>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl QuoteResolver for QuoteChain {
    async fn resolve(&self, symbol: &Symbol, broker_fallback: Option<Decimal>) -> ResolvedQuote {
        for provider in &self.providers {
            match provider.last_price(symbol).await {
                Ok(price) if price > Decimal::ZERO => {
                    return ResolvedQuote {
                        symbol: symbol.clone(),
                        price: Some(price),
                        source: QuoteSource::Provider(provider.name().to_string()),
                    };
                }
                Ok(price) => {
                    tracing::debug!(
                        symbol = %symbol,
                        provider = provider.name(),
                        price = %price,
                        "ignoring non-positive quote"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        symbol = %symbol,
                        provider = provider.name(),
                        error = %e,
                        "quote provider failed; trying next"
                    );
                }
            }
        }

        if let Some(price) = broker_fallback.filter(|p| *p > Decimal::ZERO) {
            return ResolvedQuote {
                symbol: symbol.clone(),
                price: Some(price),
                source: QuoteSource::BrokerFallback,
            };
        }

        ResolvedQuote {
            symbol: symbol.clone(),
            price: None,
            source: QuoteSource::None,
        }
    }
}
