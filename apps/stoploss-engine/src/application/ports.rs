//! Driven ports
//!
//! Interfaces for the brokerage and the market-data providers. Adapters in
//! `infrastructure` implement these; the engine core and tests depend only
//! on the traits.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{PortfolioSnapshot, Symbol};

/// Request to sell one position at market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellOrder {
    /// Broker security identifier.
    pub security_id: String,
    /// Trading symbol, for logging and the outcome report.
    pub symbol: Symbol,
    /// Full held quantity.
    pub quantity: u64,
}

/// Acknowledgment from the broker after order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker-assigned order ID.
    pub order_id: String,
    /// Broker-reported status string.
    pub status: String,
}

/// Broker port error.
///
/// Every variant is recoverable at the cycle level; the poll loop counts
/// consecutive failures toward the circuit-breaker ceiling instead of
/// crashing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Transport-level failure (network, timeout, TLS).
    #[error("broker connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// The broker answered with a non-success envelope status.
    #[error("broker rejected the request: {remarks}")]
    RequestRejected {
        /// Broker-supplied remarks.
        remarks: String,
    },

    /// Credentials were not accepted.
    #[error("broker authentication failed")]
    AuthenticationFailed,

    /// Rate limited by the broker.
    #[error("rate limited by broker")]
    RateLimited,

    /// The response body did not match the documented shape.
    #[error("unexpected broker response: {message}")]
    UnexpectedResponse {
        /// Error details.
        message: String,
    },
}

/// Port for brokerage interactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Fetch the current holdings snapshot.
    async fn get_holdings(&self) -> Result<PortfolioSnapshot, BrokerError>;

    /// Fetch the available balance. Display-only; never feeds the
    /// stop-loss decision.
    async fn get_available_funds(&self) -> Result<Decimal, BrokerError>;

    /// Place a market sell order for the full quantity of one position.
    async fn place_market_sell(&self, order: &SellOrder) -> Result<OrderAck, BrokerError>;
}

/// Quote provider error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QuoteError {
    /// Provider could not be reached.
    #[error("quote provider unreachable: {message}")]
    Unreachable {
        /// Error details.
        message: String,
    },

    /// Provider answered but had no usable price.
    #[error("no price available for {symbol}")]
    Unavailable {
        /// The symbol that was queried.
        symbol: String,
    },
}

/// Port for a single market-data provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProviderPort: Send + Sync {
    /// Provider name for logs and the quote source tag.
    fn name(&self) -> &str;

    /// Last traded price for a symbol.
    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, QuoteError>;
}

/// Where a resolved price came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// A provider in the chain answered with a positive price.
    Provider(String),
    /// The brokerage-reported snapshot price was used.
    BrokerFallback,
    /// No usable price anywhere.
    None,
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(name) => write!(f, "{name}"),
            Self::BrokerFallback => write!(f, "broker"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A quote resolution outcome for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedQuote {
    /// The symbol that was resolved.
    pub symbol: Symbol,
    /// Positive price, or `None` when nothing usable was found.
    pub price: Option<Decimal>,
    /// Where the price came from.
    pub source: QuoteSource,
}

impl ResolvedQuote {
    /// A usable quote has a strictly positive price.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.price.is_some_and(|p| p > Decimal::ZERO)
    }
}

/// Port for infallible quote resolution across the provider chain.
///
/// Provider failures are swallowed inside the resolver; an unusable outcome
/// is expressed as `QuoteSource::None`, never as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteResolver: Send + Sync {
    /// Resolve a price for a symbol, falling back to the broker-reported
    /// price only when the chain yields nothing usable and the fallback is
    /// itself positive.
    async fn resolve(&self, symbol: &Symbol, broker_fallback: Option<Decimal>) -> ResolvedQuote;
}
