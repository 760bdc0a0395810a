//! Quote providers and the resolution chain.

mod chain;
mod yahoo;

pub use chain::QuoteChain;
pub use yahoo::{YahooConfig, YahooFinanceProvider};
