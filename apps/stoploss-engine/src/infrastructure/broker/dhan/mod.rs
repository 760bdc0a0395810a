//! Dhan Broker Adapter
//!
//! Implementation of `BrokerPort` against the Dhan REST API v2 with:
//! - Holdings, fund-limit and order-placement endpoints
//! - Retry logic with exponential backoff
//! - LTP backup quotes via the marketfeed endpoint

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::DhanBrokerAdapter;
pub use config::{DhanConfig, RetryConfig};
pub use error::DhanError;
